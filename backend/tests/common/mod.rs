// tests/common/mod.rs

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use codequiz::{
    config::Config,
    llm::{GenerationError, LanguageModel},
    models::user::{NewUser, Role},
    routes,
    state::AppState,
    store::{MemoryStore, Store, UserRepository},
    utils::hash::hash_password,
};
use serde_json::{Value, json};

pub const TEACHER_EMAIL: &str = "teacher@example.com";
pub const PASSWORD: &str = "password123";

/// Language model stand-in that replays queued replies and records prompts.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn reply(&self, text: impl Into<String>) {
        self.replies.lock().unwrap().push_back(Ok(text.into()));
    }

    pub fn fail(&self, message: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(GenerationError::Request(message)),
            None => Err(GenerationError::Request("no scripted reply left".to_string())),
        }
    }
}

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub llm: Arc<ScriptedModel>,
    pub store: Arc<MemoryStore>,
}

pub fn test_config() -> Config {
    Config {
        database_url: None,
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        cookie_secret: "cookie_secret_for_integration_tests_0123456789".to_string(),
        gemini_api_key: "unused".to_string(),
        gemini_model: "gemini-2.0-flash".to_string(),
        client_origin: "http://localhost:5173".to_string(),
        credential_ttl: Duration::from_secs(600), // 10 minutes for tests
        port: 0,
        rust_log: "error".to_string(),
        teacher_email: None,
        teacher_password: None,
    }
}

/// Spawns the app on a random port with an in-memory store and a seeded teacher.
pub async fn spawn_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_user(NewUser {
            name: "Teacher".to_string(),
            email: TEACHER_EMAIL.to_string(),
            password: hash_password(PASSWORD).unwrap(),
            role: Role::Teacher,
        })
        .await
        .expect("Failed to seed teacher");

    let llm = Arc::new(ScriptedModel::default());
    let state = AppState::new(
        store.clone() as Arc<dyn Store>,
        llm.clone(),
        test_config(),
    );
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    // Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        client: reqwest::Client::new(),
        llm,
        store,
    }
}

/// Pulls `auth_token=...` out of a response's Set-Cookie header.
pub fn auth_cookie(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("auth_token="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Registers a student and returns its auth cookie.
    pub async fn signup(&self, name: &str, email: &str) -> String {
        let response = self
            .client
            .post(self.url("/auth/signup"))
            .json(&json!({ "name": name, "email": email, "password": PASSWORD }))
            .send()
            .await
            .expect("Signup failed");
        assert_eq!(response.status().as_u16(), 201);
        auth_cookie(&response).expect("Signup did not set the auth cookie")
    }

    pub async fn login(&self, email: &str) -> String {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": PASSWORD }))
            .send()
            .await
            .expect("Login failed");
        assert_eq!(response.status().as_u16(), 200);
        auth_cookie(&response).expect("Login did not set the auth cookie")
    }

    pub async fn teacher_cookie(&self) -> String {
        self.login(TEACHER_EMAIL).await
    }

    /// Creates the Two Sum question as the teacher and returns its JSON.
    pub async fn create_two_sum(&self) -> Value {
        let cookie = self.teacher_cookie().await;
        let response = self
            .client
            .post(self.url("/questions/add"))
            .header("Cookie", &cookie)
            .json(&json!({
                "slug": "two-sum",
                "question": "Two Sum",
                "description": "Return indices of the two numbers that add up to target.",
                "difficulty": "Easy",
                "testCases": [{ "input": "[2,7,11,15],9", "expectedOutput": "[0,1]" }]
            }))
            .send()
            .await
            .expect("Create question failed");
        assert_eq!(response.status().as_u16(), 201);
        response.json().await.unwrap()
    }
}

/// A well-formed five-question quiz, wrapped in prose like a real model reply.
pub fn quiz_reply() -> String {
    let items = json!([
        {
            "question": "What is the time complexity of your solution?",
            "type": "mcq",
            "options": ["O(1)", "O(n)", "O(n log n)", "O(n^2)"],
            "expectedAnswer": "O(n)"
        },
        {
            "question": "Why did you store complements in a dictionary?",
            "type": "descriptive",
            "options": [],
            "expectedAnswer": "Dictionary lookups are constant time on average.",
            "expectedKeywords": ["hash", "constant time", "lookup"]
        },
        {
            "question": "What does your code return when no pair exists?",
            "type": "mcq",
            "options": ["None", "An empty list", "[-1, -1]", "It raises"],
            "expectedAnswer": "An empty list"
        },
        {
            "question": "Describe an approach using sorting.",
            "type": "descriptive",
            "options": [],
            "expectedAnswer": "Sort with indices and walk two pointers inward.",
            "expectedKeywords": ["sort", "two pointers"]
        },
        {
            "question": "How much additional memory does your solution use?",
            "type": "mcq",
            "options": ["O(1)", "O(n)", "O(log n)", "O(n^2)"],
            "expectedAnswer": "O(n)"
        }
    ]);
    format!("Here is the quiz:\n```json\n{}\n```", items)
}

/// A feedback reply covering every quiz item of `submission`.
pub fn feedback_reply(submission: &Value, grade: f64) -> String {
    let feedbacks: Vec<Value> = submission["qna"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| json!({ "questionId": item["id"], "response": "Clear and correct." }))
        .collect();
    format!(
        "```json\n{}\n```",
        json!({ "feedbacks": feedbacks, "overallGrade": grade })
    )
}

/// One answer per quiz item, picking the expected answer.
pub fn formatted_answers(submission: &Value) -> Value {
    let answers: Vec<Value> = submission["qna"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| json!({ "questionId": item["id"], "answer": item["expectedAnswer"] }))
        .collect();
    json!({ "formattedAnswers": answers })
}
