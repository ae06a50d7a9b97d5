// tests/evaluation_tests.rs

mod common;

use common::{TestApp, feedback_reply, formatted_answers, quiz_reply, spawn_app};
use serde_json::{Value, json};

/// Signs up a student, creates Two Sum and submits a Python solution.
/// Returns (student cookie, submission JSON).
async fn submit_two_sum(app: &TestApp) -> (String, Value) {
    app.create_two_sum().await;
    let student = app.signup("Ada", "ada@example.com").await;

    app.llm.reply(quiz_reply());
    let response = app
        .client
        .post(app.url("/questions/two-sum/submit"))
        .header("Cookie", &student)
        .json(&json!({
            "email": "ada@example.com",
            "questionId": "two-sum",
            "code": "def two_sum(nums, target):\n    seen = {}\n    for i, n in enumerate(nums):\n        if target - n in seen:\n            return [seen[target - n], i]\n        seen[n] = i\n    return []",
            "language": "python"
        }))
        .send()
        .await
        .expect("Failed to submit code");

    assert_eq!(response.status().as_u16(), 201);
    (student, response.json().await.unwrap())
}

async fn fetch_submission(app: &TestApp, cookie: &str, id: &Value) -> Value {
    let response = app
        .client
        .get(app.url(&format!("/submissions/{}", id)))
        .header("Cookie", cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    response.json().await.unwrap()
}

#[tokio::test]
async fn full_evaluation_flow() {
    let app = spawn_app().await;

    // 1. Submit code: five generated questions, nothing answered yet
    let (student, submission) = submit_two_sum(&app).await;
    assert_eq!(submission["stage"], "submitted");
    assert_eq!(submission["language"], "python");
    let qna = submission["qna"].as_array().unwrap();
    assert_eq!(qna.len(), 5);
    for item in qna {
        assert!(item.get("studentAnswer").is_none());
        if item["type"] == "mcq" {
            let options = item["options"].as_array().unwrap();
            assert_eq!(options.len(), 4);
            assert!(options.contains(&item["expectedAnswer"]));
        } else {
            assert_eq!(item["type"], "descriptive");
            assert!(!item["expectedKeywords"].as_array().unwrap().is_empty());
        }
    }
    assert!(app.llm.prompts()[0].contains("Two Sum"));

    // 2. Answer every item and get graded
    app.llm.reply(feedback_reply(&submission, 7.0));
    let response = app
        .client
        .post(app.url(&format!("/submissions/evaluation/{}", submission["id"])))
        .header("Cookie", &student)
        .json(&formatted_answers(&submission))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let report: Value = response.json().await.unwrap();
    assert_eq!(report["overallGrade"], 7.0);
    assert_eq!(report["feedbacks"].as_array().unwrap().len(), 5);

    // 3. The stored submission carries answers, feedback and grade
    let stored = fetch_submission(&app, &student, &submission["id"]).await;
    assert_eq!(stored["stage"], "graded");
    assert_eq!(stored["grade"], 7.0);
    assert_eq!(stored["evaluatedByTeacher"], false);
    for item in stored["qna"].as_array().unwrap() {
        assert_eq!(item["studentAnswer"], item["expectedAnswer"]);
        assert_eq!(item["aiFeedback"], "Clear and correct.");
    }
}

#[tokio::test]
async fn unknown_answer_id_is_rejected_without_changes() {
    let app = spawn_app().await;
    let (student, submission) = submit_two_sum(&app).await;

    let mut answers = formatted_answers(&submission);
    answers["formattedAnswers"][0]["questionId"] = json!("00000000-0000-4000-8000-000000000000");

    let response = app
        .client
        .post(app.url(&format!("/submissions/evaluation/{}", submission["id"])))
        .header("Cookie", &student)
        .json(&answers)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let stored = fetch_submission(&app, &student, &submission["id"]).await;
    assert_eq!(stored["stage"], "submitted");
    assert!(
        stored["qna"]
            .as_array()
            .unwrap()
            .iter()
            .all(|item| item.get("studentAnswer").is_none())
    );
    // Only the quiz prompt reached the model
    assert_eq!(app.llm.prompts().len(), 1);
}

#[tokio::test]
async fn failed_quiz_generation_stores_nothing() {
    let app = spawn_app().await;
    app.create_two_sum().await;
    let student = app.signup("Ada", "ada@example.com").await;

    app.llm.fail("model unavailable");
    let response = app
        .client
        .post(app.url("/questions/two-sum/submit"))
        .header("Cookie", &student)
        .json(&json!({
            "email": "ada@example.com",
            "questionId": "two-sum",
            "code": "print(1)",
            "language": "python"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 502);

    // A malformed quiz is rejected the same way
    app.llm.reply("I cannot produce JSON today.");
    let response = app
        .client
        .post(app.url("/questions/two-sum/submit"))
        .header("Cookie", &student)
        .json(&json!({
            "email": "ada@example.com",
            "questionId": "two-sum",
            "code": "print(1)",
            "language": "python"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 502);

    let teacher = app.teacher_cookie().await;
    let board: Value = app
        .client
        .get(app.url("/submissions/board/all"))
        .header("Cookie", &teacher)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(board.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn failed_grading_keeps_answers_and_can_be_retried() {
    let app = spawn_app().await;
    let (student, submission) = submit_two_sum(&app).await;

    app.llm.fail("timeout");
    let response = app
        .client
        .post(app.url(&format!("/submissions/evaluation/{}", submission["id"])))
        .header("Cookie", &student)
        .json(&formatted_answers(&submission))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 502);

    let stored = fetch_submission(&app, &student, &submission["id"]).await;
    assert_eq!(stored["stage"], "answered");
    assert!(stored["grade"].is_null());

    app.llm.reply(feedback_reply(&submission, 8.5));
    let retried = app
        .client
        .post(app.url(&format!("/submissions/{}/feedback", submission["id"])))
        .header("Cookie", &student)
        .send()
        .await
        .unwrap();
    assert_eq!(retried.status().as_u16(), 200);

    let stored = fetch_submission(&app, &student, &submission["id"]).await;
    assert_eq!(stored["stage"], "graded");
    assert_eq!(stored["grade"], 8.5);
}

#[tokio::test]
async fn graded_submission_cannot_be_answered_again() {
    let app = spawn_app().await;
    let (student, submission) = submit_two_sum(&app).await;
    let url = app.url(&format!("/submissions/evaluation/{}", submission["id"]));

    app.llm.reply(feedback_reply(&submission, 6.0));
    let first = app
        .client
        .post(&url)
        .header("Cookie", &student)
        .json(&formatted_answers(&submission))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status().as_u16(), 200);

    let second = app
        .client
        .post(&url)
        .header("Cookie", &student)
        .json(&formatted_answers(&submission))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status().as_u16(), 409);
}

#[tokio::test]
async fn students_only_see_their_own_submissions() {
    let app = spawn_app().await;
    let (_, submission) = submit_two_sum(&app).await;
    let intruder = app.signup("Eve", "eve@example.com").await;

    let response = app
        .client
        .get(app.url(&format!("/submissions/{}", submission["id"])))
        .header("Cookie", &intruder)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let board = app
        .client
        .get(app.url("/submissions/board/all"))
        .header("Cookie", &intruder)
        .send()
        .await
        .unwrap();
    assert_eq!(board.status().as_u16(), 403);

    // Submitting under someone else's email is refused too
    let response = app
        .client
        .post(app.url("/questions/two-sum/submit"))
        .header("Cookie", &intruder)
        .json(&json!({
            "email": "ada@example.com",
            "questionId": "two-sum",
            "code": "print(1)",
            "language": "python"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn submit_rejects_unknown_or_mismatched_question() {
    let app = spawn_app().await;
    app.create_two_sum().await;
    let student = app.signup("Ada", "ada@example.com").await;

    let unknown = app
        .client
        .post(app.url("/questions/three-sum/submit"))
        .header("Cookie", &student)
        .json(&json!({
            "email": "ada@example.com",
            "questionId": "three-sum",
            "code": "print(1)",
            "language": "python"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status().as_u16(), 404);

    let mismatched = app
        .client
        .post(app.url("/questions/two-sum/submit"))
        .header("Cookie", &student)
        .json(&json!({
            "email": "ada@example.com",
            "questionId": "three-sum",
            "code": "print(1)",
            "language": "python"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(mismatched.status().as_u16(), 400);

    // No model call was made for either
    assert!(app.llm.prompts().is_empty());
}

#[tokio::test]
async fn teacher_overrides_grade_and_lists_board() {
    let app = spawn_app().await;
    let (student, submission) = submit_two_sum(&app).await;
    let teacher = app.teacher_cookie().await;

    app.llm.reply(feedback_reply(&submission, 5.0));
    let graded = app
        .client
        .post(app.url(&format!("/submissions/evaluation/{}", submission["id"])))
        .header("Cookie", &student)
        .json(&formatted_answers(&submission))
        .send()
        .await
        .unwrap();
    assert_eq!(graded.status().as_u16(), 200);

    let response = app
        .client
        .put(app.url(&format!("/submissions/updateGrade/{}", submission["id"])))
        .header("Cookie", &teacher)
        .json(&json!({ "grade": 9.5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["grade"], 9.5);
    assert_eq!(updated["evaluatedByTeacher"], true);

    let out_of_range = app
        .client
        .put(app.url(&format!("/submissions/updateGrade/{}", submission["id"])))
        .header("Cookie", &teacher)
        .json(&json!({ "grade": 11 }))
        .send()
        .await
        .unwrap();
    assert_eq!(out_of_range.status().as_u16(), 400);

    let board: Value = app
        .client
        .get(app.url("/submissions/board/all"))
        .header("Cookie", &teacher)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let board = board.as_array().unwrap();
    assert_eq!(board.len(), 1);
    assert_eq!(board[0]["id"], submission["id"]);
    assert_eq!(board[0]["grade"], 9.5);
}

#[tokio::test]
async fn question_with_submissions_cannot_be_deleted() {
    let app = spawn_app().await;
    submit_two_sum(&app).await;
    let teacher = app.teacher_cookie().await;

    let response = app
        .client
        .delete(app.url("/questions/delete/two-sum"))
        .header("Cookie", &teacher)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn grade_override_before_answers_is_refused() {
    let app = spawn_app().await;
    let (student, submission) = submit_two_sum(&app).await;
    let teacher = app.teacher_cookie().await;

    let response = app
        .client
        .put(app.url(&format!("/submissions/updateGrade/{}", submission["id"])))
        .header("Cookie", &teacher)
        .json(&json!({ "grade": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);

    let stored = fetch_submission(&app, &student, &submission["id"]).await;
    assert_eq!(stored["stage"], "submitted");
    assert!(stored["grade"].is_null());

    // The student is not locked out
    app.llm.reply(feedback_reply(&submission, 7.0));
    let answered = app
        .client
        .post(app.url(&format!("/submissions/evaluation/{}", submission["id"])))
        .header("Cookie", &student)
        .json(&formatted_answers(&submission))
        .send()
        .await
        .unwrap();
    assert_eq!(answered.status().as_u16(), 200);
}

#[tokio::test]
async fn malformed_bodies_get_json_errors() {
    let app = spawn_app().await;
    app.create_two_sum().await;
    let student = app.signup("Ada", "ada@example.com").await;

    let bad_language = app
        .client
        .post(app.url("/questions/two-sum/submit"))
        .header("Cookie", &student)
        .json(&json!({
            "email": "ada@example.com",
            "questionId": "two-sum",
            "code": "fn main() {}",
            "language": "rust"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_language.status().as_u16(), 400);
    let body: Value = bad_language.json().await.expect("error body must be JSON");
    assert!(body["error"].as_str().unwrap().contains("language"));
    assert!(app.llm.prompts().is_empty());

    app.llm.reply(quiz_reply());
    let submitted: Value = app
        .client
        .post(app.url("/questions/two-sum/submit"))
        .header("Cookie", &student)
        .json(&json!({
            "email": "ada@example.com",
            "questionId": "two-sum",
            "code": "print(1)",
            "language": "python"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let not_a_uuid = app
        .client
        .post(app.url(&format!("/submissions/evaluation/{}", submitted["id"])))
        .header("Cookie", &student)
        .json(&json!({ "formattedAnswers": [{ "questionId": "q-1", "answer": "O(n)" }] }))
        .send()
        .await
        .unwrap();
    assert_eq!(not_a_uuid.status().as_u16(), 400);
    let body: Value = not_a_uuid.json().await.expect("error body must be JSON");
    assert!(body["error"].is_string());

    let bad_id = app
        .client
        .get(app.url("/submissions/not-a-number"))
        .header("Cookie", &student)
        .send()
        .await
        .unwrap();
    assert_eq!(bad_id.status().as_u16(), 400);
    let body: Value = bad_id.json().await.expect("error body must be JSON");
    assert!(body["error"].is_string());
}
