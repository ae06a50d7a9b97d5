// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use crate::{config::Config, llm::LanguageModel, store::Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub llm: Arc<dyn LanguageModel>,
    pub config: Config,
    pub cookie_key: Key,
}

impl AppState {
    /// Derives the cookie signing key from `config.cookie_secret`.
    pub fn new(store: Arc<dyn Store>, llm: Arc<dyn LanguageModel>, config: Config) -> Self {
        let cookie_key = Key::derive_from(config.cookie_secret.as_bytes());
        Self {
            store,
            llm,
            config,
            cookie_key,
        }
    }
}

impl FromRef<AppState> for Arc<dyn Store> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
