//! Shared application state.
//!
//! # Invariants
//! - The connection lock is held only for synchronous storage work and is
//!   released before any provider call is awaited.

use crate::config::ServerConfig;
use crate::error::{ApiError, ApiResult};
use log::{info, warn};
use reminme_ai::{
    build_http_client, AiError, CompletionProvider, EmbeddingClient, HttpVectorIndex,
    NoopVectorIndex, OpenAiCompatibleClient, VectorIndex,
};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

pub struct AppState {
    db: Mutex<Connection>,
    chat: Option<Arc<dyn CompletionProvider>>,
    search: Option<Arc<dyn CompletionProvider>>,
    vector: Arc<dyn VectorIndex>,
}

impl AppState {
    /// State without AI integrations; tagging degrades and generation
    /// routes answer 503.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
            chat: None,
            search: None,
            vector: Arc::new(NoopVectorIndex),
        }
    }

    /// Wires providers and the vector index described by `config`.
    ///
    /// # Errors
    /// - The shared HTTP client cannot be built.
    pub fn from_config(config: &ServerConfig, conn: Connection) -> Result<Self, AiError> {
        let client = build_http_client(config.ai_timeout_secs)?;
        let mut state = Self::new(conn);

        if let Some(chat) = config.chat.as_ref() {
            state = state.with_chat(Arc::new(OpenAiCompatibleClient::new(
                "openai",
                client.clone(),
                chat,
            )));
        }
        if let Some(search) = config.search.as_ref() {
            state = state.with_search(Arc::new(OpenAiCompatibleClient::new(
                "perplexity",
                client.clone(),
                search,
            )));
        }
        match (config.vector_index.as_ref(), config.embedding.as_ref()) {
            (Some(index), Some(embedding)) => {
                let embedder = EmbeddingClient::new(client.clone(), embedding);
                state = state.with_vector(Arc::new(HttpVectorIndex::new(
                    client,
                    &index.url,
                    &index.api_key,
                    embedder,
                )));
            }
            (Some(_), None) => warn!(
                "event=vector_index_disabled module=server status=error reason=missing_embedding_key"
            ),
            _ => {}
        }

        info!(
            "event=app_state_init module=server status=ok chat={} search={} vector={}",
            state.chat.is_some(),
            state.search.is_some(),
            state.vector.name()
        );
        Ok(state)
    }

    pub fn with_chat(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.chat = Some(provider);
        self
    }

    pub fn with_search(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.search = Some(provider);
        self
    }

    pub fn with_vector(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.vector = index;
        self
    }

    pub fn chat(&self) -> Option<&dyn CompletionProvider> {
        self.chat.as_deref()
    }

    pub fn search(&self) -> Option<&dyn CompletionProvider> {
        self.search.as_deref()
    }

    pub fn vector(&self) -> &dyn VectorIndex {
        self.vector.as_ref()
    }

    /// Runs `f` with exclusive access to the connection.
    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> ApiResult<T>) -> ApiResult<T> {
        let conn = self
            .db
            .lock()
            .map_err(|_| ApiError::Internal("database lock poisoned".to_string()))?;
        f(&conn)
    }
}
