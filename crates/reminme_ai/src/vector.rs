//! Vector index used for semantic memory search.
//!
//! # Responsibility
//! - Embed text through an OpenAI-compatible `/embeddings` endpoint.
//! - Store and query vectors in a Pinecone-style REST index.
//!
//! # Invariants
//! - Every call is scoped to one namespace (the owner's user id).
//! - The no-op index accepts writes and never returns matches.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::provider::{AiError, ProviderConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    #[serde(default)]
    pub score: f32,
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert(
        &self,
        namespace: &str,
        id: &str,
        text: &str,
        metadata: Value,
    ) -> Result<(), AiError>;

    async fn query(
        &self,
        namespace: &str,
        text: &str,
        top_k: u32,
    ) -> Result<Vec<VectorMatch>, AiError>;

    async fn delete(&self, namespace: &str, ids: &[String]) -> Result<(), AiError>;

    fn name(&self) -> &str;
}

/// Index used when no vector store is configured.
pub struct NoopVectorIndex;

#[async_trait]
impl VectorIndex for NoopVectorIndex {
    async fn upsert(&self, _: &str, _: &str, _: &str, _: Value) -> Result<(), AiError> {
        Ok(())
    }

    async fn query(&self, _: &str, _: &str, _: u32) -> Result<Vec<VectorMatch>, AiError> {
        Ok(Vec::new())
    }

    async fn delete(&self, _: &str, _: &[String]) -> Result<(), AiError> {
        Ok(())
    }

    fn name(&self) -> &str {
        "noop"
    }
}

/// Embedding client for OpenAI-compatible `/embeddings` APIs.
pub struct EmbeddingClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl EmbeddingClient {
    pub fn new(client: reqwest::Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, AiError> {
        let url = format!("{}/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({ "model": self.model, "input": [text] }))
            .send()
            .await
            .map_err(AiError::from_reqwest)?;
        if !response.status().is_success() {
            return Err(AiError::RequestFailed(format!(
                "embeddings HTTP {}",
                response.status()
            )));
        }
        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|err| AiError::ParseError(err.to_string()))?;
        parsed
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| AiError::ParseError("no embedding in response".to_string()))
    }
}

/// Pinecone-style REST index (`/vectors/upsert`, `/query`, `/vectors/delete`).
pub struct HttpVectorIndex {
    client: reqwest::Client,
    index_url: String,
    api_key: String,
    embedder: EmbeddingClient,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<VectorMatch>,
}

impl HttpVectorIndex {
    pub fn new(
        client: reqwest::Client,
        index_url: &str,
        api_key: &str,
        embedder: EmbeddingClient,
    ) -> Self {
        Self {
            client,
            index_url: index_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            embedder,
        }
    }

    async fn post(&self, path: &str, body: &Value) -> Result<reqwest::Response, AiError> {
        let response = self
            .client
            .post(format!("{}{path}", self.index_url))
            .header("Api-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(AiError::from_reqwest)?;
        if !response.status().is_success() {
            log::warn!(
                "event=vector_request module=ai status=error path={} http_status={}",
                path,
                response.status().as_u16()
            );
            return Err(AiError::RequestFailed(format!(
                "vector index HTTP {}",
                response.status()
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl VectorIndex for HttpVectorIndex {
    async fn upsert(
        &self,
        namespace: &str,
        id: &str,
        text: &str,
        metadata: Value,
    ) -> Result<(), AiError> {
        let values = self.embedder.embed(text).await?;
        let body = json!({
            "namespace": namespace,
            "vectors": [{ "id": id, "values": values, "metadata": metadata }],
        });
        self.post("/vectors/upsert", &body).await?;
        Ok(())
    }

    async fn query(
        &self,
        namespace: &str,
        text: &str,
        top_k: u32,
    ) -> Result<Vec<VectorMatch>, AiError> {
        let vector = self.embedder.embed(text).await?;
        let body = json!({
            "namespace": namespace,
            "vector": vector,
            "topK": top_k,
            "includeMetadata": false,
        });
        let response = self.post("/query", &body).await?;
        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|err| AiError::ParseError(err.to_string()))?;
        Ok(parsed.matches)
    }

    async fn delete(&self, namespace: &str, ids: &[String]) -> Result<(), AiError> {
        if ids.is_empty() {
            return Ok(());
        }
        let body = json!({ "namespace": namespace, "ids": ids });
        self.post("/vectors/delete", &body).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::{NoopVectorIndex, VectorIndex};
    use serde_json::json;

    #[tokio::test]
    async fn noop_index_accepts_writes_and_finds_nothing() {
        let index = NoopVectorIndex;
        index
            .upsert("owner", "id-1", "text", json!({ "kind": "memory" }))
            .await
            .expect("upsert should succeed");
        assert!(index.query("owner", "text", 5).await.expect("query should succeed").is_empty());
        index.delete("owner", &["id-1".to_string()]).await.expect("delete should succeed");
    }
}
