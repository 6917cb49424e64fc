//! External collaborator interfaces.
//!
//! The retriever, language model, and embedder are slow, fallible
//! network services owned elsewhere; the pipeline only depends on these
//! traits and is tested against in-process fakes.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One retrieved evidence chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk_id: String,
    pub text: String,
    pub taxonomy_path: Vec<String>,
    pub score: f64,
}

/// Retrieval-side filters; `category_paths` restricts results to the
/// given taxonomy subtrees.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalFilters {
    pub category_paths: Vec<Vec<String>>,
}

/// Hybrid BM25+vector retriever. Must accept `filters = None`.
#[async_trait]
pub trait HybridRetriever: Send + Sync {
    async fn search(
        &self,
        query: &str,
        filters: Option<&RetrievalFilters>,
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>>;
}

/// LLM generation plus named deliberation-tool endpoints.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Invoke a named reasoning tool with a JSON payload.
    async fn invoke_tool(&self, name: &str, payload: &Value) -> Result<Value>;
}

/// Query embedding for case-bank consultation. The retriever owns its
/// own embeddings; this one only feeds the CBR lookup.
#[async_trait]
pub trait QueryEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}
