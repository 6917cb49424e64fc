use serde::{Deserialize, Serialize};

/// One answer request. Immutable, created per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRequest {
    pub query: String,
    pub taxonomy_version: String,
    #[serde(default)]
    pub options: RequestOptions,
}

impl PipelineRequest {
    pub fn new(query: impl Into<String>, taxonomy_version: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            taxonomy_version: taxonomy_version.into(),
            options: RequestOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

/// Per-request knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestOptions {
    /// How many chunks to ask the retriever for.
    pub top_k: usize,
    /// Consult the case bank during retrieval.
    pub consult_casebank: bool,
    pub user_id: Option<String>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            top_k: 8,
            consult_casebank: true,
            user_id: None,
        }
    }
}

/// Pre-authorized retrieval scope for one session, supplied by the
/// taxonomy catalog. Every retrieval in the session is limited to
/// `allowed_paths`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionScope {
    pub user_id: Option<String>,
    pub taxonomy_version: String,
    pub allowed_paths: Vec<Vec<String>>,
}

impl SessionScope {
    pub fn new(taxonomy_version: impl Into<String>, allowed_paths: Vec<Vec<String>>) -> Self {
        Self {
            user_id: None,
            taxonomy_version: taxonomy_version.into(),
            allowed_paths,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}
