use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Retriever error: {0}")]
    Retriever(String),

    #[error("Language model error: {0}")]
    LanguageModel(String),

    #[error("Tool '{name}' failed: {message}")]
    Tool { name: String, message: String },

    #[error("Embedder error: {0}")]
    Embedder(String),

    #[error("Step {step} is missing its input: {field}")]
    MissingStepOutput { step: &'static str, field: &'static str },

    #[error("Casebank error: {0}")]
    Casebank(#[from] ragline_casebank::CasebankError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn retriever<E: std::fmt::Display>(e: E) -> Self {
        Self::Retriever(e.to_string())
    }

    pub fn language_model<E: std::fmt::Display>(e: E) -> Self {
        Self::LanguageModel(e.to_string())
    }

    pub fn serialization<E: std::fmt::Display>(e: E) -> Self {
        Self::Serialization(e.to_string())
    }

    pub fn config<E: std::fmt::Display>(e: E) -> Self {
        Self::Config(e.to_string())
    }
}
