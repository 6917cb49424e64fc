use thiserror::Error;

pub type Result<T> = std::result::Result<T, CasebankError>;

#[derive(Error, Debug)]
pub enum CasebankError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Case not found: {0}")]
    CaseNotFound(String),
}

impl CasebankError {
    pub fn serialization<E: std::fmt::Display>(e: E) -> Self {
        Self::Serialization(e.to_string())
    }
}
