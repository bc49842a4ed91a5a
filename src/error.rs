use thiserror::Error;

#[derive(Error, Debug)]
pub enum RekapError {
    /// Malformed or missing target/transaction data. Fatal to the current render pass.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Data source error: {0}")]
    Source(String),

    #[error("{0}")]
    Other(String),
}

impl RekapError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        RekapError::InvalidInput(msg.into())
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, RekapError::InvalidInput(_))
    }
}

pub type Result<T> = std::result::Result<T, RekapError>;
