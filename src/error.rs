// devis-pdf: error type shared by every module

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to create PDF: {0}")]
    Pdf(String),
    #[error("Storage error: {0}")]
    Store(String),
    #[error("Invalid company profile: {0}")]
    Profile(String),
    #[error("Failed to load logo: {0}")]
    Logo(String),
    #[error("No line item at index {index} (document has {len})")]
    Item { index: usize, len: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
