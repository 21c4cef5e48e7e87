use srcmap_engine::{FetchError, ResolveError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Client setup failed: {0}")]
    Client(#[from] FetchError),

    #[error("{}", .0.sanitized())]
    Resolve(#[from] ResolveError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Initialization failed: {0}")]
    Initialization(String),
}
