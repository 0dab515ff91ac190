use lorafetch_engine::FetchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("{failed} of {total} URL(s) could not be fetched")]
    Incomplete { failed: usize, total: usize },
}
