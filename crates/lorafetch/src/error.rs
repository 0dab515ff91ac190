use reqwest::StatusCode;

/// Coarse classification of a [`FetchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad status, transport failure or an unusable URL
    Network,
    /// The archive does not contain the expected weights file
    MemberNotFound,
    /// Local write, archive read or cleanup failure
    Filesystem,
}

// Error type for cache resolution and acquisition
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Server returned status code {0}")]
    StatusCode(StatusCode),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("No member matching '{target}' among {entries} archive entries")]
    MemberNotFound { target: String, entries: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Http(_)
            | FetchError::InvalidUrl(_)
            | FetchError::StatusCode(_)
            | FetchError::Client(_) => ErrorKind::Network,
            FetchError::MemberNotFound { .. } => ErrorKind::MemberNotFound,
            FetchError::Io(_) | FetchError::Archive(_) | FetchError::Task(_) => {
                ErrorKind::Filesystem
            }
        }
    }

    #[inline]
    pub fn is_network(&self) -> bool {
        self.kind() == ErrorKind::Network
    }
}

impl From<tokio::task::JoinError> for FetchError {
    fn from(err: tokio::task::JoinError) -> Self {
        FetchError::Task(err.to_string())
    }
}
