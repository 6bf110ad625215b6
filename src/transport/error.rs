use thiserror::Error;

/// Result type for transport operations
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Errors that can occur talking to an array's management endpoint
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Login failed for {address}: {reason}")]
    Login { address: String, reason: String },

    #[error("Unexpected status {status} from {path}")]
    Status { status: u16, path: String },

    #[error("Malformed response from {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("Other transport error: {0}")]
    Other(String),
}

impl From<TransportError> for crate::error::ExporterError {
    fn from(err: TransportError) -> Self {
        crate::error::ExporterError::Transport(err.to_string())
    }
}
