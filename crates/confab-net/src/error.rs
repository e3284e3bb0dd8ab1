use confab_shared::AdapterError;
use thiserror::Error;

/// Errors produced by the network adapters.
#[derive(Error, Debug)]
pub enum NetError {
    /// HTTP transport or status error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local file I/O error (reading an attachment for upload).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The caller supplied an argument the operation cannot accept.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<NetError> for AdapterError {
    fn from(e: NetError) -> Self {
        match e {
            // A response carrying an error status means the collaborator
            // answered and refused; anything else is unreachability.
            NetError::Http(err) if err.status().is_some() => {
                AdapterError::Rejected(err.to_string())
            }
            NetError::Http(err) => AdapterError::Unavailable(err.to_string()),
            NetError::WebSocket(err) => AdapterError::Unavailable(err.to_string()),
            NetError::Json(err) => AdapterError::Serialization(err.to_string()),
            NetError::Io(err) => AdapterError::Io(err.to_string()),
            NetError::InvalidArgument(msg) => AdapterError::InvalidArgument(msg),
        }
    }
}
