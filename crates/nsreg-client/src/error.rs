use thiserror::Error;

/// Errors surfaced by registry calls.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The service answered with a non-success status.
    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid registry URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl RemoteError {
    /// Build the error for a failed response from its status and raw body.
    ///
    /// Uses the body's `error` string verbatim when there is one.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let message = serde_json::from_slice::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
            .unwrap_or_else(|| format!("HTTP error! status: {status}"));
        RemoteError::Status { status, message }
    }

    /// HTTP status code, when the failure came from the service.
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
