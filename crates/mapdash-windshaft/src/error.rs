use thiserror::Error;

/// Message reported for every failure below the HTTP response level.
pub const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid response body: {0}")]
    Decode(String),
}

#[derive(Error, Debug)]
pub enum InstantiationError {
    /// First error the tiler reported.
    #[error("{0}")]
    Server(String),
    #[error("Unknown error")]
    Transport(#[source] TransportError),
}

impl InstantiationError {
    /// The single string shown to users for this failure.
    pub fn message(&self) -> String {
        match self {
            Self::Server(message) => message.clone(),
            Self::Transport(_) => UNKNOWN_ERROR.to_string(),
        }
    }
}
