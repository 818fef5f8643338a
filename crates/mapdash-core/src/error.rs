use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status text transports use for requests that were cancelled on purpose.
pub const ABORT_STATUS: &str = "abort";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("The following options are required: {}", .0.join(", "))]
    MissingOptions(Vec<String>),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Collect every field whose `present` flag is false into one error.
    pub fn require<'a>(fields: impl IntoIterator<Item = (&'a str, bool)>) -> Result<(), Self> {
        let missing: Vec<String> = fields
            .into_iter()
            .filter(|(_, present)| !present)
            .map(|(name, _)| name.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Self::MissingOptions(missing))
        }
    }
}

/// Failure reported by a transport for one fetch.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{status_text}: {message}")]
pub struct FetchFailure {
    pub status: Option<u16>,
    pub status_text: String,
    pub message: String,
}

impl FetchFailure {
    pub fn new(
        status: Option<u16>,
        status_text: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            message: message.into(),
        }
    }

    pub fn aborted() -> Self {
        Self::new(None, ABORT_STATUS, "request aborted")
    }

    pub fn is_abort(&self) -> bool {
        self.status_text == ABORT_STATUS
    }
}
