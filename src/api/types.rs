//! API request and response types

use serde::{Deserialize, Serialize};

/// Query parameters of the chat endpoint
#[derive(Debug, Default, Deserialize)]
pub struct ChatQuery {
    #[serde(default)]
    pub message: Option<String>,
}

impl ChatQuery {
    /// The question with surrounding whitespace removed, if any remains
    pub fn question(&self) -> Option<&str> {
        self.message
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
