//! API request and response types

use crate::transcript::Turn;
use serde::{Deserialize, Serialize};

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// Response for a new session
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub turns: Vec<Turn>,
}

/// Response with the transcript of an existing session
#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptResponse {
    pub session_id: String,
    pub turns: Vec<Turn>,
    pub agent_working: bool,
}

/// Response for a processed chat message
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Full transcript after the turn
    pub turns: Vec<Turn>,
    /// Turns added by this message
    pub appended: Vec<Turn>,
    /// Failure detail for the error banner; not part of the transcript
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_error: Option<String>,
}

/// Response for lifecycle actions
#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
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
