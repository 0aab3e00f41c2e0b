//! API request and response types

use crate::llm::LlmMessage;
use serde::{Deserialize, Serialize};

/// Reply used when the provider returns no usable text
pub const NO_ANSWER: &str = "回答が生成できませんでした。";

pub const INVALID_MESSAGES: &str = "Invalid messages format";
pub const METHOD_NOT_ALLOWED: &str = "Method not allowed";
pub const UPSTREAM_FAILED: &str = "AI応答に失敗しました。";

/// Speaker of a client-visible message. Clients may not send `system`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One transcript entry as exchanged between view and endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

impl From<&Message> for LlmMessage {
    fn from(message: &Message) -> Self {
        match message.role {
            Role::User => LlmMessage::user(message.content.clone()),
            Role::Assistant => LlmMessage::assistant(message.content.clone()),
        }
    }
}

/// Body of `POST /api/ask`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub messages: Vec<Message>,
}

/// Successful answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub result: String,
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
