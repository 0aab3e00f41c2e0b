//! Append-only conversation transcript

use crate::api::{Message, Role};

/// First message of every conversation
pub const GREETING: &str = "こんにちは。東洋医学AIです。ご質問をどうぞ。";

/// Ordered messages of one session. Grows only by appending; the only other
/// mutation is a reset to the greeting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            messages: vec![Message::assistant(GREETING)],
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_user(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::User)
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}
