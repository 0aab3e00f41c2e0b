//! Pure state transition function
//!
//! Idle -> Pending on a non-empty send, Pending -> Idle when the exchange
//! finishes either way. Nothing here performs I/O; the caller applies the
//! returned effects to the transcript and input buffer.

use crate::api::Message;
use thiserror::Error;

/// Appended in place of a reply when an exchange fails
pub const APOLOGY: &str = "申し訳ありません。エラーが発生しました。もう一度お試しください。";

/// Exchange state of one conversation view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewState {
    #[default]
    Idle,
    /// An exchange is in flight; further sends are rejected
    Pending,
}

impl ViewState {
    pub fn is_pending(self) -> bool {
        matches!(self, ViewState::Pending)
    }
}

/// Events that drive the view
#[derive(Debug, Clone)]
pub enum Event {
    /// The user submitted the input buffer
    Send { text: String },
    /// The exchange sent from transcript generation `epoch` produced a reply
    ExchangeSucceeded { epoch: u64, reply: String },
    /// The exchange sent from transcript generation `epoch` failed
    ExchangeFailed { epoch: u64, reason: String },
    /// The user reset the conversation
    Clear,
}

/// Effects to apply after a transition, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Append(Message),
    ClearInput,
    /// Issue an exchange from the transcript as it stands after prior effects
    StartExchange { epoch: u64 },
    /// Replace the transcript with the greeting and start a new generation
    ResetTranscript,
}

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ViewState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ViewState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Rejected events. The view treats all of them as silent no-ops.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Input is empty")]
    EmptyInput,
    #[error("An exchange is already in flight")]
    Busy,
    #[error("No exchange is in flight")]
    NotPending,
}

/// Pure transition function. `epoch` is the current transcript generation;
/// replies to an exchange sent before the last clear are dropped.
pub fn transition(
    state: ViewState,
    epoch: u64,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        (_, Event::Send { text }) if text.trim().is_empty() => Err(TransitionError::EmptyInput),

        (ViewState::Pending, Event::Send { .. }) => Err(TransitionError::Busy),

        (ViewState::Idle, Event::Send { text }) => Ok(TransitionResult::new(ViewState::Pending)
            .with_effect(Effect::Append(Message::user(text)))
            .with_effect(Effect::ClearInput)
            .with_effect(Effect::StartExchange { epoch })),

        (ViewState::Pending, Event::ExchangeSucceeded { epoch: sent, reply }) => {
            let result = TransitionResult::new(ViewState::Idle);
            if sent == epoch {
                Ok(result.with_effect(Effect::Append(Message::assistant(reply))))
            } else {
                tracing::debug!(sent, current = epoch, "Dropping reply to cleared conversation");
                Ok(result)
            }
        }

        (ViewState::Pending, Event::ExchangeFailed { epoch: sent, reason }) => {
            tracing::warn!(reason = %reason, "Exchange failed");
            let result = TransitionResult::new(ViewState::Idle);
            if sent == epoch {
                Ok(result.with_effect(Effect::Append(Message::assistant(APOLOGY))))
            } else {
                Ok(result)
            }
        }

        (ViewState::Idle, Event::ExchangeSucceeded { .. } | Event::ExchangeFailed { .. }) => {
            Err(TransitionError::NotPending)
        }

        (state, Event::Clear) => {
            Ok(TransitionResult::new(state).with_effect(Effect::ResetTranscript))
        }
    }
}
