//! Conversation view
//!
//! Owns the transcript, the input buffer and the pending flag for one
//! session. At most one exchange is in flight at a time; sending while
//! pending, or sending blank input, does nothing.

mod client;
mod transcript;
pub mod transition;

pub use client::{ExchangeClient, ExchangeError, HttpExchangeClient};
pub use transcript::{Transcript, GREETING};
pub use transition::{transition, Effect, Event, TransitionError, ViewState, APOLOGY};

use crate::api::Message;

/// What each exchange carries to the endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadMode {
    /// The whole transcript, greeting included
    #[default]
    FullHistory,
    /// Only the message just sent
    LatestOnly,
}

impl PayloadMode {
    /// Parse `full` / `latest` (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "full" => Some(Self::FullHistory),
            "latest" => Some(Self::LatestOnly),
            _ => None,
        }
    }
}

/// An exchange the caller must perform and report back via
/// [`ConversationView::complete`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRequest {
    pub epoch: u64,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone)]
pub struct ConversationView {
    transcript: Transcript,
    input: String,
    state: ViewState,
    /// Transcript generation, bumped on every clear
    epoch: u64,
    mode: PayloadMode,
}

impl ConversationView {
    pub fn new(mode: PayloadMode) -> Self {
        Self {
            transcript: Transcript::new(),
            input: String::new(),
            state: ViewState::Idle,
            epoch: 0,
            mode,
        }
    }

    pub fn messages(&self) -> &[Message] {
        self.transcript.messages()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn is_pending(&self) -> bool {
        self.state.is_pending()
    }

    /// Send the input buffer. Returns the exchange to perform, or `None` when
    /// the input is blank or an exchange is already pending.
    pub fn submit(&mut self) -> Option<ExchangeRequest> {
        let text = self.input.clone();
        self.dispatch(Event::Send { text })
    }

    /// Report the outcome of the exchange started from generation `epoch`.
    pub fn complete(&mut self, epoch: u64, outcome: Result<String, ExchangeError>) {
        let event = match outcome {
            Ok(reply) => Event::ExchangeSucceeded { epoch, reply },
            Err(e) => Event::ExchangeFailed {
                epoch,
                reason: e.to_string(),
            },
        };
        self.dispatch(event);
    }

    /// Reset to the greeting. An in-flight reply will be discarded.
    pub fn clear(&mut self) {
        self.dispatch(Event::Clear);
    }

    /// Submit, run the exchange on `client`, and record its outcome.
    /// Returns whether an exchange took place.
    pub async fn send(&mut self, client: &dyn ExchangeClient) -> bool {
        let Some(request) = self.submit() else {
            return false;
        };
        let outcome = client.exchange(&request.messages).await;
        self.complete(request.epoch, outcome);
        true
    }

    fn dispatch(&mut self, event: Event) -> Option<ExchangeRequest> {
        let result = match transition(self.state, self.epoch, event) {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring view event");
                return None;
            }
        };

        self.state = result.new_state;
        let mut request = None;
        for effect in result.effects {
            match effect {
                Effect::Append(message) => self.transcript.push(message),
                Effect::ClearInput => self.input.clear(),
                Effect::ResetTranscript => {
                    self.transcript.reset();
                    self.epoch += 1;
                }
                Effect::StartExchange { epoch } => {
                    request = Some(ExchangeRequest {
                        epoch,
                        messages: self.payload(),
                    });
                }
            }
        }
        request
    }

    fn payload(&self) -> Vec<Message> {
        match self.mode {
            PayloadMode::FullHistory => self.transcript.messages().to_vec(),
            PayloadMode::LatestOnly => self.transcript.last_user().cloned().into_iter().collect(),
        }
    }
}

impl Default for ConversationView {
    fn default() -> Self {
        Self::new(PayloadMode::default())
    }
}
