//! HTTP exchange endpoint
//!
//! `POST /api/ask` relays a conversation to the provider behind the system
//! preamble and answers with the first reply text.

mod handlers;
mod types;

pub use handlers::{build_request, create_router};
pub use types::*;

use crate::llm::LlmService;
use crate::preamble::PreambleSource;
use std::sync::Arc;

/// Application state shared across handlers. Immutable, so concurrent
/// requests never contend.
#[derive(Clone)]
pub struct AppState {
    pub llm: Arc<dyn LlmService>,
    pub preamble: Arc<PreambleSource>,
}

impl AppState {
    pub fn new(llm: Arc<dyn LlmService>, preamble: PreambleSource) -> Self {
        Self {
            llm,
            preamble: Arc::new(preamble),
        }
    }
}
