//! Toyo Chat - Eastern-medicine consultation chat
//!
//! An HTTP endpoint that relays a conversation to a hosted LLM behind a
//! fixed domain preamble, and the conversation view that drives it.

pub mod api;
pub mod config;
pub mod llm;
pub mod preamble;
pub mod view;

#[cfg(test)]
mod testing;
