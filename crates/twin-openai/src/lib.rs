//! Client for the hosted assistants API.
//!
//! This crate wraps the parts of the OpenAI Assistants (beta v1) and chat
//! completions endpoints that twin relies on:
//!
//! - **Assistants**: retrieve or create an assistant with tools and files
//! - **Threads**: create, retrieve, append messages, list messages
//! - **Runs**: start a run, poll its status, submit tool outputs
//! - **Chat**: one-shot chat completions
//!
//! The [`AssistantApi`] trait is the seam the orchestration layer depends on,
//! so it can be driven by a scripted fake in tests.

mod api;
mod client;
mod error;
mod types;

pub use api::AssistantApi;
pub use client::{DEFAULT_BASE_URL, OpenAiClient};
pub use error::OpenAiError;
pub use types::*;
