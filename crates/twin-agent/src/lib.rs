//! Core orchestration for the twin assistant.
//!
//! This crate provides:
//! - Configuration loading and assistant instructions
//! - Tool declarations offered to the assistant
//! - Typed dispatch of tool calls to local handlers
//! - A run poller with bounded backoff and cancellation
//! - The request orchestrator tying assistant, thread, message and run together

mod config;
mod dispatch;
mod error;
mod instructions;
mod orchestrator;
mod poller;
pub mod tools;

#[cfg(test)]
mod testing;

pub use config::{Config, ConfigError};
pub use dispatch::{ChatQuery, DIGITAL_TWIN_PROMPT, ToolDispatcher, ToolInvocation};
pub use error::{AgentError, DispatchError};
pub use instructions::{build_instructions, today_in};
pub use orchestrator::{AssistantProfile, Orchestrator};
pub use poller::{PollPolicy, RunPoller};
