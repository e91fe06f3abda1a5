//! Error types for orchestration and dispatch.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use twin_calendar::CalendarError;
use twin_openai::{OpenAiError, RunStatus};
use twin_store::StoreError;

/// Errors that can occur while processing a request.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A remote call failed; `step` names the orchestration step.
    #[error("{step} failed: {source}")]
    Remote {
        step: &'static str,
        #[source]
        source: OpenAiError,
    },

    /// Thread store error. Fatal to the process.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Files were supplied without a tool that can read them.
    #[error("files are only supported if 'retrieval' or 'code_interpreter' tools are enabled")]
    FilesRequireRetrieval,

    /// A file to upload does not exist.
    #[error("the file {} does not exist", .0.display())]
    MissingFile(PathBuf),

    /// The run stopped without completing.
    #[error("run ended with status {status}: {reason}")]
    RunEnded { status: RunStatus, reason: String },

    /// The run completed but the thread has no assistant message.
    #[error("run completed without an assistant reply")]
    NoReply,

    /// The poller used up its status checks.
    #[error("gave up waiting for the run after {attempts} status checks")]
    PollExhausted { attempts: u32 },

    /// The poller's deadline passed.
    #[error("run did not finish within {0:?}")]
    PollTimeout(Duration),

    /// The caller cancelled the wait.
    #[error("request cancelled")]
    Cancelled,
}

/// Steps whose failure happens while a run is still active.
pub(crate) const RETRIEVE_RUN: &str = "retrieve run";
pub(crate) const SUBMIT_TOOL_OUTPUTS: &str = "submit tool outputs";

impl AgentError {
    /// Wrap a remote error with the step it happened in.
    pub(crate) fn remote(step: &'static str) -> impl FnOnce(OpenAiError) -> AgentError {
        move |source| AgentError::Remote { step, source }
    }

    /// Whether the wait ended before its run reached a terminal status.
    pub fn leaves_run_active(&self) -> bool {
        match self {
            AgentError::Cancelled
            | AgentError::PollTimeout(_)
            | AgentError::PollExhausted { .. } => true,
            AgentError::Remote { step, .. } => {
                *step == RETRIEVE_RUN || *step == SUBMIT_TOOL_OUTPUTS
            }
            _ => false,
        }
    }
}

/// Errors that keep a tool call from producing a handler output.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No handler is registered under this name.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// The arguments do not match the tool's parameters.
    #[error("invalid arguments for {tool}: {source}")]
    InvalidArguments {
        tool: String,
        #[source]
        source: serde_json::Error,
    },

    /// The calendar backend failed.
    #[error("{tool} failed: {source}")]
    Calendar {
        tool: &'static str,
        #[source]
        source: CalendarError,
    },
}
