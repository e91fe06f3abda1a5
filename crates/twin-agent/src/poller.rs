//! Waiting on assistant runs.
//!
//! A run moves through `queued`/`in_progress` until it either needs tool outputs
//! (`requires_action`), finishes (`completed`) or stops (`failed`, `cancelled`,
//! `expired`, `incomplete`). The poller checks the run on an exponential backoff,
//! runs requested tools in between, and gives up after a bounded number of
//! checks, an overall deadline, or a cancellation signal.

use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use serde_json::json;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use twin_openai::{AssistantApi, Role, Run, RunStatus, SortOrder, ToolCall, ToolOutput};

use crate::error::{RETRIEVE_RUN, SUBMIT_TOOL_OUTPUTS};
use crate::{AgentError, ToolDispatcher};

/// How long and how often to check a run.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Wait before the first status check.
    pub initial_interval: Duration,
    /// Longest wait between checks.
    pub max_interval: Duration,
    pub multiplier: f64,
    /// Status checks allowed before giving up.
    pub max_attempts: u32,
    /// Overall limit on the wait; `None` waits until attempts run out.
    pub deadline: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(5),
            multiplier: 1.5,
            max_attempts: 360,
            deadline: Some(Duration::from_secs(15 * 60)),
        }
    }
}

impl PollPolicy {
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_interval,
            current_interval: self.initial_interval,
            max_interval: self.max_interval,
            multiplier: self.multiplier,
            randomization_factor: 0.0,
            // The deadline is enforced by the poller so that resets keep it.
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// Drives one run to completion.
pub struct RunPoller<'a> {
    api: &'a dyn AssistantApi,
    dispatcher: &'a ToolDispatcher,
    policy: &'a PollPolicy,
}

impl<'a> RunPoller<'a> {
    pub fn new(
        api: &'a dyn AssistantApi,
        dispatcher: &'a ToolDispatcher,
        policy: &'a PollPolicy,
    ) -> Self {
        Self {
            api,
            dispatcher,
            policy,
        }
    }

    /// Wait for the run to finish and return the assistant's reply.
    ///
    /// The run is checked at least once. Sending `true` on `cancel` ends the
    /// wait with [`AgentError::Cancelled`]. A run left active when the wait
    /// ends is cancelled on the service so the thread accepts new messages.
    pub async fn wait_for_reply(
        &self,
        thread_id: &str,
        run_id: &str,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<String, AgentError> {
        let result = self.poll(thread_id, run_id, cancel).await;
        if let Err(e) = &result {
            if e.leaves_run_active() {
                self.cancel_run(thread_id, run_id).await;
            }
        }
        result
    }

    async fn poll(
        &self,
        thread_id: &str,
        run_id: &str,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<String, AgentError> {
        let started = Instant::now();
        let mut backoff = self.policy.backoff();
        let mut attempts = 0u32;

        loop {
            if attempts > 0 {
                if let Some(deadline) = self.policy.deadline {
                    if started.elapsed() >= deadline {
                        warn!(run_id, attempts, "run did not finish before the deadline");
                        return Err(AgentError::PollTimeout(deadline));
                    }
                }
                if attempts >= self.policy.max_attempts {
                    warn!(run_id, attempts, "giving up on run");
                    return Err(AgentError::PollExhausted { attempts });
                }
            }

            let wait = self.next_wait(&mut backoff, started);
            if pause(wait, cancel).await {
                info!(run_id, "wait for run cancelled");
                return Err(AgentError::Cancelled);
            }

            attempts += 1;
            let run = self
                .api
                .retrieve_run(thread_id, run_id)
                .await
                .map_err(AgentError::remote(RETRIEVE_RUN))?;

            match run.status {
                RunStatus::Completed => {
                    info!(run_id, attempts, "run completed");
                    return self.latest_reply(thread_id).await;
                }
                RunStatus::RequiresAction => {
                    self.submit_tool_outputs(thread_id, &run).await?;
                    backoff.reset();
                }
                RunStatus::Queued | RunStatus::InProgress | RunStatus::Cancelling => {
                    debug!(run_id, status = %run.status, attempts, "run still processing");
                }
                status if status.is_failure() => {
                    let reason = run
                        .last_error
                        .map(|e| format!("{}: {}", e.code, e.message))
                        .unwrap_or_else(|| "no error reported".to_string());
                    warn!(run_id, %status, %reason, "run ended without completing");
                    return Err(AgentError::RunEnded { status, reason });
                }
                status => {
                    warn!(run_id, %status, "unrecognized run status, still polling");
                }
            }
        }
    }

    /// Next backoff step, capped at `max_interval` and at the time left
    /// before the deadline.
    fn next_wait(&self, backoff: &mut ExponentialBackoff, started: Instant) -> Duration {
        let wait = backoff
            .next_backoff()
            .unwrap_or(self.policy.max_interval)
            .min(self.policy.max_interval);
        match self.policy.deadline {
            Some(deadline) => wait.min(deadline.saturating_sub(started.elapsed())),
            None => wait,
        }
    }

    /// Best effort; a failure is logged and the run left to expire.
    async fn cancel_run(&self, thread_id: &str, run_id: &str) {
        match self.api.cancel_run(thread_id, run_id).await {
            Ok(run) => info!(run_id, status = %run.status, "cancelled abandoned run"),
            Err(e) => warn!(run_id, error = %e, "failed to cancel abandoned run"),
        }
    }

    /// Run every pending call and submit all outputs in one request.
    async fn submit_tool_outputs(&self, thread_id: &str, run: &Run) -> Result<(), AgentError> {
        let calls = run.pending_tool_calls();
        if calls.is_empty() {
            warn!(run_id = %run.id, "run requires action but lists no tool calls");
            return Ok(());
        }

        let outputs = self.run_tool_calls(calls).await;
        info!(run_id = %run.id, count = outputs.len(), "submitting tool outputs");
        self.api
            .submit_tool_outputs(thread_id, &run.id, &outputs)
            .await
            .map_err(AgentError::remote(SUBMIT_TOOL_OUTPUTS))?;
        Ok(())
    }

    /// One output per call, in call order. Calls that cannot be dispatched
    /// get an error object as their output.
    pub async fn run_tool_calls(&self, calls: &[ToolCall]) -> Vec<ToolOutput> {
        let mut outputs = Vec::with_capacity(calls.len());
        for call in calls {
            let result = match call.arguments() {
                Ok(arguments) => self
                    .dispatcher
                    .dispatch(&call.function.name, arguments)
                    .await
                    .map_err(|e| e.to_string()),
                Err(e) => Err(format!("arguments are not valid JSON: {e}")),
            };

            let output = match result {
                Ok(output) => output,
                Err(message) => {
                    warn!(
                        call_id = %call.id,
                        tool = %call.function.name,
                        error = %message,
                        "tool call failed"
                    );
                    json!({ "error": message }).to_string()
                }
            };

            outputs.push(ToolOutput {
                tool_call_id: call.id.clone(),
                output,
            });
        }
        outputs
    }

    /// Text of the newest assistant message in the thread.
    async fn latest_reply(&self, thread_id: &str) -> Result<String, AgentError> {
        let messages = self
            .api
            .list_messages(thread_id, SortOrder::Desc)
            .await
            .map_err(AgentError::remote("list messages"))?;

        messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .find_map(|m| m.text())
            .ok_or(AgentError::NoReply)
    }
}

/// Sleep for `wait`. Returns `true` if cancelled first.
async fn pause(wait: Duration, cancel: &mut watch::Receiver<bool>) -> bool {
    if *cancel.borrow() {
        return true;
    }

    let sleep = tokio::time::sleep(wait);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return false,
            changed = cancel.changed() => match changed {
                Ok(()) if *cancel.borrow() => return true,
                Ok(()) => continue,
                Err(_) => {
                    // Sender gone; nothing can cancel this wait any more.
                    (&mut sleep).await;
                    return false;
                }
            },
        }
    }
}
