//! Request orchestration.
//!
//! One request runs these steps in order:
//! 1. resolve or create the assistant
//! 2. resolve or create the thread for the lookup key
//! 3. append the user's message
//! 4. start a run
//! 5. wait for the run's reply
//!
//! Completed steps are not rolled back when a later one fails.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{OnceCell, watch};
use tracing::{error, info, instrument, warn};
use twin_openai::{AssistantApi, CreateAssistantRequest, Message, SortOrder, ToolDeclaration};
use twin_store::{LookupKey, StoreError, ThreadStore};

use crate::{AgentError, PollPolicy, RunPoller, ToolDispatcher};

/// Name given to assistants created by twin.
pub const DEFAULT_ASSISTANT_NAME: &str = "Digital Twin";

/// The assistant a request should run against.
#[derive(Debug, Clone)]
pub struct AssistantProfile {
    /// Existing remote assistant; reused as is when set.
    pub assistant_id: Option<String>,
    pub name: String,
    pub model: String,
    pub instructions: String,
    pub tools: Vec<ToolDeclaration>,
    /// Knowledge files, uploaded when a new assistant is created.
    pub files: Vec<PathBuf>,
}

impl AssistantProfile {
    pub fn new(model: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            assistant_id: None,
            name: DEFAULT_ASSISTANT_NAME.to_string(),
            model: model.into(),
            instructions: instructions.into(),
            tools: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn with_assistant_id(mut self, assistant_id: Option<String>) -> Self {
        self.assistant_id = assistant_id;
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDeclaration>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_files(mut self, files: Vec<PathBuf>) -> Self {
        self.files = files;
        self
    }

    /// Check that the files can be used with the declared tools.
    pub fn validate_files(&self) -> Result<(), AgentError> {
        if self.files.is_empty() {
            return Ok(());
        }
        if !self.tools.iter().any(ToolDeclaration::reads_files) {
            return Err(AgentError::FilesRequireRetrieval);
        }
        if let Some(missing) = self.files.iter().find(|path| !path.is_file()) {
            return Err(AgentError::MissingFile(missing.clone()));
        }
        Ok(())
    }
}

/// Relays user requests to the assistant.
pub struct Orchestrator {
    api: Arc<dyn AssistantApi>,
    store: Arc<ThreadStore>,
    dispatcher: ToolDispatcher,
    policy: PollPolicy,
    /// Assistant created by this process, reused by later requests that
    /// name no assistant.
    created_assistant: OnceCell<String>,
}

impl Orchestrator {
    pub fn new(
        api: Arc<dyn AssistantApi>,
        store: Arc<ThreadStore>,
        dispatcher: ToolDispatcher,
    ) -> Self {
        Self {
            api,
            store,
            dispatcher,
            policy: PollPolicy::default(),
            created_assistant: OnceCell::new(),
        }
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Process one request.
    ///
    /// Remote and validation failures are logged and yield `Ok(None)`.
    /// Thread store failures are returned.
    pub async fn process(
        &self,
        profile: &AssistantProfile,
        user_text: &str,
        key: &LookupKey,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<Option<String>, StoreError> {
        match self.try_process(profile, user_text, key, cancel).await {
            Ok(reply) => Ok(Some(reply)),
            Err(AgentError::Store(e)) => Err(e),
            Err(e) => {
                error!(lookup_key = %key, error = %e, "request failed");
                Ok(None)
            }
        }
    }

    /// Process one request, returning every failure.
    #[instrument(skip_all, fields(lookup_key = %key))]
    pub async fn try_process(
        &self,
        profile: &AssistantProfile,
        user_text: &str,
        key: &LookupKey,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<String, AgentError> {
        let assistant_id = self.resolve_assistant(profile).await?;
        let thread_id = self.resolve_thread(key).await?;

        self.api
            .create_message(&thread_id, user_text)
            .await
            .map_err(AgentError::remote("add message"))?;

        let run = self
            .api
            .create_run(&thread_id, &assistant_id)
            .await
            .map_err(AgentError::remote("create run"))?;
        info!(run_id = %run.id, %thread_id, %assistant_id, "run started");

        RunPoller::new(self.api.as_ref(), &self.dispatcher, &self.policy)
            .wait_for_reply(&thread_id, &run.id, cancel)
            .await
    }

    /// Id of the assistant to run, creating one if the profile names none.
    pub async fn resolve_assistant(&self, profile: &AssistantProfile) -> Result<String, AgentError> {
        profile.validate_files()?;

        if let Some(id) = &profile.assistant_id {
            let assistant = self
                .api
                .retrieve_assistant(id)
                .await
                .map_err(AgentError::remote("retrieve assistant"))?;
            return Ok(assistant.id);
        }

        self.created_assistant
            .get_or_try_init(|| self.create_assistant(profile))
            .await
            .cloned()
    }

    async fn create_assistant(&self, profile: &AssistantProfile) -> Result<String, AgentError> {
        let mut file_ids = Vec::with_capacity(profile.files.len());
        for path in &profile.files {
            let file = self
                .api
                .upload_file(path)
                .await
                .map_err(AgentError::remote("upload file"))?;
            info!(file_id = %file.id, path = %path.display(), "uploaded file");
            file_ids.push(file.id);
        }

        let request = CreateAssistantRequest {
            model: profile.model.clone(),
            name: Some(profile.name.clone()),
            instructions: Some(profile.instructions.clone()),
            tools: profile.tools.clone(),
            file_ids,
        };
        let assistant = self
            .api
            .create_assistant(&request)
            .await
            .map_err(AgentError::remote("create assistant"))?;
        info!(assistant_id = %assistant.id, "created assistant");
        Ok(assistant.id)
    }

    /// Id of the thread for `key`, creating and storing one on a miss.
    pub async fn resolve_thread(&self, key: &LookupKey) -> Result<String, AgentError> {
        match self.store.lookup(key)? {
            Some(thread_id) => {
                info!(lookup_key = %key, %thread_id, "continuing stored thread");
                let thread = self
                    .api
                    .retrieve_thread(&thread_id)
                    .await
                    .inspect_err(|e| {
                        if e.is_not_found() {
                            warn!(lookup_key = %key, %thread_id, "stored thread no longer exists");
                        }
                    })
                    .map_err(AgentError::remote("retrieve thread"))?;
                Ok(thread.id)
            }
            None => {
                let thread = self
                    .api
                    .create_thread()
                    .await
                    .map_err(AgentError::remote("create thread"))?;
                self.store.store(key, &thread.id)?;
                info!(lookup_key = %key, thread_id = %thread.id, "created thread");
                Ok(thread.id)
            }
        }
    }

    /// Messages of the thread stored under `key`, oldest first.
    ///
    /// `None` when no thread is stored for the key.
    pub async fn history(&self, key: &LookupKey) -> Result<Option<Vec<Message>>, AgentError> {
        let Some(thread_id) = self.store.lookup(key)? else {
            return Ok(None);
        };
        let messages = self
            .api
            .list_messages(&thread_id, SortOrder::Asc)
            .await
            .map_err(AgentError::remote("list messages"))?;
        Ok(Some(messages))
    }
}
