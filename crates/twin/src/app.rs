//! Wiring of configuration into a ready assistant.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono_tz::Tz;
use tokio::sync::watch;
use twin_agent::tools::assistant_tools;
use twin_agent::{
    AgentError, AssistantProfile, Config, Orchestrator, PollPolicy, ToolDispatcher,
    build_instructions, today_in,
};
use twin_calendar::GoogleCalendar;
use twin_openai::{Message, OpenAiClient};
use twin_store::{LookupKey, StoreError, ThreadStore};

use crate::repl::RequestHandler;

/// Command-line choices that shape the assistant.
#[derive(Debug, Clone)]
pub struct Settings {
    pub threads_db: PathBuf,
    pub lookup_key: LookupKey,
    /// Takes precedence over the configured assistant.
    pub assistant_id: Option<String>,
    pub files: Vec<PathBuf>,
    pub poll_max_interval: Duration,
    pub poll_timeout: Duration,
}

impl Settings {
    fn poll_policy(&self) -> PollPolicy {
        let defaults = PollPolicy::default();
        // At most one status check per second of the timeout.
        let max_attempts = u32::try_from(self.poll_timeout.as_secs())
            .unwrap_or(u32::MAX)
            .max(1);
        PollPolicy {
            initial_interval: defaults.initial_interval.min(self.poll_max_interval),
            max_interval: self.poll_max_interval,
            max_attempts,
            deadline: Some(self.poll_timeout),
            ..defaults
        }
    }
}

/// The assistant bound to one lookup key.
pub struct Twin {
    orchestrator: Orchestrator,
    profile: AssistantProfile,
    key: LookupKey,
    timezone: Tz,
}

impl Twin {
    pub fn new(config: &Config, settings: &Settings) -> Result<Self, StoreError> {
        let store = Arc::new(ThreadStore::open(&settings.threads_db)?);

        let api = Arc::new(
            OpenAiClient::new(config.openai_api_key.clone()).with_base_url(&config.api_base_url),
        );
        let calendar = Arc::new(
            GoogleCalendar::new(config.calendar_access_token.clone(), config.timezone)
                .with_calendar_id(&config.calendar_id),
        );
        let dispatcher = ToolDispatcher::new(calendar, api.clone(), &config.chat_model);
        let orchestrator =
            Orchestrator::new(api, store, dispatcher).with_poll_policy(settings.poll_policy());

        let instructions = build_instructions(
            config.owner_name.as_deref(),
            today_in(config.timezone),
            config.timezone,
        );
        let assistant_id = settings
            .assistant_id
            .clone()
            .or_else(|| config.assistant_id.clone());
        let profile = AssistantProfile::new(&config.model, instructions)
            .with_assistant_id(assistant_id)
            .with_tools(assistant_tools())
            .with_files(settings.files.clone());

        Ok(Self {
            orchestrator,
            profile,
            key: settings.lookup_key.clone(),
            timezone: config.timezone,
        })
    }

    pub fn key(&self) -> &LookupKey {
        &self.key
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub async fn history(&self) -> Result<Option<Vec<Message>>, AgentError> {
        self.orchestrator.history(&self.key).await
    }
}

#[async_trait]
impl RequestHandler for Twin {
    async fn handle(
        &self,
        text: &str,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<Option<String>, StoreError> {
        self.orchestrator
            .process(&self.profile, text, &self.key, cancel)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(timeout_secs: u64) -> Settings {
        Settings {
            threads_db: PathBuf::from("threads.db"),
            lookup_key: LookupKey::from(111u64),
            assistant_id: None,
            files: Vec::new(),
            poll_max_interval: Duration::from_secs(5),
            poll_timeout: Duration::from_secs(timeout_secs),
        }
    }

    #[test]
    fn poll_policy_follows_flags() {
        let policy = settings(900).poll_policy();
        assert_eq!(policy.max_interval, Duration::from_secs(5));
        assert_eq!(policy.deadline, Some(Duration::from_secs(900)));
        assert_eq!(policy.max_attempts, 900);
    }

    #[test]
    fn zero_timeout_keeps_one_attempt() {
        let mut s = settings(0);
        s.poll_max_interval = Duration::from_millis(100);
        let policy = s.poll_policy();
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.initial_interval, Duration::from_millis(100));
    }

    #[test]
    fn cli_assistant_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_json(
            r#"{"openai_api_key": "sk", "timezone": "UTC", "assistant_id": "asst_config"}"#,
        )
        .unwrap();
        let mut s = settings(60);
        s.threads_db = dir.path().join("threads.db");

        let twin = Twin::new(&config, &s).unwrap();
        assert_eq!(twin.profile.assistant_id.as_deref(), Some("asst_config"));

        s.assistant_id = Some("asst_cli".to_string());
        let twin = Twin::new(&config, &s).unwrap();
        assert_eq!(twin.profile.assistant_id.as_deref(), Some("asst_cli"));
        assert_eq!(twin.key().as_str(), "111");
    }
}
