//! Configuration file loading.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::Deserialize;
use thiserror::Error;
use twin_openai::DEFAULT_BASE_URL;

/// Model used for assistants created by twin.
pub const DEFAULT_MODEL: &str = "gpt-4-1106-preview";

/// Calendar used when the configuration names none.
pub const DEFAULT_CALENDAR_ID: &str = "primary";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file {} not found", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read configuration file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration file {} is not valid JSON: {source}", .path.display())]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("required configuration keys ('openai_api_key', 'timezone') are missing")]
    MissingKeys,

    #[error("the provided timezone '{0}' is not recognized")]
    InvalidTimezone(String),
}

/// Raw file contents; every key is optional until validated.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    openai_api_key: Option<String>,
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    chat_model: Option<String>,
    #[serde(default)]
    assistant_id: Option<String>,
    #[serde(default)]
    api_base_url: Option<String>,
    #[serde(default)]
    owner_name: Option<String>,
    #[serde(default)]
    calendar_access_token: Option<String>,
    #[serde(default)]
    calendar_id: Option<String>,
}

/// Validated runtime configuration.
#[derive(Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub timezone: Tz,
    /// Model for newly created assistants.
    pub model: String,
    /// Model used by `get_chat_response` when the call names none.
    pub chat_model: String,
    pub assistant_id: Option<String>,
    pub api_base_url: String,
    /// Whose assistant this is; used in the instructions.
    pub owner_name: Option<String>,
    pub calendar_access_token: Option<String>,
    pub calendar_id: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("openai_api_key", &"<redacted>")
            .field("timezone", &self.timezone)
            .field("model", &self.model)
            .field("chat_model", &self.chat_model)
            .field("assistant_id", &self.assistant_id)
            .field("api_base_url", &self.api_base_url)
            .field("owner_name", &self.owner_name)
            .field(
                "calendar_access_token",
                &self.calendar_access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("calendar_id", &self.calendar_id)
            .finish()
    }
}

impl Config {
    /// Read and validate a JSON configuration file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let raw: RawConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::InvalidJson {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_raw(raw)
    }

    /// Validate JSON text that did not come from a file.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            serde_json::from_str(text).map_err(|source| ConfigError::InvalidJson {
                path: PathBuf::from("<inline>"),
                source,
            })?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let (Some(openai_api_key), Some(timezone)) =
            (non_empty(raw.openai_api_key), non_empty(raw.timezone))
        else {
            return Err(ConfigError::MissingKeys);
        };

        let timezone: Tz = timezone
            .parse()
            .map_err(|_| ConfigError::InvalidTimezone(timezone.clone()))?;

        let model = non_empty(raw.model).unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let chat_model = non_empty(raw.chat_model).unwrap_or_else(|| model.clone());

        Ok(Self {
            openai_api_key,
            timezone,
            model,
            chat_model,
            assistant_id: non_empty(raw.assistant_id),
            api_base_url: non_empty(raw.api_base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            owner_name: non_empty(raw.owner_name),
            calendar_access_token: non_empty(raw.calendar_access_token),
            calendar_id: non_empty(raw.calendar_id)
                .unwrap_or_else(|| DEFAULT_CALENDAR_ID.to_string()),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
