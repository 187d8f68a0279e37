use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "tutor.toml";

/// Main configuration for the relay bot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub discord: DiscordConfig,
    pub api: ApiConfig,
    pub ledger: LedgerConfig,
    pub polling: PollingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Discord bot token
    pub token: String,
    pub application_id: Option<u64>,
    /// Register slash commands in this guild only; global otherwise
    pub guild_id: Option<u64>,
    /// Where new course announcements are posted
    pub announcement_channel_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to
    pub url_prefix: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    /// Pre-issued JWT to start with
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub forward_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url_prefix: String::new(),
            username: String::new(),
            password: String::new(),
            token: None,
            forward_timeout_secs: 10,
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// JSON file holding pending responses
    pub path: String,
    /// Drop all pending responses at start-up
    pub purge_on_start: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: "answers.json".to_string(),
            purge_on_start: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub enabled: bool,
    pub announcements_interval_secs: u64,
    pub private_messages_interval_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            announcements_interval_secs: 3600,
            private_messages_interval_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: String,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: "logs".to_string(),
            file_prefix: "tutor-bot.log".to_string(),
        }
    }
}

impl ApiConfig {
    pub fn forward_timeout(&self) -> Duration {
        Duration::from_secs(self.forward_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl PollingConfig {
    pub fn announcements_interval(&self) -> Duration {
        Duration::from_secs(self.announcements_interval_secs)
    }

    pub fn private_messages_interval(&self) -> Duration {
        Duration::from_secs(self.private_messages_interval_secs)
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.discord.token.is_empty() {
            return Err(ConfigError::invalid(
                "discord.token",
                "Discord token cannot be empty",
            ));
        }
        if self.api.url_prefix.is_empty() {
            return Err(ConfigError::invalid(
                "api.url_prefix",
                "API URL prefix cannot be empty",
            ));
        }
        if self.ledger.path.is_empty() {
            return Err(ConfigError::invalid(
                "ledger.path",
                "Ledger path cannot be empty",
            ));
        }
        if self.api.forward_timeout_secs == 0 || self.api.request_timeout_secs == 0 {
            return Err(ConfigError::invalid("api", "Timeouts must be non-zero"));
        }
        if self.polling.enabled
            && (self.polling.announcements_interval_secs == 0
                || self.polling.private_messages_interval_secs == 0)
        {
            return Err(ConfigError::invalid(
                "polling",
                "Polling intervals must be non-zero",
            ));
        }

        Ok(())
    }

    /// Load configuration from a config file and environment variables
    ///
    /// `path` wins over `TUTOR_CONFIG`, which wins over `tutor.toml`. A missing
    /// file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| env::var(key).ok())
    }

    pub fn load_with(
        path: Option<&Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let config_path = path
            .map(Path::to_path_buf)
            .or_else(|| lookup("TUTOR_CONFIG").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let config = if config_path.exists() {
            let contents =
                std::fs::read_to_string(&config_path).map_err(|cause| ConfigError::ReadFailed {
                    path: config_path.display().to_string(),
                    cause,
                })?;
            toml::from_str(&contents).map_err(|cause| ConfigError::ParseFailed {
                path: config_path.display().to_string(),
                cause,
            })?
        } else {
            Self::default()
        };

        Ok(config.override_from(lookup))
    }

    /// Override config values with environment variables
    fn override_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        // Discord
        if let Some(token) = lookup("DISCORD_TOKEN") {
            self.discord.token = token;
        }
        if let Some(id) = lookup("APP_ID").and_then(|v| v.parse().ok()) {
            self.discord.application_id = Some(id);
        }
        if let Some(id) = lookup("DISCORD_GUILD_ID").and_then(|v| v.parse().ok()) {
            self.discord.guild_id = Some(id);
        }
        if let Some(id) = lookup("ANNOUNCEMENT_CHANNEL_ID").and_then(|v| v.parse().ok()) {
            self.discord.announcement_channel_id = Some(id);
        }

        // API
        if let Some(prefix) = lookup("API_URL_PREFIX") {
            self.api.url_prefix = prefix;
        }
        if let Some(username) = lookup("API_USERNAME") {
            self.api.username = username;
        }
        if let Some(password) = lookup("API_PASSWORD") {
            self.api.password = password;
        }

        if let Some(path) = lookup("LEDGER_PATH") {
            self.ledger.path = path;
        }
        if let Some(dir) = lookup("LOG_DIR") {
            self.logging.directory = dir;
        }

        self
    }
}

/// Helper to load dotenv file if it exists
pub fn load_dotenv() {
    if let Ok(path) = env::var("DOTENV_PATH") {
        dotenvy::from_path(&path).ok();
    } else {
        dotenvy::dotenv().ok();
    }
}
