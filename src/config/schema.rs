use crate::error::ConfigError;
use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Workspace directory - computed from home, not serialized
    #[serde(skip)]
    pub workspace_dir: PathBuf,
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Base URL of the research platform API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    pub api_key: Option<String>,
    /// Named interaction research tasks are submitted to.
    #[serde(default = "default_interaction_name")]
    pub interaction_name: String,

    #[serde(default)]
    pub polling: PollingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace_dir: PathBuf::new(),
            config_path: PathBuf::new(),
            api_base_url: default_api_base_url(),
            api_key: None,
            interaction_name: default_interaction_name(),
            polling: PollingConfig::default(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.vertesia.io/api/v1".to_string()
}

fn default_interaction_name() -> String {
    "ResearchV2".to_string()
}

// ── Polling schedule ──────────────────────────────────────────────

/// Cadences and budgets of the job-tracking schedule. The defaults are the
/// production schedule; tests shrink them to keep paused-clock runs short.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Nominal completion estimate shown as a countdown.
    #[serde(default = "default_estimate_secs")]
    pub estimate_secs: u64,
    /// Cadence of document polls once the estimate elapses.
    #[serde(default = "default_aggressive_interval_secs")]
    pub aggressive_interval_secs: u64,
    /// Attempt budget of the aggressive window.
    #[serde(default = "default_aggressive_max_polls")]
    pub aggressive_max_polls: u32,
    /// Cadence of the open-ended slow phase.
    #[serde(default = "default_slow_interval_secs")]
    pub slow_interval_secs: u64,
    /// Persisted jobs older than this are discarded at load, never resumed.
    #[serde(default = "default_resume_expiry_secs")]
    pub resume_expiry_secs: u64,
    /// How long the "complete" state is shown before returning to idle.
    #[serde(default = "default_completion_hold_secs")]
    pub completion_hold_secs: u64,
    /// Idle time in the slow phase before the progress surface minimizes.
    #[serde(default = "default_minimize_after_secs")]
    pub minimize_after_secs: u64,
    /// Cadence of chat run-status polls.
    #[serde(default = "default_chat_poll_interval_secs")]
    pub chat_poll_interval_secs: u64,
    /// Attempt budget for one chat exchange.
    #[serde(default = "default_chat_max_polls")]
    pub chat_max_polls: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            estimate_secs: default_estimate_secs(),
            aggressive_interval_secs: default_aggressive_interval_secs(),
            aggressive_max_polls: default_aggressive_max_polls(),
            slow_interval_secs: default_slow_interval_secs(),
            resume_expiry_secs: default_resume_expiry_secs(),
            completion_hold_secs: default_completion_hold_secs(),
            minimize_after_secs: default_minimize_after_secs(),
            chat_poll_interval_secs: default_chat_poll_interval_secs(),
            chat_max_polls: default_chat_max_polls(),
        }
    }
}

fn default_estimate_secs() -> u64 {
    300
}

fn default_aggressive_interval_secs() -> u64 {
    10
}

fn default_aggressive_max_polls() -> u32 {
    12
}

fn default_slow_interval_secs() -> u64 {
    420
}

fn default_resume_expiry_secs() -> u64 {
    1800
}

fn default_completion_hold_secs() -> u64 {
    4
}

fn default_minimize_after_secs() -> u64 {
    10
}

fn default_chat_poll_interval_secs() -> u64 {
    2
}

fn default_chat_max_polls() -> u32 {
    30
}

impl PollingConfig {
    /// Reject values the schedule cannot run with.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.aggressive_interval_secs == 0
            || self.slow_interval_secs == 0
            || self.chat_poll_interval_secs == 0
        {
            return Err(ConfigError::Validation(
                "polling intervals must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }
}

// ── Loading / persistence ─────────────────────────────────────────

impl Config {
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        let app_dir = home.join(".deepresearch");
        let config_path = app_dir.join("config.toml");

        if !app_dir.exists() {
            fs::create_dir_all(&app_dir).context("Failed to create .deepresearch directory")?;
            fs::create_dir_all(app_dir.join("workspace"))
                .context("Failed to create workspace directory")?;
        }

        if config_path.exists() {
            let contents =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            // Set computed paths that are skipped during serialization
            config.config_path.clone_from(&config_path);
            config.workspace_dir = app_dir.join("workspace");
            config.polling.validate()?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            let mut config = Self {
                config_path: config_path.clone(),
                workspace_dir: app_dir.join("workspace"),
                ..Self::default()
            };
            config.save()?;
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("DEEPRESEARCH_API_KEY") {
            if !key.is_empty() {
                self.api_key = Some(key);
            }
        }

        if let Ok(base) = std::env::var("DEEPRESEARCH_API_BASE") {
            if !base.is_empty() {
                self.api_base_url = base;
            }
        }

        if let Ok(workspace) = std::env::var("DEEPRESEARCH_WORKSPACE") {
            if !workspace.is_empty() {
                self.workspace_dir = PathBuf::from(workspace);
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }
}
