use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ConductorError, Result};

/// Top-level configuration for the conductor service.
///
/// Loaded from `~/.conductor/config.toml` by default. Each section
/// corresponds to one concern of the running process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConductorConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    /// Webhook executors registered when the process starts.
    #[serde(default)]
    pub executors: Vec<WebhookExecutorConfig>,
}

impl ConductorConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed, or if an
    /// `[engine]` value is out of range.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ConductorConfig = toml::from_str(&content)?;
        config.engine.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ConductorError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Bearer token for the management API. Generated at startup when unset.
    pub api_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3040,
            api_token: None,
        }
    }
}

/// Action engine tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lifetime of an approval request before the sweeper expires it.
    pub approval_ttl_hours: u32,
    /// How long a rollback plan is retained after successful execution.
    pub rollback_timeout_minutes: u64,
    /// Default webhook timeout when an executor does not set its own.
    pub webhook_timeout_ms: u64,
    /// Period of the approval expiry sweep.
    pub approval_sweep_interval_secs: u64,
    /// Largest batch accepted by the HTTP surface.
    pub max_batch_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            approval_ttl_hours: 24,
            rollback_timeout_minutes: 60,
            webhook_timeout_ms: 30_000,
            approval_sweep_interval_secs: 60,
            max_batch_size: 100,
        }
    }
}

impl EngineConfig {
    /// Thirty days.
    pub const MAX_ROLLBACK_TIMEOUT_MINUTES: u64 = 30 * 24 * 60;
    /// One year.
    pub const MAX_APPROVAL_TTL_HOURS: u32 = 365 * 24;
    /// Ten minutes.
    pub const MAX_WEBHOOK_TIMEOUT_MS: u64 = 10 * 60 * 1000;
    /// One day.
    pub const MAX_SWEEP_INTERVAL_SECS: u64 = 24 * 60 * 60;

    /// Reject values the engine cannot turn into timers.
    pub fn validate(&self) -> Result<()> {
        fn check(ok: bool, msg: String) -> Result<()> {
            if ok {
                Ok(())
            } else {
                Err(ConductorError::Config(msg))
            }
        }

        check(
            self.rollback_timeout_minutes <= Self::MAX_ROLLBACK_TIMEOUT_MINUTES,
            format!(
                "engine.rollback_timeout_minutes must be at most {}, got {}",
                Self::MAX_ROLLBACK_TIMEOUT_MINUTES,
                self.rollback_timeout_minutes
            ),
        )?;
        check(
            self.approval_ttl_hours <= Self::MAX_APPROVAL_TTL_HOURS,
            format!(
                "engine.approval_ttl_hours must be at most {}, got {}",
                Self::MAX_APPROVAL_TTL_HOURS,
                self.approval_ttl_hours
            ),
        )?;
        check(
            (1..=Self::MAX_WEBHOOK_TIMEOUT_MS).contains(&self.webhook_timeout_ms),
            format!(
                "engine.webhook_timeout_ms must be between 1 and {}, got {}",
                Self::MAX_WEBHOOK_TIMEOUT_MS,
                self.webhook_timeout_ms
            ),
        )?;
        check(
            (1..=Self::MAX_SWEEP_INTERVAL_SECS).contains(&self.approval_sweep_interval_secs),
            format!(
                "engine.approval_sweep_interval_secs must be between 1 and {}, got {}",
                Self::MAX_SWEEP_INTERVAL_SECS,
                self.approval_sweep_interval_secs
            ),
        )?;
        check(
            self.max_batch_size >= 1,
            "engine.max_batch_size must be at least 1".to_string(),
        )
    }
}

/// A third-party module reachable over a webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookExecutorConfig {
    pub module_id: String,
    pub supported_operations: Vec<String>,
    pub executor_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}
