//! Configuration loaded from `config/default.toml`.
//!
//! Every section is optional.  Environment variables (also read from a
//! `.env` file) override the file:
//!
//! | Variable            | Overrides           |
//! |---------------------|---------------------|
//! | `CHATFLOW_DB`       | `[database] path`   |
//! | `CHATFLOW_APP_USER` | `[bot] app_user`    |
//! | `CHATFLOW_LOG`      | `[logging] level`   |
//!
//! Loading happens before the tracing subscriber exists, so [`load`]
//! reports where the configuration came from instead of logging it.
//!
//! [`load`]: ChatflowConfig::load

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chatflow_engine::{Room, User};
use serde::Deserialize;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChatflowConfig {
    pub database: DatabaseConfig,
    pub bot: BotConfig,
    pub logging: LoggingConfig,
    pub directory: DirectoryConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file holding the rules.
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/chatflow.db"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Id of the automation's own user.  Its messages never trigger rules.
    pub app_user: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Log line format on stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
}

/// Users and rooms known to the console host.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    pub users: Vec<User>,
    pub rooms: Vec<Room>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Where a loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// The file did not exist; built-in defaults were used.
    Defaults(PathBuf),
}

impl ConfigSource {
    /// Log the source.  Call once tracing is initialized.
    pub fn log(&self) {
        match self {
            Self::File(path) => info!(path = %path.display(), "configuration loaded"),
            Self::Defaults(path) => {
                warn!(path = %path.display(), "configuration file not found, using defaults")
            }
        }
    }
}

impl ChatflowConfig {
    /// Load `path`, falling back to defaults when the file does not exist,
    /// then apply environment overrides.
    pub fn load(path: &Path) -> Result<(Self, ConfigSource)> {
        let (mut config, source) = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let config = Self::from_toml(&content)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            (config, ConfigSource::File(path.to_path_buf()))
        } else {
            (Self::default(), ConfigSource::Defaults(path.to_path_buf()))
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok((config, source))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `CHATFLOW_*` overrides looked up through `var`.
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        let set = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = set("CHATFLOW_DB") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(app_user) = set("CHATFLOW_APP_USER") {
            self.bot.app_user = Some(app_user);
        }
        if let Some(level) = set("CHATFLOW_LOG") {
            self.logging.level = level;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
