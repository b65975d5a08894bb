//! Configuration management for dingbridge
//!
//! This module defines the main `Config` struct and its sub-structs,
//! responsible for holding all application settings. It uses the `figment`
//! crate to load configuration from a `dingbridge.toml` file and merge it
//! with environment variables and command-line overrides.

use crate::cli::Cli;
use crate::template::{DEFAULT_TEXT_TEMPLATE, DEFAULT_TITLE_TEMPLATE};
use anyhow::{bail, Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// The configuration file used when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "dingbridge.toml";

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Settings for the outbound HTTP client.
    pub http: HttpConfig,
    /// Extra Handlebars template files, registered as partials by file stem.
    #[serde(default)]
    pub templates: Vec<PathBuf>,
    /// Templates used by targets that do not define their own.
    pub default_message: MessageConfig,
    /// The configured robots, keyed by target name.
    #[serde(default)]
    pub targets: BTreeMap<String, TargetConfig>,
}

/// Settings for the outbound HTTP client.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HttpConfig {
    /// Overall timeout for a single request, in seconds.
    pub timeout_seconds: u64,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// A configured DingTalk robot.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct TargetConfig {
    /// The robot webhook URL, including its `access_token`.
    pub url: String,
    /// The signing secret (`SEC...`). Absent or empty sends unsigned requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    /// Who to mention in the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mention: Option<MentionConfig>,
    /// Title and text templates for this target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<MessageConfig>,
}

impl TargetConfig {
    /// Returns the secret to sign with, if signing is enabled for this target.
    pub fn signing_secret(&self) -> Option<&str> {
        self.secret.as_deref().filter(|secret| !secret.is_empty())
    }
}

/// A mention directive attached to every message sent to a target.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct MentionConfig {
    /// Mention everyone in the group.
    #[serde(default)]
    pub all: bool,
    /// Mobile numbers of the members to mention.
    #[serde(default)]
    pub mobiles: Vec<String>,
}

/// The title and text templates of a message.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MessageConfig {
    pub title: String,
    pub text: String,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE_TEMPLATE.to_string(),
            text: DEFAULT_TEXT_TEMPLATE.to_string(),
        }
    }
}

impl Config {
    /// Loads the application configuration by layering defaults, the TOML
    /// file, environment variables and command-line arguments.
    ///
    /// # Arguments
    /// * `cli` - The parsed command-line arguments. `cli.config` selects the
    ///   TOML file; it falls back to [`DEFAULT_CONFIG_FILE`].
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let mut config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            // e.g. DINGBRIDGE_TARGETS__OPS__SECRET=SEC...
            .merge(Env::prefixed("DINGBRIDGE_").split("__"))
            .merge(cli.clone())
            .extract()
            .with_context(|| format!("failed to load configuration from {}", config_path.display()))?;

        config.apply_default_message();
        config.validate()?;
        Ok(config)
    }

    /// Gives every target without a `message` block the default templates.
    fn apply_default_message(&mut self) {
        for target in self.targets.values_mut() {
            if target.message.is_none() {
                target.message = Some(self.default_message.clone());
            }
        }
    }

    /// Checks invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.http.timeout_seconds == 0 {
            bail!("http.timeout_seconds must be greater than zero");
        }
        for (name, target) in &self.targets {
            if name.trim().is_empty() {
                bail!("target names must not be empty");
            }
            url::Url::parse(&target.url)
                .with_context(|| format!("target '{}' has an invalid url", name))?;
        }
        Ok(())
    }
}

// Provide a default implementation for tests and easy setup.
impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            http: HttpConfig { timeout_seconds: 5 },
            templates: vec![],
            default_message: MessageConfig::default(),
            targets: BTreeMap::new(),
        }
    }
}
