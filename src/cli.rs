//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using the
//! `clap` crate. These arguments are parsed at startup and then merged with
//! the configuration from the `dingbridge.toml` file and environment variables.

use clap::{Parser, Subcommand};
use figment::{
    value::{Dict, Map, Tag, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Forwards Alertmanager notifications to DingTalk robots.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Logging level (overridden by RUST_LOG).
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Timeout for each robot request, in seconds.
    #[arg(long, value_name = "SECONDS")]
    pub timeout_seconds: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Validate the configuration and templates, then list the targets.
    Check,
    /// Render the notification for a target and print it without sending.
    Render {
        /// Name of the configured target.
        #[arg(short, long)]
        target: String,
        /// Alertmanager webhook JSON file, or `-` for stdin.
        #[arg(short, long, value_name = "FILE")]
        payload: PathBuf,
    },
    /// Render the notification for a target and send it.
    Send {
        /// Name of the configured target.
        #[arg(short, long)]
        target: String,
        /// Alertmanager webhook JSON file, or `-` for stdin.
        #[arg(short, long, value_name = "FILE")]
        payload: PathBuf,
    },
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        if let Some(timeout) = self.timeout_seconds {
            let mut http = Dict::new();
            http.insert("timeout_seconds".into(), Value::from(timeout));
            dict.insert("http".into(), Value::Dict(Tag::Default, http));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
