//! Configuration for the demo wizard server.
//!
//! Layered: embedded defaults, then an optional config file, then
//! `FORMWIZARD_*` environment variables (`FORMWIZARD_SERVER__PORT=8080`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Session namespace for wizard progress state.
    #[serde(default = "default_session_key")]
    pub session_key: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub wizard: WizardDemoConfig,
}

fn default_session_key() -> String {
    "Wizard".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_key: default_session_key(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            wizard: WizardDemoConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    7450
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Write logs to a file instead of stderr
    #[serde(default)]
    pub to_file: bool,
    /// Directory for log files when `to_file` is set
    #[serde(default = "default_log_dir")]
    pub dir: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: false,
            dir: default_log_dir(),
        }
    }
}

/// Shape of the demo checkout wizard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardDemoConfig {
    /// Path the wizard steps live under.
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// Disable the payment step so it auto-submits (e.g. free orders).
    #[serde(default)]
    pub skip_payment: bool,
}

fn default_base_path() -> String {
    "/checkout".to_string()
}

impl Default for WizardDemoConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            skip_payment: false,
        }
    }
}

impl Config {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Start with embedded defaults so the server runs without any file
        let defaults = Config::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        // Explicit config file (CLI override)
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment variables with FORMWIZARD_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("FORMWIZARD")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to load configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
