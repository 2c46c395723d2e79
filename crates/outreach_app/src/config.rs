//! Application configuration, read from a RON file and overridden by CLI flags.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use log::LevelFilter;
use outreach_core::Transport;
use outreach_engine::{BackendSettings, EngineConfig, ExportOptions};
use outreach_logging::{LogDestination, LogSettings};
use serde::{Deserialize, Serialize};

use crate::session::SessionSettings;

pub const DEFAULT_CONFIG_FILE: &str = "outreach.ron";
pub const DEFAULT_REFRESH_AFTER_MS: u64 = 15_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum TransportSetting {
    #[default]
    Push,
    Poll,
}

impl From<TransportSetting> for Transport {
    fn from(setting: TransportSetting) -> Self {
        match setting {
            TransportSetting::Push => Transport::Push,
            TransportSetting::Poll => Transport::Poll,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogTarget {
    #[default]
    Terminal,
    File,
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub target: LogTarget,
    pub level: String,
    pub file: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            target: LogTarget::Terminal,
            level: "info".to_string(),
            file: PathBuf::from(outreach_logging::DEFAULT_LOG_FILE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub backend_url: String,
    pub api_key: Option<String>,
    pub request_timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Re-read the count after this long without progress; 0 disables.
    pub refresh_after_ms: u64,
    pub transport: TransportSetting,
    pub output_dir: PathBuf,
    pub required_fields: Vec<String>,
    pub auto_export: bool,
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let backend = BackendSettings::default();
        Self {
            backend_url: backend.base_url,
            api_key: None,
            request_timeout_ms: backend.request_timeout.as_millis() as u64,
            poll_interval_ms: outreach_engine::DEFAULT_POLL_INTERVAL.as_millis() as u64,
            refresh_after_ms: DEFAULT_REFRESH_AFTER_MS,
            transport: TransportSetting::Push,
            output_dir: PathBuf::from("output"),
            required_fields: outreach_core::DEFAULT_REQUIRED_FIELDS
                .iter()
                .map(|f| f.to_string())
                .collect(),
            auto_export: true,
            log: LogConfig::default(),
        }
    }
}

/// Values given on the command line; `None` keeps the file value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub backend_url: Option<String>,
    pub api_key: Option<String>,
    pub transport: Option<TransportSetting>,
    pub output_dir: Option<PathBuf>,
    pub poll_interval_ms: Option<u64>,
    pub refresh_after_ms: Option<u64>,
    pub no_export: bool,
    pub verbose: bool,
}

/// Loads `path`, or `outreach.ron` in the working directory when present, or defaults.
pub fn load(path: Option<&Path>) -> Result<AppConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default.exists() {
                return Ok(AppConfig::default());
            }
            default
        }
    };
    let text = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    parse(&text).with_context(|| format!("invalid config {}", path.display()))
}

pub fn parse(text: &str) -> Result<AppConfig> {
    Ok(ron::from_str(text)?)
}

impl AppConfig {
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(url) = overrides.backend_url {
            self.backend_url = url;
        }
        if let Some(key) = overrides.api_key {
            self.api_key = Some(key);
        }
        if let Some(transport) = overrides.transport {
            self.transport = transport;
        }
        if let Some(dir) = overrides.output_dir {
            self.output_dir = dir;
        }
        if let Some(ms) = overrides.poll_interval_ms {
            self.poll_interval_ms = ms;
        }
        if let Some(ms) = overrides.refresh_after_ms {
            self.refresh_after_ms = ms;
        }
        if overrides.no_export {
            self.auto_export = false;
        }
        if overrides.verbose {
            self.log.level = "debug".to_string();
        }
    }

    pub fn required_fields(&self) -> Vec<&str> {
        self.required_fields.iter().map(String::as_str).collect()
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            backend: BackendSettings {
                base_url: self.backend_url.clone(),
                api_key: self.api_key.clone().filter(|key| !key.is_empty()),
                request_timeout: Duration::from_millis(self.request_timeout_ms.max(1)),
                ..BackendSettings::default()
            },
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            output_dir: self.output_dir.clone(),
            export: ExportOptions::default(),
        }
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            transport: self.transport.into(),
            auto_export: self.auto_export,
            refresh_after: (self.refresh_after_ms > 0)
                .then(|| Duration::from_millis(self.refresh_after_ms)),
        }
    }

    pub fn log_settings(&self) -> LogSettings {
        LogSettings {
            destination: match self.log.target {
                LogTarget::Terminal => LogDestination::Terminal,
                LogTarget::File => LogDestination::File,
                LogTarget::Both => LogDestination::Both,
            },
            level: LevelFilter::from_str(&self.log.level).unwrap_or(LevelFilter::Info),
            file_path: self.log.file.clone(),
        }
    }
}
