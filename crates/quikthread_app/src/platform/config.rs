//! Application settings, read from `<data_dir>/quikthread.ron`.
//!
//! Every field is optional; missing fields take their defaults. Command-line
//! flags are applied on top with [`AppConfig::with_overrides`].

use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use quikthread_engine::{ApiSettings, DriverSettings, PollSettings};
use quikthread_logging::LogDestination;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILENAME: &str = "quikthread.ron";
pub const LOG_FILENAME: &str = "quikthread.log";

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogOutput {
    #[default]
    File,
    Terminal,
    Both,
}

impl From<LogOutput> for LogDestination {
    fn from(output: LogOutput) -> Self {
        match output {
            LogOutput::File => LogDestination::File,
            LogOutput::Terminal => LogDestination::Terminal,
            LogOutput::Both => LogDestination::Both,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub auth_token: Option<String>,
    /// Job poller tick period.
    pub poll_interval_ms: u64,
    /// Processing view display refresh period.
    pub status_interval_ms: u64,
    pub redirect_delay_ms: u64,
    /// Status checks per watched job before it is failed as timed out.
    pub max_poll_ticks: Option<u32>,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub log: LogOutput,
}

impl Default for AppConfig {
    fn default() -> Self {
        let api = ApiSettings::default();
        let poll = PollSettings::default();
        let driver = DriverSettings::default();
        Self {
            api_base_url: api.base_url,
            auth_token: None,
            poll_interval_ms: millis(poll.interval),
            status_interval_ms: millis(driver.status_interval),
            redirect_delay_ms: millis(driver.redirect_delay),
            max_poll_ticks: poll.max_ticks,
            connect_timeout_ms: millis(api.connect_timeout),
            request_timeout_ms: millis(api.request_timeout),
            log: LogOutput::default(),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl AppConfig {
    /// Reads the config file. `None` means there is no file and the caller
    /// should fall back to the defaults.
    pub fn read(path: &Path) -> anyhow::Result<Option<Self>> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("reading {}", path.display()));
            }
        };
        Self::parse(&text)
            .map(Some)
            .with_context(|| format!("parsing {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    pub fn with_overrides(mut self, api_base_url: Option<String>, auth_token: Option<String>) -> Self {
        if let Some(url) = api_base_url {
            self.api_base_url = url;
        }
        if auth_token.is_some() {
            self.auth_token = auth_token;
        }
        self
    }

    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            base_url: self.api_base_url.clone(),
            auth_token: self.auth_token.clone(),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            max_ticks: self.max_poll_ticks,
        }
    }

    pub fn driver_settings(&self) -> DriverSettings {
        DriverSettings {
            status_interval: Duration::from_millis(self.status_interval_ms.max(1)),
            redirect_delay: Duration::from_millis(self.redirect_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn defaults_match_engine_settings() {
        let config = AppConfig::default();
        assert_eq!(config.api_base_url, "http://localhost:8000/api");
        assert_eq!(config.poll_interval_ms, 3000);
        assert_eq!(config.status_interval_ms, 2000);
        assert_eq!(config.redirect_delay_ms, 1000);
        assert_eq!(config.max_poll_ticks, Some(400));
        assert_eq!(config.log, LogOutput::File);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = AppConfig::parse(
            r#"(
                api_base_url: "https://quikthread.example/api",
                poll_interval_ms: 500,
                max_poll_ticks: None,
                log: Both,
            )"#,
        )
        .unwrap();
        assert_eq!(config.api_base_url, "https://quikthread.example/api");
        assert_eq!(config.poll_settings().interval, Duration::from_millis(500));
        assert_eq!(config.poll_settings().max_ticks, None);
        assert_eq!(config.status_interval_ms, 2000);
        assert_eq!(config.log, LogOutput::Both);
    }

    #[test]
    fn missing_file_reads_as_none() {
        let temp = TempDir::new().unwrap();
        assert_eq!(AppConfig::read(&temp.path().join(CONFIG_FILENAME)).unwrap(), None);
    }

    #[test]
    fn present_file_is_reported_as_read() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILENAME);
        fs::write(&path, "(redirect_delay_ms: 250)").unwrap();
        let config = AppConfig::read(&path).unwrap().unwrap();
        assert_eq!(config.redirect_delay_ms, 250);
        assert_eq!(config.poll_interval_ms, 3000);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILENAME);
        fs::write(&path, "(poll_interval_ms: \"soon\")").unwrap();
        let err = AppConfig::read(&path).unwrap_err();
        assert!(err.to_string().contains("parsing"));
    }

    #[test]
    fn overrides_replace_only_given_values() {
        let base = AppConfig {
            auth_token: Some("from-file".to_string()),
            ..AppConfig::default()
        };
        let config = base
            .clone()
            .with_overrides(Some("http://other/api".to_string()), None);
        assert_eq!(config.api_base_url, "http://other/api");
        assert_eq!(config.auth_token.as_deref(), Some("from-file"));

        let config = base.with_overrides(None, Some("from-env".to_string()));
        assert_eq!(config.api_base_url, "http://localhost:8000/api");
        assert_eq!(config.api_settings().auth_token.as_deref(), Some("from-env"));
    }
}
