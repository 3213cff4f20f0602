//! Application configuration
//!
//! Read from `~/.config/ochp-bridge/config.toml` unless a path is given.
//! Every section is optional and falls back to its defaults.
//!
//! ```toml
//! [remote]
//! endpoint = "https://clearing.example.com/ochp/1.4"
//! username = "partner"
//! password = "secret"
//!
//! [sync]
//! status_period_secs = 30
//!
//! [operators]
//! exclude = ["DE*XYZ"]
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::application::sync::{Credentials, JobSettings, OperatorFilter, SyncSettings};
use crate::domain::OperatorId;
use crate::support::errors::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub remote: RemoteConfig,
    pub sync: SyncConfig,
    pub operators: OperatorsConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// SOAP endpoint of the clearing house
    pub endpoint: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub connect_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/ochp/1.4".to_string(),
            username: None,
            password: None,
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub data_enabled: bool,
    pub status_enabled: bool,
    pub data_period_secs: u64,
    pub status_period_secs: u64,
    pub data_timeout_secs: u64,
    pub status_timeout_secs: u64,
    pub incremental: bool,
    pub pull_tariffs: bool,
    pub pull_authorisations: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            data_enabled: true,
            status_enabled: true,
            data_period_secs: 900,
            status_period_secs: 60,
            data_timeout_secs: 120,
            status_timeout_secs: 30,
            incremental: true,
            pull_tariffs: true,
            pull_authorisations: true,
        }
    }
}

/// Operator ids in `CC*OOO` form. An empty include list accepts every
/// operator not excluded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorsConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// `host:port` for the Prometheus scrape endpoint; disabled when unset
    pub listen: Option<String>,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.remote.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("remote.endpoint must not be empty".into()));
        }
        if self.remote.username.is_some() != self.remote.password.is_some() {
            return Err(ConfigError::Invalid(
                "remote.username and remote.password must be set together".into(),
            ));
        }
        let durations = [
            ("sync.data_period_secs", self.sync.data_period_secs),
            ("sync.status_period_secs", self.sync.status_period_secs),
            ("sync.data_timeout_secs", self.sync.data_timeout_secs),
            ("sync.status_timeout_secs", self.sync.status_timeout_secs),
            ("remote.connect_timeout_secs", self.remote.connect_timeout_secs),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, secs)| *secs == 0) {
            return Err(ConfigError::Invalid(format!("{name} must be greater than zero")));
        }
        self.operator_filter()?;
        self.metrics_listen()?;
        Ok(())
    }

    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.remote.username, &self.remote.password) {
            (Some(username), Some(password)) => Some(Credentials::new(username, password)),
            _ => None,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.connect_timeout_secs)
    }

    pub fn operator_filter(&self) -> Result<OperatorFilter, ConfigError> {
        let parse = |ids: &[String]| -> Result<Vec<OperatorId>, ConfigError> {
            ids.iter()
                .map(|id| {
                    id.parse::<OperatorId>()
                        .map_err(|e| ConfigError::Invalid(format!("operators: {e}")))
                })
                .collect()
        };
        Ok(OperatorFilter::new(
            parse(&self.operators.include)?,
            parse(&self.operators.exclude)?,
        ))
    }

    pub fn sync_settings(&self) -> Result<SyncSettings, ConfigError> {
        Ok(SyncSettings {
            data: JobSettings {
                enabled: self.sync.data_enabled,
                period: Duration::from_secs(self.sync.data_period_secs),
                timeout: Duration::from_secs(self.sync.data_timeout_secs),
            },
            status: JobSettings {
                enabled: self.sync.status_enabled,
                period: Duration::from_secs(self.sync.status_period_secs),
                timeout: Duration::from_secs(self.sync.status_timeout_secs),
            },
            incremental: self.sync.incremental,
            pull_tariffs: self.sync.pull_tariffs,
            pull_authorisations: self.sync.pull_authorisations,
            operators: self.operator_filter()?,
        })
    }

    pub fn metrics_listen(&self) -> Result<Option<SocketAddr>, ConfigError> {
        self.metrics
            .listen
            .as_deref()
            .map(|addr| {
                addr.parse()
                    .map_err(|e| ConfigError::Invalid(format!("metrics.listen '{addr}': {e}")))
            })
            .transpose()
    }
}

/// `<config dir>/ochp-bridge/config.toml`, or `./config.toml` when the
/// platform has no config dir.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .map(|dir| dir.join("ochp-bridge").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}
