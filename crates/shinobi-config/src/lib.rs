//! Shared configuration for the Shinobi server and its task runner.
//!
//! Values are layered by `ortho_config`: built-in defaults, then an optional
//! TOML file (`--config-path` or `SHINOBI_CONFIG_PATH`), then `SHINOBI_*`
//! environment variables, then command-line flags. Both `shinobid` and the
//! `shinobi` task runner load the same [`Config`] so the runner can locate
//! the artefacts written by the server it launches.

mod database;
mod defaults;
mod logging;
mod mode;
mod runtime;

use std::path::PathBuf;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use database::{DatabaseLocation, DatabaseUrlError};
pub use defaults::{
    DEFAULT_API_PREFIX, DEFAULT_APP_NAME, DEFAULT_DATABASE_URL, DEFAULT_HOST, DEFAULT_LOG_FILTER,
    DEFAULT_PORT, DEVELOPMENT_HOST, default_log_filter, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError, LogSettings};
pub use mode::{ServerMode, ServerModeParseError};
pub use runtime::{RuntimePaths, RuntimePathsError, default_runtime_directory};

/// Resolved runtime environment for a Shinobi process.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "SHINOBI")]
pub struct Config {
    /// Interface the HTTP listener binds to.
    #[serde(default = "defaults::default_host")]
    #[ortho_config(default = defaults::default_host())]
    pub host: String,
    /// TCP port the HTTP listener binds to.
    #[serde(default = "defaults::default_port")]
    #[ortho_config(default = defaults::default_port())]
    pub port: u16,
    /// Production or development behaviour.
    #[serde(default = "defaults::default_mode")]
    #[ortho_config(default = defaults::default_mode())]
    pub mode: ServerMode,
    /// `sqlite:` URL of the application store.
    #[serde(default = "defaults::default_database_url")]
    #[ortho_config(default = defaults::default_database_url())]
    pub database_url: String,
    /// Name reported by the root endpoint.
    #[serde(default = "defaults::default_app_name")]
    #[ortho_config(default = defaults::default_app_name())]
    pub app_name: String,
    /// Prefix for the versioned API routes.
    #[serde(default = "defaults::default_api_prefix")]
    #[ortho_config(default = defaults::default_api_prefix())]
    pub api_prefix: String,
    /// Account the production server switches to when started as root.
    #[serde(default)]
    pub run_as: Option<String>,
    /// Directory for pid and health snapshots.
    #[serde(default)]
    pub runtime_dir: Option<PathBuf>,
    /// `EnvFilter` directive for the tracing subscriber.
    #[serde(default = "defaults::default_log_filter_string")]
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Tracing output format.
    #[serde(default = "defaults::default_log_format")]
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: defaults::default_host(),
            port: defaults::default_port(),
            mode: defaults::default_mode(),
            database_url: defaults::default_database_url(),
            app_name: defaults::default_app_name(),
            api_prefix: defaults::default_api_prefix(),
            run_as: None,
            runtime_dir: None,
            log_filter: defaults::default_log_filter_string(),
            log_format: defaults::default_log_format(),
        }
    }
}

impl Config {
    /// `host:port` string handed to the socket layer.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Operating mode.
    #[must_use]
    pub const fn mode(&self) -> ServerMode {
        self.mode
    }

    /// Parses [`Self::database_url`].
    pub fn database_location(&self) -> Result<DatabaseLocation, DatabaseUrlError> {
        DatabaseLocation::parse(&self.database_url)
    }

    /// API prefix normalised to a leading slash and no trailing slash.
    ///
    /// An empty or `/` prefix mounts the API at the root.
    #[must_use]
    pub fn api_prefix(&self) -> String {
        let trimmed = self.api_prefix.trim().trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        }
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Logging settings as a single borrowed view.
    #[must_use]
    pub fn log_settings(&self) -> LogSettings<'_> {
        LogSettings {
            filter: &self.log_filter,
            format: self.log_format,
        }
    }
}
