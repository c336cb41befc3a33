use crate::logging::LogFormat;
use crate::mode::ServerMode;

/// Address bound by production deployments.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Loopback address bound by development servers.
pub const DEVELOPMENT_HOST: &str = "127.0.0.1";

/// Port the HTTP service listens on unless overridden.
pub const DEFAULT_PORT: u16 = 8000;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// SQLite database used when no URL is configured.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://shinobi.db";

/// Prefix under which the versioned API routes are mounted.
pub const DEFAULT_API_PREFIX: &str = "/api/v1";

/// Human readable service name reported by the root endpoint.
pub const DEFAULT_APP_NAME: &str = "Shinobi Registry";

/// Owned host value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_host() -> String {
    DEFAULT_HOST.to_owned()
}

/// Default listening port.
#[must_use]
pub const fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Default operating mode.
#[must_use]
pub const fn default_mode() -> ServerMode {
    ServerMode::Production
}

/// Owned database URL default.
#[must_use]
pub fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_owned()
}

/// Owned API prefix default.
#[must_use]
pub fn default_api_prefix() -> String {
    DEFAULT_API_PREFIX.to_owned()
}

/// Owned application name default.
#[must_use]
pub fn default_app_name() -> String {
    DEFAULT_APP_NAME.to_owned()
}

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
