//! Application configuration loaded from environment variables.

use std::time::Duration;

use saga::ExecutionMode;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL URL; unset means an in-memory store
/// - `LIMIT_SERVICE_URL`: limit service base URL; unset means an in-memory
///   limit service
/// - `JWT_SECRET_KEY`: HS256 signing secret
/// - `JWT_DURATION_SECS`: token lifetime (default: `1800`)
/// - `SAGA_EXECUTION_MODE`: `sequential` or `concurrent` (default: `sequential`)
/// - `LIMIT_CLIENT_TIMEOUT_SECS`: connect timeout of the limit client (default: `30`)
///
/// Unparseable values fall back to their defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub limit_service_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_duration: Duration,
    pub execution_mode: ExecutionMode,
    pub limit_client_timeout: Duration,
}

const DEFAULT_JWT_SECRET: &str = "insecure-development-secret";

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let secs = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or_default(),
            database_url: non_empty("DATABASE_URL"),
            limit_service_url: non_empty("LIMIT_SERVICE_URL"),
            jwt_secret: non_empty("JWT_SECRET_KEY").unwrap_or(defaults.jwt_secret),
            jwt_duration: secs("JWT_DURATION_SECS", defaults.jwt_duration),
            execution_mode: lookup("SAGA_EXECUTION_MODE")
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
            limit_client_timeout: secs("LIMIT_CLIENT_TIMEOUT_SECS", defaults.limit_client_timeout),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            limit_service_url: None,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            jwt_duration: Duration::from_secs(1800),
            execution_mode: ExecutionMode::Sequential,
            limit_client_timeout: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> Config {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.database_url.is_none());
        assert!(config.limit_service_url.is_none());
        assert_eq!(config.jwt_duration, Duration::from_secs(1800));
        assert_eq!(config.execution_mode, ExecutionMode::Sequential);
        assert_eq!(config.limit_client_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_reads_all_variables() {
        let config = from_pairs(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "9000"),
            ("RUST_LOG", "debug"),
            ("LOG_FORMAT", "JSON"),
            ("DATABASE_URL", "postgres://localhost/tx"),
            ("LIMIT_SERVICE_URL", "http://limits:8080"),
            ("JWT_SECRET_KEY", "s3cret"),
            ("JWT_DURATION_SECS", "60"),
            ("SAGA_EXECUTION_MODE", "Concurrent"),
            ("LIMIT_CLIENT_TIMEOUT_SECS", "5"),
        ]);

        assert_eq!(config.addr(), "127.0.0.1:9000");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/tx"));
        assert_eq!(config.limit_service_url.as_deref(), Some("http://limits:8080"));
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.jwt_duration, Duration::from_secs(60));
        assert_eq!(config.execution_mode, ExecutionMode::Concurrent);
        assert_eq!(config.limit_client_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let config = from_pairs(&[
            ("PORT", "not-a-port"),
            ("JWT_DURATION_SECS", "-1"),
            ("SAGA_EXECUTION_MODE", "parallel"),
            ("DATABASE_URL", "  "),
        ]);

        assert_eq!(config.port, 3000);
        assert_eq!(config.jwt_duration, Duration::from_secs(1800));
        assert_eq!(config.execution_mode, ExecutionMode::Sequential);
        assert!(config.database_url.is_none());
    }
}
