//! API server configuration.
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | Variable                    | Default       |
//! |-----------------------------|---------------|
//! | `TALLY_HTTP_PORT`           | `8080`        |
//! | `TALLY_DATABASE_PATH`       | `./tally.db`  |
//! | `TALLY_DB_MAX_CONNECTIONS`  | `5`           |
//! | `TALLY_JWT_SECRET`          | unset (auth off) |
//! | `TALLY_JWT_LIFETIME_SECS`   | `3600`        |
//! | `TALLY_LOW_STOCK_THRESHOLD` | `10`          |
//! | `TALLY_LOG_JSON`            | `false`       |

use std::env;
use std::str::FromStr;

use tally_core::DEFAULT_LOW_STOCK_THRESHOLD;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// HTTP listen port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Pool size
    pub db_max_connections: u32,

    /// HS256 secret. `None` disables the bearer-token gate.
    pub jwt_secret: Option<String>,

    /// Lifetime of tokens minted by [`crate::auth::JwtManager`]
    pub jwt_access_lifetime_secs: i64,

    /// Stock level at or below which a product is "low stock"
    pub low_stock_threshold: i64,

    /// Emit logs as JSON lines instead of human-readable text
    pub log_json: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            http_port: 8080,
            database_path: "./tally.db".to_string(),
            db_max_connections: 5,
            jwt_secret: None,
            jwt_access_lifetime_secs: 3600,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            log_json: false,
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ApiConfig::default();

        let config = ApiConfig {
            http_port: parse_or(&lookup, "TALLY_HTTP_PORT", defaults.http_port)?,

            database_path: lookup("TALLY_DATABASE_PATH").unwrap_or(defaults.database_path),

            db_max_connections: parse_or(
                &lookup,
                "TALLY_DB_MAX_CONNECTIONS",
                defaults.db_max_connections,
            )?,

            jwt_secret: lookup("TALLY_JWT_SECRET"),

            jwt_access_lifetime_secs: parse_or(
                &lookup,
                "TALLY_JWT_LIFETIME_SECS",
                defaults.jwt_access_lifetime_secs,
            )?,

            low_stock_threshold: parse_or(
                &lookup,
                "TALLY_LOW_STOCK_THRESHOLD",
                defaults.low_stock_threshold,
            )?,

            log_json: parse_or(&lookup, "TALLY_LOG_JSON", defaults.log_json)?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("TALLY_DB_MAX_CONNECTIONS".to_string()));
        }

        if self.low_stock_threshold < 0 {
            return Err(ConfigError::InvalidValue("TALLY_LOW_STOCK_THRESHOLD".to_string()));
        }

        if self.jwt_access_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue("TALLY_JWT_LIFETIME_SECS".to_string()));
        }

        if matches!(self.jwt_secret.as_deref(), Some(s) if s.trim().is_empty()) {
            return Err(ConfigError::InvalidValue("TALLY_JWT_SECRET".to_string()));
        }

        if self.database_path.trim().is_empty() {
            return Err(ConfigError::MissingRequired("TALLY_DATABASE_PATH".to_string()));
        }

        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.database_path, "./tally.db");
        assert_eq!(config.db_max_connections, 5);
        assert!(config.jwt_secret.is_none());
        assert_eq!(config.low_stock_threshold, 10);
        assert!(!config.log_json);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("TALLY_HTTP_PORT", "9000"),
            ("TALLY_JWT_SECRET", "s3cret"),
            ("TALLY_LOW_STOCK_THRESHOLD", "3"),
            ("TALLY_LOG_JSON", "true"),
        ])
        .unwrap();
        assert_eq!(config.http_port, 9000);
        assert_eq!(config.jwt_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.low_stock_threshold, 3);
        assert!(config.log_json);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("TALLY_HTTP_PORT", "not-a-port")]),
            Err(ConfigError::InvalidValue(key)) if key == "TALLY_HTTP_PORT"
        ));
        assert!(load(&[("TALLY_DB_MAX_CONNECTIONS", "0")]).is_err());
        assert!(load(&[("TALLY_LOW_STOCK_THRESHOLD", "-1")]).is_err());
        assert!(load(&[("TALLY_JWT_SECRET", "  ")]).is_err());
    }
}
