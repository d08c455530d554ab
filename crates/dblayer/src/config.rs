//! Connection configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Settings for [`Database`](crate::Database) and [`DbLayer`](crate::DbLayer).
///
/// Every field except `url` has a default, so a config can be deserialized
/// from a partial document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DbConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
    /// Statements slower than this are logged at `warn`.
    #[serde(default = "default_slow_query_ms")]
    pub slow_query_ms: u64,
    #[serde(default = "default_audit_table")]
    pub audit_table: String,
}

const fn default_max_connections() -> u32 {
    10
}

const fn default_acquire_timeout_secs() -> u64 {
    30
}

const fn default_slow_query_ms() -> u64 {
    500
}

fn default_audit_table() -> String {
    String::from("audit_logs")
}

impl DbConfig {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            slow_query_ms: default_slow_query_ms(),
            audit_table: default_audit_table(),
        }
    }

    /// Reads the configuration from the environment, loading `.env` first
    /// if one exists.
    ///
    /// `DATABASE_URL` is required; `DB_MAX_CONNECTIONS`,
    /// `DB_ACQUIRE_TIMEOUT_SECS`, `DB_SLOW_QUERY_MS` and `DB_AUDIT_TABLE`
    /// override the defaults.
    pub fn from_env() -> Result<Self> {
        // A missing .env file is not an error.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let url = lookup("DATABASE_URL")
            .ok_or_else(|| Error::Config(String::from("DATABASE_URL is not set")))?;
        let mut config = Self::new(url);
        if let Some(value) = lookup("DB_MAX_CONNECTIONS") {
            config.max_connections = parse_var("DB_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = lookup("DB_ACQUIRE_TIMEOUT_SECS") {
            config.acquire_timeout_secs = parse_var("DB_ACQUIRE_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = lookup("DB_SLOW_QUERY_MS") {
            config.slow_query_ms = parse_var("DB_SLOW_QUERY_MS", &value)?;
        }
        if let Some(value) = lookup("DB_AUDIT_TABLE") {
            dblayer_core::dialect::validate_identifier(&value)?;
            config.audit_table = value;
        }
        Ok(config)
    }

    #[must_use]
    pub const fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    #[must_use]
    pub const fn slow_query_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_query_ms)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key} has an invalid value: {value:?}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (String::from(*k), String::from(*v)))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = DbConfig::from_lookup(lookup(&[("DATABASE_URL", "sqlite::memory:")])).unwrap();
        assert_eq!(config, DbConfig::new("sqlite::memory:"));
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.slow_query_threshold(), Duration::from_millis(500));
        assert_eq!(config.audit_table, "audit_logs");
    }

    #[test]
    fn test_overrides() {
        let config = DbConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/app"),
            ("DB_MAX_CONNECTIONS", "4"),
            ("DB_ACQUIRE_TIMEOUT_SECS", " 5 "),
            ("DB_AUDIT_TABLE", "history"),
        ]))
        .unwrap();
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.acquire_timeout(), Duration::from_secs(5));
        assert_eq!(config.audit_table, "history");
    }

    #[test]
    fn test_missing_url_and_bad_numbers() {
        assert!(matches!(
            DbConfig::from_lookup(lookup(&[])),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            DbConfig::from_lookup(lookup(&[
                ("DATABASE_URL", "mysql://x"),
                ("DB_SLOW_QUERY_MS", "fast"),
            ])),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: DbConfig =
            serde_json::from_str(r#"{"url": "mysql://localhost/app", "slow_query_ms": 50}"#)
                .unwrap();
        assert_eq!(config.slow_query_ms, 50);
        assert_eq!(config.max_connections, 10);
    }
}
