//! Configuration settings structures.

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;

fn default_app_name() -> String {
    "bulkline".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connection_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_page_size() -> u32 {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: AppConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logger: LoggerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
    /// Default page size for schedule listings.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Seconds to wait for a pooled connection.
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Bucket holding bulk upload inputs; storage endpoints are
    /// disabled when unset.
    #[serde(default)]
    pub bucket: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "pretty" or "json".
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.is_empty() {
            return Err(ConfigError::validation("database.url", "must not be empty"));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::validation(
                "database.max_connections",
                "must be at least 1",
            ));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::validation(
                "database.min_connections",
                "must not exceed max_connections",
            ));
        }
        if !matches!(self.logger.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::validation(
                "logger.format",
                "must be 'pretty' or 'json'",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(url: &str) -> Settings {
        Settings {
            app: AppConfig::default(),
            database: DatabaseConfig {
                url: url.to_string(),
                max_connections: 10,
                min_connections: 1,
                connection_timeout: 30,
            },
            storage: StorageConfig::default(),
            logger: LoggerConfig::default(),
        }
    }

    #[test]
    fn valid_settings_pass() {
        assert!(settings("postgres://localhost/bulkline").validate().is_ok());
    }

    #[test]
    fn empty_database_url_fails() {
        assert!(settings("").validate().is_err());
    }

    #[test]
    fn min_connections_cannot_exceed_max() {
        let mut s = settings("postgres://localhost/bulkline");
        s.database.min_connections = 20;
        assert!(s.validate().is_err());
    }

    #[test]
    fn deserializes_from_toml_with_defaults() {
        let s: Settings = toml::from_str(
            r#"
                [database]
                url = "postgres://localhost/bulkline"

                [storage]
                bucket = "bulk-inputs"
            "#,
        )
        .unwrap();
        assert_eq!(s.app.name, "bulkline");
        assert_eq!(s.database.min_connections, 1);
        assert_eq!(s.storage.bucket.as_deref(), Some("bulk-inputs"));
        assert_eq!(s.logger.format, "pretty");
    }

    #[test]
    fn unknown_log_format_fails() {
        let mut s = settings("postgres://localhost/bulkline");
        s.logger.format = "xml".to_string();
        assert!(s.validate().is_err());
    }
}
