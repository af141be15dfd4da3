//! Application configuration
//!
//! Loaded from TOML; every field has a default so an empty file (or no file)
//! is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding `database_url`
pub const DATABASE_URL_ENV: &str = "SSG_DATABASE_URL";

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    // === Storage ===
    /// sqlx SQLite URL
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Directory of the JSONL audit log
    #[serde(default = "default_audit_dir")]
    pub audit_dir: PathBuf,

    /// Where rendered certificates are written
    #[serde(default = "default_certificate_dir")]
    pub certificate_dir: PathBuf,

    // === Behaviour ===
    #[serde(default = "default_session_ttl_minutes")]
    pub session_ttl_minutes: i64,

    /// Location stamped on attendance records
    #[serde(default = "default_attendance_location")]
    pub attendance_location: String,

    /// Rows shown on the approver dashboard
    #[serde(default = "default_dashboard_limit")]
    pub dashboard_limit: usize,
}

fn default_database_url() -> String {
    "sqlite:data/ssg.db?mode=rwc".to_string()
}

fn default_audit_dir() -> PathBuf {
    PathBuf::from("data/audit")
}

fn default_certificate_dir() -> PathBuf {
    PathBuf::from("data/certificates")
}

fn default_session_ttl_minutes() -> i64 {
    60
}

fn default_attendance_location() -> String {
    "Event Venue".to_string()
}

fn default_dashboard_limit() -> usize {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            audit_dir: default_audit_dir(),
            certificate_dir: default_certificate_dir(),
            session_ttl_minutes: default_session_ttl_minutes(),
            attendance_location: default_attendance_location(),
            dashboard_limit: default_dashboard_limit(),
        }
    }
}

impl AppConfig {
    /// Load from a TOML file
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        Self::load_str(&std::fs::read_to_string(path)?)
    }

    /// Load from a TOML string
    pub fn load_str(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// File when given, else defaults; then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::load_file(path)?,
            None => Self::default(),
        }
        .with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.database_url = url;
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.database_url.starts_with("sqlite:") {
            return Err(ConfigError::Validation(format!(
                "database_url must be a sqlite URL, got '{}'",
                self.database_url
            )));
        }
        if self.session_ttl_minutes <= 0 {
            return Err(ConfigError::Validation(
                "session_ttl_minutes must be positive".to_string(),
            ));
        }
        if self.dashboard_limit == 0 {
            return Err(ConfigError::Validation(
                "dashboard_limit must be at least 1".to_string(),
            ));
        }
        if self.attendance_location.trim().is_empty() {
            return Err(ConfigError::Validation(
                "attendance_location must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session_ttl_minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = AppConfig::load_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.attendance_location, "Event Venue");
        assert_eq!(config.session_ttl_minutes, 60);
        assert_eq!(config.dashboard_limit, 10);
    }

    #[test]
    fn test_partial_override() {
        let config = AppConfig::load_str(
            r#"
            database_url = "sqlite::memory:"
            attendance_location = "Gymnasium"
            "#,
        )
        .unwrap();
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.attendance_location, "Gymnasium");
        assert_eq!(config.audit_dir, PathBuf::from("data/audit"));
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            AppConfig::load_str("session_ttl_minutes = 0"),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            AppConfig::load_str("database_url = \"postgres://x\""),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            AppConfig::load_str("dashboard_limit = \"many\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            AppConfig::load_file("/nonexistent/ssg.toml"),
            Err(ConfigError::NotFound(_))
        ));
    }
}
