use crate::orders::StatusPolicy;
use crate::realtime::{CHANGE_FEED_CAPACITY, MAX_CATCH_UP_EVENTS};
use std::path::PathBuf;

/// Server configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | ./data | store file and logs |
/// | HTTP_PORT | 3000 | HTTP / WebSocket port |
/// | ENVIRONMENT | development | environment name |
/// | LOG_LEVEL | info | tracing level |
/// | PUBLIC_BASE_URL | http://localhost:5173 | base of the QR table links |
/// | JWT_SECRET | (dev key) | HS256 secret shared with the auth provider |
/// | ORDER_STATUS_POLICY | strict | `strict` or `permissive` |
/// | CHANGE_FEED_CAPACITY | 1024 | broadcast buffer size |
/// | MAX_CATCH_UP_EVENTS | 500 | replay limit before a resync |
///
/// # Example
///
/// ```ignore
/// WORK_DIR=/data/dine HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Holds `dine.redb` and `logs/`
    pub work_dir: String,
    pub http_port: u16,
    /// development | staging | production
    pub environment: String,
    pub log_level: String,
    pub public_base_url: String,
    pub jwt_secret: Option<String>,
    pub order_status_policy: StatusPolicy,
    pub change_feed_capacity: usize,
    pub max_catch_up_events: usize,
}

impl Config {
    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:5173".into()),
            jwt_secret: std::env::var("JWT_SECRET").ok().filter(|s| !s.is_empty()),
            order_status_policy: std::env::var("ORDER_STATUS_POLICY")
                .ok()
                .and_then(|p| match p.parse() {
                    Ok(policy) => Some(policy),
                    Err(e) => {
                        tracing::warn!(error = %e, "Falling back to strict order status policy");
                        None
                    }
                })
                .unwrap_or_default(),
            change_feed_capacity: std::env::var("CHANGE_FEED_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(CHANGE_FEED_CAPACITY),
            max_catch_up_events: std::env::var("MAX_CATCH_UP_EVENTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(MAX_CATCH_UP_EVENTS),
        }
    }

    /// Override selected values; mostly for tests
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Path of the redb store file
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("dine.redb")
    }

    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    /// Create the work directory layout if missing
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.work_dir)?;
        std::fs::create_dir_all(self.log_dir())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_under_work_dir() {
        let config = Config::with_overrides("/tmp/dine-test", 0);
        assert_eq!(config.db_path(), PathBuf::from("/tmp/dine-test/dine.redb"));
        assert_eq!(config.log_dir(), PathBuf::from("/tmp/dine-test/logs"));
    }

    #[test]
    fn test_ensure_work_dir_structure() {
        let dir = tempfile::tempdir().unwrap();
        let work_dir = dir.path().join("nested");
        let config = Config::with_overrides(work_dir.to_string_lossy(), 0);
        config.ensure_work_dir_structure().unwrap();
        assert!(config.log_dir().is_dir());
    }
}
