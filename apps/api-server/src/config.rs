//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use quill_core::workflow::upload::{AVATAR_MAX_BYTES, THUMBNAIL_MAX_BYTES};
use quill_infra::JwtConfig;
use quill_infra::database::DatabaseConfig;

/// Where uploads go and how large they may be.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub thumbnail_max_bytes: usize,
    pub avatar_max_bytes: usize,
    /// Hard cap on a whole multipart body.
    pub max_request_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("uploads"),
            thumbnail_max_bytes: THUMBNAIL_MAX_BYTES,
            avatar_max_bytes: AVATAR_MAX_BYTES,
            max_request_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: Option<DatabaseConfig>,
    pub uploads: UploadConfig,
    pub jwt: JwtConfig,
}

fn parsed<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let database = env::var("DATABASE_URL").ok().map(|url| DatabaseConfig {
            url,
            max_connections: parsed("DB_MAX_CONNECTIONS", 100),
            min_connections: parsed("DB_MIN_CONNECTIONS", 10),
            connect_timeout: Duration::from_secs(parsed("DB_CONNECT_TIMEOUT_SECS", 10)),
        });

        let defaults = UploadConfig::default();
        let uploads = UploadConfig {
            dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.dir),
            thumbnail_max_bytes: parsed("THUMBNAIL_MAX_BYTES", defaults.thumbnail_max_bytes),
            avatar_max_bytes: parsed("AVATAR_MAX_BYTES", defaults.avatar_max_bytes),
            max_request_bytes: parsed("MAX_REQUEST_BYTES", defaults.max_request_bytes),
        };

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parsed("PORT", 8080),
            database,
            uploads,
            jwt: JwtConfig::from_env(),
        }
    }
}
