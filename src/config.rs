/// Configuration management for the clipstream account service
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub tokens: TokenConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Base URL blobs are served from, e.g. "https://cdn.clipstream.example"
    pub public_url: String,
    pub upload_limit: usize,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub account_db: PathBuf,
    pub blob_directory: PathBuf,
    pub tmp_directory: PathBuf,
}

/// Token signing configuration
///
/// Injected into the token issuer at construction. Access and refresh
/// secrets are distinct key domains: a token signed with one never verifies
/// against the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("CLIPSTREAM_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("CLIPSTREAM_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| AppError::Validation("Invalid port number".to_string()))?;
        let public_url = env::var("CLIPSTREAM_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", hostname, port));
        let upload_limit = env::var("CLIPSTREAM_UPLOAD_LIMIT")
            .unwrap_or_else(|_| "10485760".to_string())
            .parse()
            .unwrap_or(10 * 1024 * 1024);

        let data_directory: PathBuf = env::var("CLIPSTREAM_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let account_db = env::var("CLIPSTREAM_ACCOUNT_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("accounts.sqlite"));
        let blob_directory = env::var("CLIPSTREAM_BLOB_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("blobs"));
        let tmp_directory = env::var("CLIPSTREAM_TMP_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("tmp"));

        let access_secret = env::var("CLIPSTREAM_ACCESS_TOKEN_SECRET")
            .map_err(|_| AppError::Validation("Access token secret required".to_string()))?;
        let refresh_secret = env::var("CLIPSTREAM_REFRESH_TOKEN_SECRET")
            .map_err(|_| AppError::Validation("Refresh token secret required".to_string()))?;
        let access_ttl_secs = env::var("CLIPSTREAM_ACCESS_TOKEN_TTL_SECS")
            .unwrap_or_else(|_| "900".to_string())
            .parse()
            .map_err(|_| AppError::Validation("Invalid access token TTL".to_string()))?;
        let refresh_ttl_secs = env::var("CLIPSTREAM_REFRESH_TOKEN_TTL_SECS")
            .unwrap_or_else(|_| "864000".to_string())
            .parse()
            .map_err(|_| AppError::Validation("Invalid refresh token TTL".to_string()))?;

        let level = env::var("CLIPSTREAM_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let config = Self {
            service: ServiceConfig {
                hostname,
                port,
                public_url,
                upload_limit,
            },
            storage: StorageConfig {
                data_directory,
                account_db,
                blob_directory,
                tmp_directory,
            },
            tokens: TokenConfig {
                access_secret,
                refresh_secret,
                access_ttl_secs,
                refresh_ttl_secs,
            },
            logging: LoggingConfig { level },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration consistency
    pub fn validate(&self) -> AppResult<()> {
        if self.tokens.access_secret.is_empty() || self.tokens.refresh_secret.is_empty() {
            return Err(AppError::Validation(
                "Token secrets must not be empty".to_string(),
            ));
        }

        // Disjoint key domains: sharing a secret would make access and
        // refresh tokens interchangeable.
        if self.tokens.access_secret == self.tokens.refresh_secret {
            return Err(AppError::Validation(
                "Access and refresh token secrets must differ".to_string(),
            ));
        }

        if self.tokens.access_ttl_secs <= 0 || self.tokens.refresh_ttl_secs <= 0 {
            return Err(AppError::Validation(
                "Token TTLs must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ServerConfig {
        ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 8080,
                public_url: "http://localhost:8080".to_string(),
                upload_limit: 1024,
            },
            storage: StorageConfig {
                data_directory: "./data".into(),
                account_db: "./data/accounts.sqlite".into(),
                blob_directory: "./data/blobs".into(),
                tmp_directory: "./data/tmp".into(),
            },
            tokens: TokenConfig {
                access_secret: "secret-a".to_string(),
                refresh_secret: "secret-b".to_string(),
                access_ttl_secs: 900,
                refresh_ttl_secs: 864000,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_shared_secret_rejected() {
        let mut config = test_config();
        config.tokens.refresh_secret = config.tokens.access_secret.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_positive_ttl_rejected() {
        let mut config = test_config();
        config.tokens.access_ttl_secs = 0;
        assert!(config.validate().is_err());
    }
}
