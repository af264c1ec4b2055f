//! Server configuration.
//!
//! Configuration is read from the environment (optionally via a `.env`
//! file) with sensible defaults for local development.

use anyhow::bail;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://hemolink.db?mode=rwc";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_MIN_CONNECTIONS: u32 = 1;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_REQUEST_RETENTION_DAYS: i64 = 30;

/// Top-level server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cors: CorsConfig,
    pub retention: RetentionConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Grace period for in-flight requests during shutdown.
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Allowed origins. Empty means allow any origin.
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

#[derive(Debug, Clone)]
pub struct RetentionConfig {
    /// Fulfilled requests older than this many days are eligible for
    /// cleanup. Donation history is never touched by cleanup.
    pub fulfilled_request_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_HOST.to_string(),
                port: DEFAULT_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_MAX_CONNECTIONS,
                min_connections: DEFAULT_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
                idle_timeout_secs: None,
            },
            cors: CorsConfig {
                allowed_origins: Vec::new(),
                allow_credentials: false,
            },
            retention: RetentionConfig {
                fulfilled_request_days: DEFAULT_REQUEST_RETENTION_DAYS,
            },
        }
    }
}

impl Config {
    /// Load configuration from the environment, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(host) = std::env::var("HEMOLINK_HOST") {
            config.server.host = host;
        }
        config.server.port = std::env::var("HEMOLINK_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        config.server.shutdown_timeout_secs = std::env::var("HEMOLINK_SHUTDOWN_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECS);

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database.url = url;
        }
        config.database.max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        config.database.min_connections = std::env::var("DATABASE_MIN_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MIN_CONNECTIONS);
        config.database.connect_timeout_secs = std::env::var("DATABASE_CONNECT_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS);
        config.database.idle_timeout_secs = std::env::var("DATABASE_IDLE_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok());

        if let Ok(origins) = std::env::var("CORS_ALLOWED_ORIGINS") {
            config.cors.allowed_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        config.cors.allow_credentials = std::env::var("CORS_ALLOW_CREDENTIALS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(false);

        config.retention.fulfilled_request_days = std::env::var("REQUEST_RETENTION_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_REQUEST_RETENTION_DAYS);

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot work.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.host.is_empty() {
            bail!("server host must not be empty");
        }
        if self.database.url.is_empty() {
            bail!("database url must not be empty");
        }
        if self.database.max_connections == 0 {
            bail!("database max_connections must be at least 1");
        }
        if self.database.min_connections > self.database.max_connections {
            bail!(
                "database min_connections ({}) exceeds max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }
        if self.retention.fulfilled_request_days < 1 {
            bail!("request retention must be at least 1 day");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.database.url, DEFAULT_DATABASE_URL);
        assert_eq!(
            config.retention.fulfilled_request_days,
            DEFAULT_REQUEST_RETENTION_DAYS
        );
    }

    #[test]
    fn test_validate_rejects_zero_max_connections() {
        let mut config = Config::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_min_above_max() {
        let mut config = Config::default();
        config.database.min_connections = 10;
        config.database.max_connections = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_retention() {
        let mut config = Config::default();
        config.retention.fulfilled_request_days = 0;
        assert!(config.validate().is_err());
    }
}
