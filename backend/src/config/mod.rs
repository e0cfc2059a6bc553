//! Application configuration management

use std::env;
use std::net::SocketAddr;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to
    pub listen_addr: SocketAddr,

    /// SQLite database URL, created if missing
    pub database_url: String,

    /// Connection pool size
    pub database_max_connections: u32,

    /// HS256 secret for issued and verified tokens
    pub jwt_secret: String,

    /// Lifetime of issued tokens in seconds
    pub token_lifetime_secs: i64,

    /// Administrator seeded at startup when both are set
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = lookup("DATABASE_PATH")
            .map(|path| format!("sqlite://{}", path))
            .or_else(|| lookup("DATABASE_URL"))
            .unwrap_or_else(|| "sqlite://./data/collector.db".to_string());

        let jwt_secret = lookup("JWT_SECRET")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .context("JWT_SECRET is required")?;

        Ok(Self {
            listen_addr: lookup("LISTEN_ADDR")
                .unwrap_or_else(|| "127.0.0.1:8080".to_string())
                .parse()
                .context("Invalid LISTEN_ADDR")?,

            database_url,

            database_max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),

            jwt_secret,

            token_lifetime_secs: lookup("TOKEN_LIFETIME_SECS")
                .map(|s| s.parse::<i64>())
                .transpose()
                .context("Invalid TOKEN_LIFETIME_SECS")?
                .unwrap_or(600),

            admin_username: lookup("ADMIN_USERNAME").filter(|s| !s.is_empty()),
            admin_password: lookup("ADMIN_PASSWORD").filter(|s| !s.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[("JWT_SECRET", " s3cret\n")]).unwrap();
        assert_eq!(config.listen_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.database_url, "sqlite://./data/collector.db");
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.token_lifetime_secs, 600);
        assert!(config.admin_username.is_none());
    }

    #[test]
    fn database_path_wins_over_url() {
        let config = load(&[
            ("JWT_SECRET", "x"),
            ("DATABASE_PATH", "/tmp/c.db"),
            ("DATABASE_URL", "sqlite://other.db"),
        ])
        .unwrap();
        assert_eq!(config.database_url, "sqlite:///tmp/c.db");
    }

    #[test]
    fn secret_is_required() {
        assert!(load(&[]).is_err());
        assert!(load(&[("JWT_SECRET", "  ")]).is_err());
    }

    #[test]
    fn invalid_values_are_reported() {
        assert!(load(&[("JWT_SECRET", "x"), ("LISTEN_ADDR", "nope")]).is_err());
        assert!(load(&[("JWT_SECRET", "x"), ("TOKEN_LIFETIME_SECS", "ten")]).is_err());
    }
}
