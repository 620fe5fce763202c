//! Configuration loading and management
//!
//! Settings resolve in three layers: built-in defaults, then an optional
//! YAML file named by `DELIVERY_CONFIG`, then individual environment
//! variables.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Environment variable naming the YAML configuration file
pub const CONFIG_PATH_VAR: &str = "DELIVERY_CONFIG";

/// Complete server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Address the HTTP server listens on
    pub bind_addr: String,

    /// HS256 signing secret for identity tokens
    pub jwt_secret: String,

    /// Validity of an issued token, in hours
    pub token_ttl_hours: i64,

    /// bcrypt work factor
    pub bcrypt_cost: u32,

    /// PostgreSQL connection string; in-memory storage when absent
    pub database_url: Option<String>,

    /// Directory item images are written to
    pub upload_dir: String,

    /// Default log filter when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            jwt_secret: "change-me".to_string(),
            token_ttl_hours: 8,
            bcrypt_cost: 10,
            database_url: None,
            upload_dir: "uploads".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file
    ///
    /// Keys missing from the file keep their defaults.
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path))?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Defaults, then the `DELIVERY_CONFIG` file if set, then the process environment
    pub fn from_env() -> Result<Self> {
        let base = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_yaml_file(&path)?,
            Err(_) => Self::default(),
        };
        let config = base.with_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment-style overrides read through `lookup`
    ///
    /// `PORT` only replaces the port of `bind_addr`; `BIND_ADDR` wins over it.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a port number, got '{}'", port))?;
            let host = self
                .bind_addr
                .rsplit_once(':')
                .map(|(host, _)| host.to_string())
                .unwrap_or_else(|| "0.0.0.0".to_string());
            self.bind_addr = format!("{}:{}", host, port);
        }
        if let Some(addr) = lookup("BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.jwt_secret = secret;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = (!url.trim().is_empty()).then_some(url);
        }
        if let Some(dir) = lookup("UPLOAD_DIR") {
            self.upload_dir = dir;
        }
        if let Some(cost) = lookup("BCRYPT_COST") {
            self.bcrypt_cost = cost
                .trim()
                .parse()
                .with_context(|| format!("BCRYPT_COST must be an integer, got '{}'", cost))?;
        }
        if let Some(hours) = lookup("TOKEN_TTL_HOURS") {
            self.token_ttl_hours = hours
                .trim()
                .parse()
                .with_context(|| format!("TOKEN_TTL_HOURS must be an integer, got '{}'", hours))?;
        }
        if let Some(level) = lookup("RUST_LOG") {
            self.log_level = level;
        }
        Ok(self)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret.trim().is_empty() {
            return Err(anyhow!("jwt_secret must not be empty"));
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(anyhow!(
                "bcrypt_cost must be between 4 and 31, got {}",
                self.bcrypt_cost
            ));
        }
        if self.token_ttl_hours <= 0 {
            return Err(anyhow!("token_ttl_hours must be positive"));
        }
        self.socket_addr()?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_addr
            .parse()
            .with_context(|| format!("Invalid bind address '{}'", self.bind_addr))
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.token_ttl_hours)
    }
}
