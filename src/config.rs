use std::env;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} must be a number, got {value:?}")]
    NotANumber { name: &'static str, value: String },
    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

/// Ten years.
const MAX_JWT_TTL_HOURS: i64 = 24 * 365 * 10;
const MAX_RESET_TOKEN_TTL_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. `None` runs the service on the in-memory store.
    pub database_url: Option<String>,
    pub server_port: u16,
    pub server_host: String,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub upload_dir: String,
    /// Prefix of every URL handed out by the file store.
    pub public_url: String,
    pub upload_timeout: Duration,
    pub reset_token_ttl_minutes: i64,
    /// Front-end origin used to build password reset links.
    pub client_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_port = parse_var("SERVER_PORT", 8080u16)?;
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let public_url = env::var("PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", server_host, server_port));

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            server_port,
            server_host,
            jwt_secret: env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?,
            jwt_ttl_hours: parse_bounded("JWT_TTL_HOURS", 24 * 30, MAX_JWT_TTL_HOURS)?,
            bcrypt_cost: parse_var("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string()),
            public_url,
            upload_timeout: Duration::from_secs(parse_var("UPLOAD_TIMEOUT_SECS", 10u64)?),
            reset_token_ttl_minutes: parse_bounded(
                "RESET_TOKEN_TTL_MINUTES",
                10,
                MAX_RESET_TOKEN_TTL_MINUTES,
            )?,
            client_url: env::var("CLIENT_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::NotANumber { name, value }),
        Err(_) => Ok(default),
    }
}

/// A positive duration count no larger than `max`.
fn parse_bounded(name: &'static str, default: i64, max: i64) -> Result<i64, ConfigError> {
    let value = parse_var(name, default)?;
    if (1..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::OutOfRange {
            name,
            value,
            min: 1,
            max,
        })
    }
}
