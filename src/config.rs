//! Configuration for Habitracked
//!
//! CLI arguments with environment variable fallbacks, parsed with clap.
//! `main` loads a `.env` file first, so every flag can live there too.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

use crate::auth::JwtValidator;
use crate::types::HabitError;

/// Habitracked - habit tracking backend
#[derive(Parser, Debug, Clone)]
#[command(name = "habitracked")]
#[command(about = "REST backend for accounts, habits, duration logs and weekly recurrence")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:5050")]
    pub listen: SocketAddr,

    /// Enable development mode (in-memory store fallback, fixed JWT secret)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "habitracked")]
    pub mongodb_db: String,

    /// JWT secret for token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "86400")]
    pub jwt_expiry_seconds: u64,

    /// Origin allowed to make credentialed cross-origin requests
    #[arg(long, env = "CORS_ORIGIN", default_value = "http://localhost:3000")]
    pub cors_origin: String,

    /// Largest accepted JSON request body
    #[arg(long, env = "MAX_BODY_BYTES", default_value = "1048576")]
    pub max_body_bytes: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format (text, json)
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: String,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            match &self.jwt_secret {
                None => return Err("JWT_SECRET is required in production mode".to_string()),
                Some(secret) if secret.len() < 32 => {
                    return Err("JWT_SECRET must be at least 32 characters".to_string())
                }
                Some(_) => {}
            }
        }

        if self.jwt_expiry_seconds == 0 {
            return Err("JWT_EXPIRY_SECONDS must be greater than zero".to_string());
        }

        if self.max_body_bytes == 0 {
            return Err("MAX_BODY_BYTES must be greater than zero".to_string());
        }

        if !matches!(self.log_format.as_str(), "text" | "json") {
            return Err(format!("Unknown LOG_FORMAT '{}' (expected text or json)", self.log_format));
        }

        Ok(())
    }

    /// Build the token signer for the configured mode
    pub fn jwt_validator(&self) -> Result<JwtValidator, HabitError> {
        match (&self.jwt_secret, self.dev_mode) {
            (Some(secret), _) => JwtValidator::new(secret.clone(), self.jwt_expiry_seconds),
            (None, true) => Ok(JwtValidator::new_dev(self.jwt_expiry_seconds)),
            (None, false) => Err(HabitError::Config(
                "JWT_SECRET is required in production mode".into(),
            )),
        }
    }

    /// Operating mode label for logs and health
    pub fn mode(&self) -> &'static str {
        if self.dev_mode {
            "development"
        } else {
            "production"
        }
    }
}
