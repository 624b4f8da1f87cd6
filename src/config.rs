//! Gateway configuration module
//!
//! Handles loading configuration from environment variables. Only the
//! composition root reads this; the bridging layer receives a ready bus
//! handle and never touches the environment.

use crate::error::GatewayError;
use std::env;

/// Gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// NATS server URL(s) - comma-separated for multiple servers
    pub nats_url: String,

    /// HTTP listen port, shared by the bridges and the operational endpoints
    pub http_port: u16,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl GatewayConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, GatewayError> {
        dotenvy::dotenv().ok();

        let nats_url =
            env::var("NATS_URL").unwrap_or_else(|_| "nats://127.0.0.1:4222".to_string());

        let http_port = env::var("HTTP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|e| {
                GatewayError::Config(format!("HTTP_PORT must be a valid port number: {e}"))
            })?;

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            nats_url,
            http_port,
            log_level,
        })
    }
}
