//! Domain error types for the gateway
//!
//! main.rs is the ONLY module allowed to use anyhow::Result (process boundary).
//! All application code returns Result<T, GatewayError> or Result<T, BusError>.

use crate::bus::BusError;
use crate::gateway::respond;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Gateway domain errors
///
/// One variant per failure mode an HTTP caller can observe, plus `Config`
/// for startup failures. `Display` is exactly the message placed in the
/// JSON error body, so the mapping from variant to response is total:
/// `status()` picks the code, `to_string()` the body.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// URL path has no non-empty final segment to use as a subject
    #[error("Subject not found")]
    MissingSubject,

    /// Request body could not be read from the client
    #[error("Error reading request body")]
    BodyRead(#[source] axum::Error),

    /// Bus request or publish exceeded its deadline
    #[error("Request timed out")]
    UpstreamTimeout,

    /// Bus request failed; the bus error text is surfaced to the caller
    #[error("{source}")]
    Upstream {
        #[source]
        source: BusError,
    },

    /// Bus publish failed; detail is logged but never surfaced
    #[error("Unable to publish")]
    PublishFailed {
        #[source]
        source: BusError,
    },

    /// Subscription could not be established
    #[error("Unable to subscribe")]
    SubscribeFailed {
        #[source]
        source: BusError,
    },

    /// HTTP method with no bus mapping
    #[error("Invalid method")]
    MethodNotAllowed,

    /// Configuration error (environment variable missing or invalid)
    #[error("configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingSubject
            | Self::BodyRead(_)
            | Self::Upstream { .. }
            | Self::PublishFailed { .. }
            | Self::SubscribeFailed { .. } => StatusCode::BAD_REQUEST,
            Self::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a static label string suitable for Prometheus metrics.
    ///
    /// Used as the `error_type` label on the `gateway_errors_total` counter,
    /// enabling per-error-type monitoring and alerting.
    pub fn error_type_label(&self) -> &'static str {
        match self {
            Self::MissingSubject => "missing_subject",
            Self::BodyRead(_) => "body_read",
            Self::UpstreamTimeout => "upstream_timeout",
            Self::Upstream { .. } => "upstream",
            Self::PublishFailed { .. } => "publish",
            Self::SubscribeFailed { .. } => "subscribe",
            Self::MethodNotAllowed => "invalid_method",
            Self::Config(_) => "config",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        respond::error(self.status(), self.to_string())
    }
}
