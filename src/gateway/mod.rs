//! HTTP surface of the gateway.
//!
//! Every path maps to a bus subject, and the verb picks the bridge:
//! GET subscribes and streams deliveries back as server-sent events,
//! POST performs a request/reply round trip, PUT publishes and returns
//! as soon as the message is on its way.

mod extract;
pub(crate) mod respond;
mod stream;

use crate::bus::{Bus, BusMessage};
use crate::error::GatewayError;
use crate::health;
use crate::metrics::GatewayMetrics;
use axum::extract::{Request, State};
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use self::extract::GatewayParams;

/// Request bodies past this size fail the read, as an oversized body
/// would otherwise be buffered whole before hitting the bus.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub bus: Arc<dyn Bus>,
    pub metrics: GatewayMetrics,
}

/// Builds the gateway router. `/health`, `/ready` and `/metrics` are
/// served locally; every other path falls through to the bus bridges.
/// Wrong-method hits on the local routes get the same error envelope as
/// the bridges, not axum's bare 405.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/metrics", get(health::metrics))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(handle)
        .with_state(state)
}

async fn method_not_allowed(State(state): State<AppState>, method: Method) -> Response {
    let error = GatewayError::MethodNotAllowed;
    state.metrics.record_error(error.error_type_label());
    let response = error.into_response();
    state.metrics.record_request(method.as_str(), response.status());
    response
}

async fn handle(State(state): State<AppState>, request: Request) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let result = if method == Method::GET {
        stream::subscribe_bridge(&state, request.uri()).await
    } else if method == Method::POST {
        request_bridge(&state, request).await
    } else if method == Method::PUT {
        publish_bridge(&state, request).await
    } else {
        Err(GatewayError::MethodNotAllowed)
    };

    let response = match result {
        Ok(response) => response,
        Err(error) => {
            state.metrics.record_error(error.error_type_label());
            error.into_response()
        }
    };

    debug!(method = %method, path = %path, status = %response.status(), "Handled request");
    state.metrics.record_request(method.as_str(), response.status());
    response
}

/// POST bridge: round trip on the bus, reply rendered back as JSON.
async fn request_bridge(state: &AppState, request: Request) -> Result<Response, GatewayError> {
    let subject = extract::bus_subject(request.uri().path())?;
    let timeout = GatewayParams::from_uri(request.uri()).timeout();
    let headers = extract::bus_headers(request.headers());

    let payload = axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES)
        .await
        .map_err(GatewayError::BodyRead)?;
    let message = BusMessage::new(subject.clone(), None, headers, payload);

    let started = Instant::now();
    let reply = state.bus.request(message, timeout).await.map_err(|source| {
        warn!(subject = %subject, error = %source, "Bus request failed");
        if source.is_timeout() {
            GatewayError::UpstreamTimeout
        } else {
            GatewayError::Upstream { source }
        }
    })?;
    state.metrics.record_bus_request(started.elapsed());
    debug!(subject = %subject, reply_subject = %reply.subject, "Bus reply received");

    Ok(respond::pretty_json(&reply.wire()))
}

/// PUT bridge: fire-and-forget publish, optionally stamped with a
/// reply-to subject for downstream responders.
async fn publish_bridge(state: &AppState, request: Request) -> Result<Response, GatewayError> {
    let subject = extract::bus_subject(request.uri().path())?;
    let reply = GatewayParams::from_uri(request.uri()).reply_to();
    let headers = extract::bus_headers(request.headers());

    let payload = axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES)
        .await
        .map_err(GatewayError::BodyRead)?;
    let message = BusMessage::new(subject.clone(), reply, headers, payload);

    state.bus.publish(message).await.map_err(|source| {
        warn!(subject = %subject, error = %source, "Publish failed");
        if source.is_timeout() {
            GatewayError::UpstreamTimeout
        } else {
            GatewayError::PublishFailed { source }
        }
    })?;
    state.metrics.record_bus_publish();
    debug!(subject = %subject, "Published");

    Ok(respond::published())
}
