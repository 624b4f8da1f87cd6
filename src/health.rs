//! Liveness, readiness and metrics endpoints, served locally so probes
//! never touch the bus subjects.

use crate::gateway::AppState;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct ReadyResponse {
    ready: bool,
    bus_connected: bool,
}

/// Liveness: the process is up and serving.
pub(crate) async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness: only useful when the bus connection is up, since every
/// bridge depends on it.
pub(crate) async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let bus_connected = state.bus.connected();

    let status = if bus_connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(ReadyResponse {
            ready: bus_connected,
            bus_connected,
        }),
    )
}

pub(crate) async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    // Refresh point-in-time gauges on scrape
    state.metrics.set_bus_connected(state.bus.connected());

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_body_reports_version() {
        let body = serde_json::to_value(HealthResponse {
            status: "healthy",
            version: "1.2.3",
        })
        .unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["version"], "1.2.3");
    }

    #[test]
    fn ready_body_mirrors_bus_state() {
        let body = serde_json::to_value(ReadyResponse {
            ready: false,
            bus_connected: false,
        })
        .unwrap();
        assert_eq!(body["ready"], false);
        assert_eq!(body["bus_connected"], false);
    }
}
