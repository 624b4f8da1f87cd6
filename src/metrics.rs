//! Prometheus metrics for the gateway.
//!
//! One recorder is installed for the process; every handle clones share
//! it. When a recorder already exists (tests spin up several gateways in
//! one process) the instance records through the global macros and simply
//! renders nothing itself.

use axum::http::StatusCode;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct GatewayMetrics {
    handle: Option<Arc<PrometheusHandle>>,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .ok()
            .map(Arc::new);

        describe_counter!(
            "gateway_requests_total",
            "HTTP requests handled, by method and status"
        );
        describe_counter!("gateway_errors_total", "Requests that failed, by error type");
        describe_counter!(
            "gateway_bus_requests_total",
            "Request/reply round trips completed on the bus"
        );
        describe_histogram!(
            "gateway_bus_request_duration_seconds",
            "Latency of bus request/reply round trips"
        );
        describe_counter!(
            "gateway_bus_publishes_total",
            "Fire-and-forget publishes accepted by the bus"
        );
        describe_counter!(
            "gateway_frames_relayed_total",
            "Deliveries relayed to streaming clients"
        );
        describe_counter!(
            "gateway_encode_failures_total",
            "Deliveries that could not be encoded for the stream"
        );
        describe_gauge!("gateway_active_streams", "Streams currently open");
        describe_gauge!("gateway_bus_connected", "Whether the bus connection is up");

        Self { handle }
    }

    pub fn record_request(&self, method: &str, status: StatusCode) {
        counter!(
            "gateway_requests_total",
            "method" => method.to_string(),
            "status" => status.as_u16().to_string()
        )
        .increment(1);
    }

    pub fn record_error(&self, error_type: &'static str) {
        counter!("gateway_errors_total", "error_type" => error_type).increment(1);
    }

    pub fn record_bus_request(&self, elapsed: Duration) {
        counter!("gateway_bus_requests_total").increment(1);
        histogram!("gateway_bus_request_duration_seconds").record(elapsed.as_secs_f64());
    }

    pub fn record_bus_publish(&self) {
        counter!("gateway_bus_publishes_total").increment(1);
    }

    pub fn record_frame(&self) {
        counter!("gateway_frames_relayed_total").increment(1);
    }

    pub fn record_encode_failure(&self) {
        counter!("gateway_encode_failures_total").increment(1);
    }

    pub fn stream_opened(&self) {
        gauge!("gateway_active_streams").increment(1.0);
    }

    pub fn stream_closed(&self) {
        gauge!("gateway_active_streams").decrement(1.0);
    }

    pub fn set_bus_connected(&self, connected: bool) {
        gauge!("gateway_bus_connected").set(if connected { 1.0 } else { 0.0 });
    }

    /// Prometheus exposition text, empty when another instance owns the
    /// process recorder.
    pub fn render(&self) -> String {
        self.handle
            .as_ref()
            .map(|handle| handle.render())
            .unwrap_or_default()
    }
}

impl Default for GatewayMetrics {
    fn default() -> Self {
        Self::new()
    }
}
