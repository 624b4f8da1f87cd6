//! HTTP-to-NATS protocol gateway.
//!
//! Bridges plain HTTP onto core NATS messaging so clients without a NATS
//! client library can still use the bus:
//!
//! * `GET /{subject}` subscribes and relays deliveries back as a
//!   server-sent event stream until the window elapses.
//! * `POST /{subject}` performs a request/reply round trip and returns
//!   the responder's reply as pretty-printed JSON.
//! * `PUT /{subject}` publishes fire-and-forget and acknowledges with an
//!   empty body.
//!
//! The subject is the last non-empty path segment, `Natsh-` prefixed
//! request headers cross the bridge onto the bus message, and the
//! `timeout` (and, for PUT, `reply`) query parameters tune the bus call.

pub mod bus;
pub mod config;
pub mod error;
pub mod gateway;
mod health;
pub mod metrics;

pub use bus::{Bus, BusError, BusMessage, NatsBus, Subscription};
pub use config::GatewayConfig;
pub use error::GatewayError;
pub use gateway::{router, AppState};
pub use metrics::GatewayMetrics;
