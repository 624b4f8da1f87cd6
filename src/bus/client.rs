//! The bus seam: client trait, bus-layer errors and the subscription handle.

use crate::bus::message::BusMessage;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Capacity of the per-subscription delivery queue.
pub const SUBSCRIPTION_QUEUE_CAPACITY: usize = 10;

/// Bus-layer failures, carried back to the bridges with subject context.
#[derive(Error, Debug)]
pub enum BusError {
    /// Initial connection to the bus failed
    #[error("failed to connect to '{url}'")]
    Connect {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Request gave up waiting for a reply
    #[error("request on '{subject}' timed out")]
    Timeout { subject: String },

    /// Nothing is listening on the subject
    #[error("no responders on '{subject}'")]
    NoResponders { subject: String },

    /// Request failed before or while waiting for the reply
    #[error("request on '{subject}' failed: {source}")]
    Request {
        subject: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Publish was rejected by the bus client
    #[error("publish to '{subject}' failed: {source}")]
    Publish {
        subject: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Subscription could not be established
    #[error("subscribe to '{subject}' failed: {source}")]
    Subscribe {
        subject: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl BusError {
    /// True when the failure is a deadline elapsing.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// The three bus primitives the gateway bridges, behind one object-safe
/// trait so tests can substitute a scripted bus for NATS.
///
/// Implementations must be safe for concurrent use from many handler
/// tasks sharing one `Arc<dyn Bus>`.
#[async_trait]
pub trait Bus: Send + Sync + 'static {
    /// Fire-and-forget publish.
    async fn publish(&self, message: BusMessage) -> Result<(), BusError>;

    /// Request/reply with a per-call deadline.
    async fn request(
        &self,
        message: BusMessage,
        timeout: Duration,
    ) -> Result<BusMessage, BusError>;

    /// Open a subscription delivering into a bounded queue.
    async fn subscribe(&self, subject: &str) -> Result<Subscription, BusError>;

    /// Current connectivity, for readiness reporting.
    fn connected(&self) -> bool;
}

/// One active bus subscription bound to one HTTP connection.
///
/// Messages arrive through a bounded queue fed by the bus client's
/// delivery task. Dropping the handle cancels that task, which tears down
/// the bus-side subscriber — release happens exactly once, on whichever
/// path drops the handle first.
#[derive(Debug)]
pub struct Subscription {
    messages: mpsc::Receiver<BusMessage>,
    forwarder: JoinHandle<()>,
}

impl Subscription {
    /// Pair a delivery queue with the task feeding it.
    pub fn new(messages: mpsc::Receiver<BusMessage>, forwarder: JoinHandle<()>) -> Self {
        Self {
            messages,
            forwarder,
        }
    }

    /// Next message in bus-delivery order; `None` once the bus side closed.
    pub async fn recv(&mut self) -> Option<BusMessage> {
        self.messages.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}
