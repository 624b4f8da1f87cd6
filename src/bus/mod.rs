//! Message-bus seam: the [`Bus`] trait, the wire message shape, and the
//! NATS-backed implementation used in production.

pub mod client;
pub mod message;
pub mod nats;

pub use client::{Bus, BusError, Subscription, SUBSCRIPTION_QUEUE_CAPACITY};
pub use message::{BusHeaders, BusMessage, WireMessage};
pub use nats::NatsBus;
