//! Bus message type and its JSON wire form.

use bytes::Bytes;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Bridged bus headers: deterministic iteration order, multi-valued.
pub type BusHeaders = BTreeMap<String, Vec<String>>;

/// One message crossing the bridge, in either direction.
///
/// Built fresh per HTTP request on the way in; replies and subscription
/// deliveries are converted into this shape on the way out. Ownership is
/// transient: constructed, handed over, dropped.
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub subject: String,
    pub reply: Option<String>,
    pub headers: BusHeaders,
    pub payload: Bytes,
}

impl BusMessage {
    pub fn new(
        subject: impl Into<String>,
        reply: Option<String>,
        headers: BusHeaders,
        payload: Bytes,
    ) -> Self {
        Self {
            subject: subject.into(),
            reply,
            headers,
            payload,
        }
    }

    /// Borrow the message as its serializable wire form.
    pub fn wire(&self) -> WireMessage<'_> {
        WireMessage {
            subject: &self.subject,
            reply: self.reply.as_deref(),
            headers: &self.headers,
            payload: &self.payload,
        }
    }

    /// Compact JSON used for stream frames.
    pub fn wire_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.wire())
    }
}

/// JSON view of a [`BusMessage`]: `{subject, reply?, headers?, payload}`.
///
/// The payload is rendered as UTF-8 text; a message with a non-UTF-8
/// payload has no wire form and serialization fails. `reply` and
/// `headers` are omitted when empty.
#[derive(Debug, Serialize)]
pub struct WireMessage<'a> {
    subject: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<&'a str>,
    #[serde(skip_serializing_if = "headers_empty")]
    headers: &'a BusHeaders,
    #[serde(serialize_with = "utf8_payload")]
    payload: &'a Bytes,
}

fn headers_empty(headers: &&BusHeaders) -> bool {
    headers.is_empty()
}

fn utf8_payload<S: Serializer>(payload: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    match std::str::from_utf8(payload) {
        Ok(text) => serializer.serialize_str(text),
        Err(_) => Err(serde::ser::Error::custom("payload is not valid UTF-8")),
    }
}
