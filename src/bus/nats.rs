//! NATS-backed implementation of the bus seam.

use crate::bus::client::{Bus, BusError, Subscription, SUBSCRIPTION_QUEUE_CAPACITY};
use crate::bus::message::{BusHeaders, BusMessage};
use async_nats::client::RequestErrorKind;
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Shared NATS connection behind the [`Bus`] trait.
///
/// `async_nats::Client` is itself cheap to clone and safe for concurrent
/// use, so one `NatsBus` serves every handler task in the process.
#[derive(Debug, Clone)]
pub struct NatsBus {
    client: async_nats::Client,
}

impl NatsBus {
    /// Connect to the NATS server(s) at `url`.
    pub async fn connect(url: &str) -> Result<Self, BusError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| BusError::Connect {
                url: url.to_string(),
                source: Box::new(e),
            })?;
        info!(url = %url, "Connected to NATS");
        Ok(Self { client })
    }

    /// Flush outstanding publishes before shutdown.
    pub async fn close(&self) {
        if let Err(error) = self.client.flush().await {
            warn!(error = %error, "Failed to flush NATS connection");
        }
        // async-nats handles the rest of the cleanup on drop
    }
}

#[async_trait]
impl Bus for NatsBus {
    async fn publish(&self, message: BusMessage) -> Result<(), BusError> {
        let BusMessage {
            subject,
            reply,
            headers,
            payload,
        } = message;

        let result = match (reply, headers.is_empty()) {
            (Some(reply), false) => {
                self.client
                    .publish_with_reply_and_headers(
                        subject.clone(),
                        reply,
                        to_nats_headers(&headers),
                        payload,
                    )
                    .await
            }
            (Some(reply), true) => {
                self.client
                    .publish_with_reply(subject.clone(), reply, payload)
                    .await
            }
            (None, false) => {
                self.client
                    .publish_with_headers(subject.clone(), to_nats_headers(&headers), payload)
                    .await
            }
            (None, true) => self.client.publish(subject.clone(), payload).await,
        };

        result.map_err(|e| BusError::Publish {
            subject,
            source: Box::new(e),
        })
    }

    async fn request(
        &self,
        message: BusMessage,
        timeout: Duration,
    ) -> Result<BusMessage, BusError> {
        // A request replies to an inbox the client owns; any caller-supplied
        // reply-to on the message plays no part here.
        let BusMessage {
            subject,
            headers,
            payload,
            ..
        } = message;

        let mut request = async_nats::Request::new()
            .payload(payload)
            .timeout(Some(timeout));
        if !headers.is_empty() {
            request = request.headers(to_nats_headers(&headers));
        }

        match self.client.send_request(subject.clone(), request).await {
            Ok(reply) => Ok(from_nats(reply)),
            Err(error) => Err(match error.kind() {
                RequestErrorKind::TimedOut => BusError::Timeout { subject },
                RequestErrorKind::NoResponders => BusError::NoResponders { subject },
                RequestErrorKind::Other => BusError::Request {
                    subject,
                    source: Box::new(error),
                },
            }),
        }
    }

    async fn subscribe(&self, subject: &str) -> Result<Subscription, BusError> {
        let mut subscriber =
            self.client
                .subscribe(subject.to_string())
                .await
                .map_err(|e| BusError::Subscribe {
                    subject: subject.to_string(),
                    source: Box::new(e),
                })?;

        let (queue, messages) = mpsc::channel(SUBSCRIPTION_QUEUE_CAPACITY);
        let forwarder = tokio::spawn(async move {
            while let Some(message) = subscriber.next().await {
                if queue.send(from_nats(message)).await.is_err() {
                    break;
                }
            }
            // Dropping the subscriber sends the unsubscribe
        });

        debug!(subject = %subject, "NATS subscription opened");
        Ok(Subscription::new(messages, forwarder))
    }

    fn connected(&self) -> bool {
        self.client.connection_state() == async_nats::connection::State::Connected
    }
}

fn to_nats_headers(headers: &BusHeaders) -> async_nats::HeaderMap {
    let mut map = async_nats::HeaderMap::new();
    for (name, values) in headers {
        for value in values {
            map.append(name.as_str(), value.as_str());
        }
    }
    map
}

fn from_nats(message: async_nats::Message) -> BusMessage {
    let mut headers = BusHeaders::new();
    if let Some(map) = &message.headers {
        for (name, values) in map.iter() {
            headers.insert(
                name.to_string(),
                values.iter().map(|value| value.to_string()).collect(),
            );
        }
    }
    BusMessage {
        subject: message.subject.to_string(),
        reply: message.reply.map(|subject| subject.to_string()),
        headers,
        payload: message.payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_conversion_preserves_names_and_values() {
        let mut headers = BusHeaders::new();
        headers.insert(
            "trace-Id".to_string(),
            vec!["abc".to_string(), "def".to_string()],
        );
        headers.insert("source".to_string(), vec!["sensor-7".to_string()]);

        let map = to_nats_headers(&headers);

        let mut seen = BusHeaders::new();
        for (name, values) in map.iter() {
            seen.insert(
                name.to_string(),
                values.iter().map(|value| value.to_string()).collect(),
            );
        }
        assert_eq!(seen, headers);
    }
}
