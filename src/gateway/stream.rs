//! GET bridge: one bus subscription per request, relayed to the client as
//! a server-sent event stream until the window elapses, the client goes
//! away, or the subscription feed ends.

use crate::bus::Subscription;
use crate::error::GatewayError;
use crate::gateway::extract::{self, GatewayParams};
use crate::gateway::AppState;
use crate::metrics::GatewayMetrics;
use axum::http::{header, Uri};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

/// Frames buffered between the relay task and the HTTP connection.
const FRAME_QUEUE_CAPACITY: usize = 10;

/// Sent in place of a delivery whose wire encoding failed.
const ENCODE_FAILURE_TEXT: &str = "error encoding message";

/// Comment closing a stream whose window elapsed.
const WINDOW_ELAPSED_TEXT: &str = "nothing to send, connection closing";

/// One wire frame headed for the client.
#[derive(Debug, PartialEq)]
enum Frame {
    Data(String),
    Comment(&'static str),
}

impl Frame {
    fn into_event(self) -> Event {
        match self {
            Frame::Data(data) => Event::default().data(data),
            Frame::Comment(text) => Event::default().comment(text),
        }
    }
}

pub(crate) async fn subscribe_bridge(
    state: &AppState,
    uri: &Uri,
) -> Result<Response, GatewayError> {
    let subject = extract::bus_subject(uri.path())?;
    let params = GatewayParams::from_uri(uri);

    let subscription = state.bus.subscribe(&subject).await.map_err(|source| {
        warn!(subject = %subject, error = %source, "Subscribe failed");
        GatewayError::SubscribeFailed { source }
    })?;

    info!(subject = %subject, window = ?params.timeout(), "Stream opened");
    state.metrics.stream_opened();

    let deadline = Instant::now() + params.timeout();
    let (frames, receiver) = mpsc::channel(FRAME_QUEUE_CAPACITY);
    tokio::spawn(relay(
        subject,
        subscription,
        frames,
        deadline,
        state.metrics.clone(),
    ));

    let events =
        ReceiverStream::new(receiver).map(|frame: Frame| Ok::<_, Infallible>(frame.into_event()));

    Ok((
        [
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
        ],
        Sse::new(events),
    )
        .into_response())
}

/// Owns the subscription for the lifetime of one stream. Whichever way the
/// stream ends, returning from here drops the subscription and releases it
/// on the bus.
async fn relay(
    subject: String,
    mut subscription: Subscription,
    frames: mpsc::Sender<Frame>,
    deadline: Instant,
    metrics: GatewayMetrics,
) {
    let window = sleep_until(deadline);
    tokio::pin!(window);

    loop {
        tokio::select! {
            delivered = subscription.recv() => {
                let Some(message) = delivered else {
                    debug!(subject = %subject, "Subscription feed closed");
                    break;
                };
                let frame = match message.wire_json() {
                    Ok(json) => {
                        metrics.record_frame();
                        Frame::Data(json)
                    }
                    Err(error) => {
                        warn!(subject = %subject, error = %error, "Failed to encode delivery");
                        metrics.record_encode_failure();
                        Frame::Data(ENCODE_FAILURE_TEXT.to_string())
                    }
                };
                if frames.send(frame).await.is_err() {
                    debug!(subject = %subject, "Client went away");
                    break;
                }
            }
            _ = frames.closed() => {
                debug!(subject = %subject, "Client went away");
                break;
            }
            _ = &mut window => {
                // Best effort; the client may already be gone.
                let _ = frames.send(Frame::Comment(WINDOW_ELAPSED_TEXT)).await;
                debug!(subject = %subject, "Stream window elapsed");
                break;
            }
        }
    }

    metrics.stream_closed();
}
