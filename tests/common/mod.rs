//! Shared test harness: a scripted bus standing in for NATS, and a
//! gateway served on an ephemeral port.

#![allow(dead_code)]

use async_trait::async_trait;
use nats_http_gateway::bus::{
    Bus, BusError, BusMessage, Subscription, SUBSCRIPTION_QUEUE_CAPACITY,
};
use nats_http_gateway::{router, AppState, GatewayMetrics};
use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// What the next `request` call should do.
pub enum RequestScript {
    Reply(BusMessage),
    Timeout,
    NoResponders,
    Fail(&'static str),
}

/// What the next `publish` call should do.
pub enum PublishScript {
    Deliver,
    Timeout,
    Fail(&'static str),
}

enum SubscribeScript {
    Feed(mpsc::Receiver<BusMessage>),
    Fail(&'static str),
}

/// In-process bus whose behavior is scripted per call, recording every
/// message the gateway hands it.
#[derive(Default)]
pub struct ScriptedBus {
    requests: Mutex<VecDeque<RequestScript>>,
    publishes: Mutex<VecDeque<PublishScript>>,
    subscribes: Mutex<VecDeque<SubscribeScript>>,
    requested: Mutex<Vec<(BusMessage, Duration)>>,
    published: Mutex<Vec<BusMessage>>,
    subscribed: Mutex<Vec<String>>,
    bus_calls: AtomicUsize,
    released: Arc<AtomicUsize>,
    offline: AtomicBool,
}

struct ReleaseProbe(Arc<AtomicUsize>);

impl Drop for ReleaseProbe {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

impl ScriptedBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script_request(&self, script: RequestScript) {
        self.requests.lock().unwrap().push_back(script);
    }

    pub fn script_publish(&self, script: PublishScript) {
        self.publishes.lock().unwrap().push_back(script);
    }

    /// Scripts the next subscribe to succeed; the returned sender feeds
    /// deliveries into it.
    pub fn script_subscribe(&self) -> mpsc::Sender<BusMessage> {
        let (feed, receiver) = mpsc::channel(SUBSCRIPTION_QUEUE_CAPACITY);
        self.subscribes
            .lock()
            .unwrap()
            .push_back(SubscribeScript::Feed(receiver));
        feed
    }

    pub fn script_subscribe_failure(&self, reason: &'static str) {
        self.subscribes
            .lock()
            .unwrap()
            .push_back(SubscribeScript::Fail(reason));
    }

    /// Makes `connected()` report the bus connection as down.
    pub fn script_disconnect(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    /// Total calls that reached the bus, across all three primitives.
    pub fn bus_calls(&self) -> usize {
        self.bus_calls.load(Ordering::SeqCst)
    }

    /// Subscriptions released so far.
    pub fn releases(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<(BusMessage, Duration)> {
        self.requested.lock().unwrap().clone()
    }

    pub fn published(&self) -> Vec<BusMessage> {
        self.published.lock().unwrap().clone()
    }

    pub fn subscribed(&self) -> Vec<String> {
        self.subscribed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Bus for ScriptedBus {
    async fn publish(&self, message: BusMessage) -> Result<(), BusError> {
        self.bus_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.publishes.lock().unwrap().pop_front();
        match script {
            Some(PublishScript::Deliver) | None => {
                self.published.lock().unwrap().push(message);
                Ok(())
            }
            Some(PublishScript::Timeout) => Err(BusError::Timeout {
                subject: message.subject,
            }),
            Some(PublishScript::Fail(reason)) => Err(BusError::Publish {
                subject: message.subject,
                source: scripted_failure(reason),
            }),
        }
    }

    async fn request(
        &self,
        message: BusMessage,
        timeout: Duration,
    ) -> Result<BusMessage, BusError> {
        self.bus_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.requests.lock().unwrap().pop_front();
        let subject = message.subject.clone();
        self.requested.lock().unwrap().push((message, timeout));
        match script {
            Some(RequestScript::Reply(reply)) => Ok(reply),
            Some(RequestScript::Timeout) | None => Err(BusError::Timeout { subject }),
            Some(RequestScript::NoResponders) => Err(BusError::NoResponders { subject }),
            Some(RequestScript::Fail(reason)) => Err(BusError::Request {
                subject,
                source: scripted_failure(reason),
            }),
        }
    }

    async fn subscribe(&self, subject: &str) -> Result<Subscription, BusError> {
        self.bus_calls.fetch_add(1, Ordering::SeqCst);
        self.subscribed.lock().unwrap().push(subject.to_string());
        let script = self.subscribes.lock().unwrap().pop_front();
        match script {
            Some(SubscribeScript::Feed(mut feed)) => {
                let (queue, messages) = mpsc::channel(SUBSCRIPTION_QUEUE_CAPACITY);
                // Owned by the future from construction, so even a handle
                // dropped before the forwarder's first poll counts as a
                // release.
                let probe = ReleaseProbe(self.released.clone());
                let forwarder = tokio::spawn(async move {
                    let _probe = probe;
                    while let Some(message) = feed.recv().await {
                        if queue.send(message).await.is_err() {
                            break;
                        }
                    }
                    // Keep the probe alive until the handle is dropped, so
                    // `releases()` counts releases rather than feed closes.
                    drop(queue);
                    std::future::pending::<()>().await;
                });
                Ok(Subscription::new(messages, forwarder))
            }
            Some(SubscribeScript::Fail(reason)) => Err(BusError::Subscribe {
                subject: subject.to_string(),
                source: scripted_failure(reason),
            }),
            None => panic!("subscribe called without a scripted feed"),
        }
    }

    fn connected(&self) -> bool {
        !self.offline.load(Ordering::SeqCst)
    }
}

fn scripted_failure(reason: &'static str) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(io::Error::other(reason))
}

/// Serves the gateway over the scripted bus on an ephemeral local port.
pub async fn serve(bus: Arc<ScriptedBus>) -> SocketAddr {
    let state = AppState {
        bus,
        metrics: GatewayMetrics::new(),
    };
    let app = router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub fn url(addr: SocketAddr, path_and_query: &str) -> String {
    format!("http://{addr}{path_and_query}")
}

/// Releases happen on a background task; poll instead of asserting
/// straight after the response.
pub async fn wait_for_release(bus: &ScriptedBus, expected: usize) {
    for _ in 0..200 {
        if bus.releases() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("subscription release count never reached {expected}");
}
