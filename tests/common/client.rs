//! Recording client.
//!
//! Captures every notification the kernel pushes so tests can assert on
//! exactly what a client saw, and in which order.

use async_trait::async_trait;
use buzzd::client::{Client, ClientHandle};
use buzzd::error::ClientError;
use buzzd::kernel::SubscriptionChange;
use buzzd::state::Message;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// A notification as seen by a client.
#[derive(Debug, Clone)]
pub enum Event {
    Message(Arc<Message>),
    Subscription(SubscriptionChange),
    /// The kernel evicted this client, with the reason it gave.
    Disconnect(String),
}

impl Event {
    #[allow(dead_code)]
    pub fn message(&self) -> Option<&Message> {
        match self {
            Self::Message(m) => Some(m),
            Self::Subscription(_) | Self::Disconnect(_) => None,
        }
    }
}

struct RecordingClient {
    tx: mpsc::UnboundedSender<Event>,
    fail: Arc<AtomicBool>,
    delay: Duration,
}

#[async_trait]
impl Client for RecordingClient {
    async fn on_message(&self, message: Arc<Message>) -> Result<(), ClientError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ClientError::Transport("recorder told to fail".into()));
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.tx
            .send(Event::Message(message))
            .map_err(|_| ClientError::Disconnected)
    }

    async fn on_subscription_change(&self, change: &SubscriptionChange) -> Result<(), ClientError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ClientError::Transport("recorder told to fail".into()));
        }
        self.tx
            .send(Event::Subscription(change.clone()))
            .map_err(|_| ClientError::Disconnected)
    }

    async fn on_disconnect(&self, reason: &str) {
        let _ = self.tx.send(Event::Disconnect(reason.to_string()));
    }
}

/// The receiving side of a recording client.
pub struct Recorder {
    pub handle: ClientHandle,
    rx: mpsc::UnboundedReceiver<Event>,
    fail: Arc<AtomicBool>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::slow(Duration::ZERO)
    }

    /// A recorder that takes `delay` to accept each post.
    pub fn slow(delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let fail = Arc::new(AtomicBool::new(false));
        let client = RecordingClient {
            tx,
            fail: Arc::clone(&fail),
            delay,
        };
        Self {
            handle: ClientHandle::new(Arc::new(client)),
            rx,
            fail,
        }
    }

    /// Make every later callback return an error.
    #[allow(dead_code)]
    pub fn fail_deliveries(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Wait up to two seconds for the next notification.
    pub async fn next(&mut self) -> Option<Event> {
        timeout(Duration::from_secs(2), self.rx.recv()).await.ok().flatten()
    }

    /// Wait for the next notification, which must be a post.
    #[allow(dead_code)]
    pub async fn next_message(&mut self) -> Arc<Message> {
        match self.next().await {
            Some(Event::Message(m)) => m,
            other => panic!("expected a message, got {other:?}"),
        }
    }

    /// Assert nothing arrives within `ms` milliseconds.
    #[allow(dead_code)]
    pub async fn assert_quiet(&mut self, ms: u64) {
        if let Ok(Some(event)) = timeout(Duration::from_millis(ms), self.rx.recv()).await {
            panic!("unexpected notification: {event:?}");
        }
    }
}
