//! The kernel: a single worker that owns the social store.
//!
//! # Architecture
//!
//! - **State Ownership**: The `Kernel` owns the [`Store`] outright. Nothing else
//!   holds a reference into users, messages or the listener registry.
//! - **Message Passing**: Callers submit [`KernelRequest`]s through a
//!   [`KernelHandle`]; each request carries a oneshot reply channel.
//! - **Serialization**: The worker applies one request at a time, so every
//!   mutation is linearized. Replies are sent without waiting on the caller.
//! - **Fan-out**: After a post or a follow-graph change the worker enqueues
//!   notifications on per-client queues; delivery happens on per-client tasks.

mod fanout;
mod handle;
mod subscriber;
mod types;

pub use fanout::{FanoutReport, PostEvent, SubscriptionChange, fan_out_post, fan_out_subscription};
pub use handle::KernelHandle;
pub use subscriber::{Notification, Offer, Subscriber};
pub use types::KernelRequest;

use crate::config::KernelConfig;
use crate::error::StoreError;
use crate::state::{MessageId, Store, StoreOptions};
use crate::telemetry::{RequestTimer, spans};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// The kernel worker.
pub struct Kernel {
    store: Store,
    client_queue: usize,
}

impl Kernel {
    pub fn new(config: &KernelConfig) -> Self {
        Self {
            store: Store::with_options(StoreOptions {
                conceal_unknown_users: config.conceal_unknown_users,
            }),
            client_queue: config.client_queue,
        }
    }

    /// Create a kernel and spawn its worker task.
    pub fn spawn(config: &KernelConfig) -> (KernelHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let shutdown = CancellationToken::new();
        let kernel = Self::new(config);

        let token = shutdown.clone();
        let join = tokio::spawn(async move {
            kernel.run(rx, token).await;
        });

        (KernelHandle::new(tx, shutdown), join)
    }

    /// The main worker loop.
    ///
    /// Runs until `shutdown` fires or every handle is dropped. On shutdown the
    /// queue is closed to new requests and everything already queued is
    /// still applied and answered.
    pub async fn run(mut self, mut rx: mpsc::Receiver<KernelRequest>, shutdown: CancellationToken) {
        info!("Kernel ready");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                request = rx.recv() => match request {
                    Some(request) => self.handle_request(request),
                    None => {
                        info!("All kernel handles dropped; stopping");
                        return;
                    }
                },
            }
        }

        rx.close();
        let mut drained = 0usize;
        while let Some(request) = rx.recv().await {
            self.handle_request(request);
            drained += 1;
        }
        info!(drained, "Kernel stopped");
    }

    fn handle_request(&mut self, request: KernelRequest) {
        let kind = request.kind();
        let mutation = request.is_mutation();
        let _timer = RequestTimer::new(kind);
        let span = spans::request(kind);
        let _enter = span.enter();

        match request {
            KernelRequest::Register {
                username,
                password,
                reply_tx,
            } => {
                let result = self.store.register(&username, &password);
                match &result {
                    Ok(()) => info!(username = %username, "Registered"),
                    Err(e) => record_error(kind, e),
                }
                let _ = reply_tx.send(result);
            }
            KernelRequest::Login {
                username,
                password,
                client,
                reply_tx,
            } => {
                let client_id = client.id();
                // One delivery task per handle, shared by all its logins.
                let subscriber = match self.store.subscriber_for(client_id) {
                    Some(existing) => existing.rebind(&username),
                    None => Subscriber::spawn(client, &username, self.client_queue),
                };
                let result = self.store.login(&username, &password, subscriber);
                match &result {
                    Ok(_) => info!(username = %username, client = %client_id, "Logged in"),
                    Err(e) => record_error(kind, e),
                }
                let _ = reply_tx.send(result);
            }
            KernelRequest::Logout {
                username,
                client_id,
                reply_tx,
            } => {
                self.store.logout(&username, client_id);
                debug!(username = %username, client = %client_id, "Logged out");
                let _ = reply_tx.send(());
            }
            KernelRequest::Post {
                username,
                text,
                reply_tx,
            } => {
                let result = self.store.post(&username, &text);
                match &result {
                    Ok(id) => self.dispatch_post(*id),
                    Err(e) => record_error(kind, e),
                }
                let _ = reply_tx.send(result);
            }
            KernelRequest::Follow {
                followee,
                follower,
                reply_tx,
            } => {
                let result = self.store.follow(&followee, &follower);
                match &result {
                    Ok(()) => self.dispatch_subscription(followee, follower, false),
                    Err(e) => record_error(kind, e),
                }
                let _ = reply_tx.send(result);
            }
            KernelRequest::Unfollow {
                followee,
                follower,
                reply_tx,
            } => {
                let result = self.store.unfollow(&followee, &follower);
                match &result {
                    Ok(()) => self.dispatch_subscription(followee, follower, true),
                    Err(e) => record_error(kind, e),
                }
                let _ = reply_tx.send(result);
            }
            KernelRequest::Messages { username, reply_tx } => {
                let _ = reply_tx.send(self.store.messages(&username));
            }
            KernelRequest::Tagged { tag, reply_tx } => {
                let _ = reply_tx.send(self.store.tagged(&tag));
            }
            KernelRequest::User { username, reply_tx } => {
                let _ = reply_tx.send(self.store.user(&username));
            }
            KernelRequest::Stats { reply_tx } => {
                let _ = reply_tx.send(self.store.stats());
            }
        }

        if mutation {
            crate::metrics::set_store_stats(&self.store.stats());
        }
    }

    fn dispatch_post(&mut self, id: MessageId) {
        let Some(message) = self.store.message(id) else {
            return;
        };
        let followers = self.store.followers_of(&message.poster.username);
        let event = PostEvent::new(message, followers);

        let report = fan_out_post(self.store.listeners(), &event);
        self.prune(&report);
    }

    fn dispatch_subscription(&mut self, followee: String, follower: String, unfollow: bool) {
        let change = SubscriptionChange {
            followee,
            follower,
            unfollow,
        };

        let report = fan_out_subscription(self.store.listeners_of(&change.follower), change);
        self.prune(&report);
    }

    fn prune(&mut self, report: &FanoutReport) {
        if report.needs_prune() {
            let pruned = self.store.prune_listeners();
            debug!(pruned, "Pruned stopped or evicted listeners");
        }
    }
}

fn record_error(kind: &'static str, error: &StoreError) {
    debug!(request = kind, error = %error, "Request rejected");
    crate::metrics::record_request_error(kind, error.error_code());
}
