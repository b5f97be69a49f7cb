//! Caller-side access to the kernel worker.

use super::KernelRequest;
use crate::client::ClientHandle;
use crate::error::{KernelError, KernelResult};
use crate::state::{Message, MessageId, StoreStats, UserSnapshot};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// Cloneable handle to the kernel.
///
/// Every clone is an independent request source: requests from one clone are
/// applied in the order they were submitted, and each call waits only for its
/// own reply.
#[derive(Debug, Clone)]
pub struct KernelHandle {
    tx: mpsc::Sender<KernelRequest>,
    shutdown: CancellationToken,
}

impl KernelHandle {
    pub(super) fn new(tx: mpsc::Sender<KernelRequest>, shutdown: CancellationToken) -> Self {
        Self { tx, shutdown }
    }

    async fn submit<T>(
        &self,
        request: KernelRequest,
        reply_rx: oneshot::Receiver<T>,
    ) -> KernelResult<T> {
        self.tx
            .send(request)
            .await
            .map_err(|_| KernelError::Unavailable)?;
        reply_rx.await.map_err(|_| KernelError::Unavailable)
    }

    pub async fn register(&self, username: &str, password: &str) -> KernelResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = KernelRequest::Register {
            username: username.to_string(),
            password: password.to_string(),
            reply_tx,
        };
        self.submit(request, reply_rx).await?.map_err(KernelError::from)
    }

    /// Log in and register `client` to receive notifications for `username`.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        client: ClientHandle,
    ) -> KernelResult<UserSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = KernelRequest::Login {
            username: username.to_string(),
            password: password.to_string(),
            client,
            reply_tx,
        };
        self.submit(request, reply_rx).await?.map_err(KernelError::from)
    }

    /// Deregister `client`. A no-op if it was never registered.
    pub async fn logout(&self, username: &str, client: &ClientHandle) -> KernelResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = KernelRequest::Logout {
            username: username.to_string(),
            client_id: client.id(),
            reply_tx,
        };
        self.submit(request, reply_rx).await
    }

    pub async fn post(&self, username: &str, text: &str) -> KernelResult<MessageId> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = KernelRequest::Post {
            username: username.to_string(),
            text: text.to_string(),
            reply_tx,
        };
        self.submit(request, reply_rx).await?.map_err(KernelError::from)
    }

    /// Make `follower` follow `followee`.
    pub async fn follow(&self, followee: &str, follower: &str) -> KernelResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = KernelRequest::Follow {
            followee: followee.to_string(),
            follower: follower.to_string(),
            reply_tx,
        };
        self.submit(request, reply_rx).await?.map_err(KernelError::from)
    }

    pub async fn unfollow(&self, followee: &str, follower: &str) -> KernelResult<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = KernelRequest::Unfollow {
            followee: followee.to_string(),
            follower: follower.to_string(),
            reply_tx,
        };
        self.submit(request, reply_rx).await?.map_err(KernelError::from)
    }

    /// Messages posted by `username`, in no particular order.
    pub async fn messages(&self, username: &str) -> KernelResult<Vec<Arc<Message>>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = KernelRequest::Messages {
            username: username.to_string(),
            reply_tx,
        };
        self.submit(request, reply_rx).await
    }

    pub async fn tagged(&self, tag: &str) -> KernelResult<Vec<Arc<Message>>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = KernelRequest::Tagged {
            tag: tag.to_string(),
            reply_tx,
        };
        self.submit(request, reply_rx).await
    }

    pub async fn user(&self, username: &str) -> KernelResult<Option<UserSnapshot>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = KernelRequest::User {
            username: username.to_string(),
            reply_tx,
        };
        self.submit(request, reply_rx).await
    }

    pub async fn stats(&self) -> KernelResult<StoreStats> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.submit(KernelRequest::Stats { reply_tx }, reply_rx).await
    }

    /// Ask the worker to stop. Requests already queued are still applied;
    /// later ones fail with [`KernelError::Unavailable`].
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Wait until the worker has stopped accepting requests.
    pub async fn closed(&self) {
        self.tx.closed().await;
    }
}
