use crate::client::ClientHandle;
use crate::error::StoreError;
use crate::state::{ClientId, Message, MessageId, StoreStats, UserSnapshot};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Requests that can be sent to the kernel worker.
///
/// Each carries a single-use reply channel that the worker fulfils exactly
/// once, without waiting for the caller to read it.
#[derive(Debug)]
pub enum KernelRequest {
    Register {
        username: String,
        password: String,
        reply_tx: oneshot::Sender<Result<(), StoreError>>,
    },
    /// Verify credentials and register `client` as a listener on success.
    Login {
        username: String,
        password: String,
        client: ClientHandle,
        reply_tx: oneshot::Sender<Result<UserSnapshot, StoreError>>,
    },
    Logout {
        username: String,
        client_id: ClientId,
        reply_tx: oneshot::Sender<()>,
    },
    Post {
        username: String,
        text: String,
        reply_tx: oneshot::Sender<Result<MessageId, StoreError>>,
    },
    Follow {
        followee: String,
        follower: String,
        reply_tx: oneshot::Sender<Result<(), StoreError>>,
    },
    Unfollow {
        followee: String,
        follower: String,
        reply_tx: oneshot::Sender<Result<(), StoreError>>,
    },
    Messages {
        username: String,
        reply_tx: oneshot::Sender<Vec<Arc<Message>>>,
    },
    Tagged {
        tag: String,
        reply_tx: oneshot::Sender<Vec<Arc<Message>>>,
    },
    /// Snapshot of one account (for WHOIS-style queries).
    User {
        username: String,
        reply_tx: oneshot::Sender<Option<UserSnapshot>>,
    },
    Stats {
        reply_tx: oneshot::Sender<StoreStats>,
    },
}

impl KernelRequest {
    /// Static request name for metrics and spans.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Register { .. } => "register",
            Self::Login { .. } => "login",
            Self::Logout { .. } => "logout",
            Self::Post { .. } => "post",
            Self::Follow { .. } => "follow",
            Self::Unfollow { .. } => "unfollow",
            Self::Messages { .. } => "messages",
            Self::Tagged { .. } => "tagged",
            Self::User { .. } => "user",
            Self::Stats { .. } => "stats",
        }
    }

    /// Whether the request can change store state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::Register { .. }
                | Self::Login { .. }
                | Self::Logout { .. }
                | Self::Post { .. }
                | Self::Follow { .. }
                | Self::Unfollow { .. }
        )
    }
}
