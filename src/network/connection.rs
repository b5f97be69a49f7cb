//! Connection - handles one WebSocket client.
//!
//! ```text
//!   WebSocket frames ──▶ Command::parse ──▶ KernelHandle ──▶ Reply ──┐
//!                                                                    ▼
//!   Kernel fan-out ──▶ WsClient ──▶ outgoing queue ──────────▶ WebSocket sink
//! ```
//!
//! Replies are written as soon as the kernel answers; pushes wait in the
//! outgoing queue until the loop is idle. One task owns the sink. A client
//! the kernel evicts gets one `error <reason>` frame and is closed.

use super::protocol::{self, Command, Reply};
use crate::client::{Client, ClientHandle};
use crate::error::{ClientError, KernelError};
use crate::kernel::{KernelHandle, SubscriptionChange};
use crate::state::Message;
use crate::telemetry::spans;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{Instrument, debug, info, warn};

/// Frames queued toward the socket before pushes start waiting.
const OUTGOING_QUEUE: usize = 64;

/// Set once when the kernel asks the connection to go away.
#[derive(Default)]
struct Kick {
    token: CancellationToken,
    reason: OnceLock<String>,
}

/// The [`Client`] a connection registers at login.
struct WsClient {
    outgoing: mpsc::Sender<String>,
    kick: Arc<Kick>,
}

#[async_trait]
impl Client for WsClient {
    async fn on_message(&self, message: Arc<Message>) -> Result<(), ClientError> {
        let frame =
            protocol::message_push(&message).map_err(|e| ClientError::Transport(e.to_string()))?;
        self.outgoing
            .send(frame)
            .await
            .map_err(|_| ClientError::Disconnected)
    }

    async fn on_subscription_change(&self, change: &SubscriptionChange) -> Result<(), ClientError> {
        let frame = protocol::subscription_push(change)
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        self.outgoing
            .send(frame)
            .await
            .map_err(|_| ClientError::Disconnected)
    }

    async fn on_disconnect(&self, reason: &str) {
        let _ = self.kick.reason.set(reason.to_string());
        self.kick.token.cancel();
    }
}

/// A WebSocket client connection.
pub struct Connection {
    addr: SocketAddr,
    kernel: KernelHandle,
    handle: ClientHandle,
    outgoing_rx: mpsc::Receiver<String>,
    kick: Arc<Kick>,
    username: Option<String>,
}

impl Connection {
    pub fn new(addr: SocketAddr, kernel: KernelHandle) -> Self {
        let (outgoing, outgoing_rx) = mpsc::channel(OUTGOING_QUEUE);
        let kick = Arc::new(Kick::default());
        let client = WsClient {
            outgoing,
            kick: Arc::clone(&kick),
        };
        Self {
            addr,
            kernel,
            handle: ClientHandle::new(Arc::new(client)),
            outgoing_rx,
            kick,
            username: None,
        }
    }

    /// Run the connection until the peer goes away or the kernel stops.
    pub async fn run(mut self, stream: WebSocketStream<TcpStream>) -> anyhow::Result<()> {
        let span = spans::connection(&self.handle.id().to_string(), &self.addr.to_string());
        async move {
            crate::metrics::add_connected_clients(1);
            let result = self.event_loop(stream).await;
            crate::metrics::add_connected_clients(-1);

            if let Some(username) = self.username.take()
                && let Err(e) = self.kernel.logout(&username, &self.handle).await
            {
                debug!(error = %e, "Logout on disconnect failed");
            }
            info!("Client disconnected");
            result
        }
        .instrument(span)
        .await
    }

    async fn event_loop(&mut self, stream: WebSocketStream<TcpStream>) -> anyhow::Result<()> {
        let (mut sink, mut frames) = stream.split();
        let kick = Arc::clone(&self.kick);

        loop {
            tokio::select! {
                _ = kick.token.cancelled() => {
                    let reason = kick.reason.get().map(String::as_str).unwrap_or("Disconnected");
                    warn!(reason, "Disconnecting client at the kernel's request");
                    sink.send(WsMessage::Text(Reply::error(reason).to_string())).await?;
                    break;
                }

                frame = frames.next() => {
                    let text = match frame {
                        Some(Ok(WsMessage::Text(text))) => text,
                        Some(Ok(WsMessage::Close(_))) | None => break,
                        Some(Ok(WsMessage::Binary(_))) => {
                            debug!("Discarding binary frame");
                            continue;
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            warn!(error = %e, "Read error");
                            break;
                        }
                    };

                    debug!(recv = %text, "Received frame");
                    let reply = self.handle_frame(&text).await;
                    let stop = matches!(&reply, Err(KernelError::Unavailable));
                    let reply = reply.unwrap_or_else(Reply::error);
                    sink.send(WsMessage::Text(reply.to_string())).await?;
                    if stop {
                        break;
                    }
                }

                Some(frame) = self.outgoing_rx.recv() => {
                    sink.send(WsMessage::Text(frame)).await?;
                }
            }
        }

        let _ = sink.close().await;
        Ok(())
    }

    async fn handle_frame(&mut self, text: &str) -> Result<Reply, KernelError> {
        let Some(command) = Command::parse(text) else {
            return Ok(Reply::bad_request());
        };
        if command.requires_login() && self.username.is_none() {
            return Ok(Reply::unauthorized());
        }
        debug!(command = command.name(), "Dispatching");

        match command {
            Command::Register { username, password } => {
                self.kernel.register(&username, &password).await?;
                self.login(username, &password).await
            }
            Command::Login { username, password } => self.login(username, &password).await,
            Command::Logout => {
                if let Some(username) = self.username.take() {
                    self.kernel.logout(&username, &self.handle).await?;
                }
                Ok(Reply::Ok)
            }
            Command::Post { text } => {
                let id = self.kernel.post(self.current_user(), &text).await?;
                Ok(Reply::Posted(id))
            }
            Command::Follow { username } => {
                self.kernel.follow(&username, self.current_user()).await?;
                Ok(Reply::Ok)
            }
            Command::Unfollow { username } => {
                self.kernel.unfollow(&username, self.current_user()).await?;
                Ok(Reply::Ok)
            }
            Command::Messages { username } => {
                let messages = self.kernel.messages(&username).await?;
                Ok(Reply::json(&messages))
            }
            Command::Tagged { tag } => {
                let messages = self.kernel.tagged(&tag).await?;
                Ok(Reply::json(&messages))
            }
            Command::Whois { username } => match self.kernel.user(&username).await? {
                Some(snapshot) => Ok(Reply::json(&snapshot)),
                None => Ok(Reply::error(crate::error::StoreError::UnknownUser(username))),
            },
        }
    }

    /// Log this connection in, replacing any earlier login on success.
    async fn login(&mut self, username: String, password: &str) -> Result<Reply, KernelError> {
        self.kernel
            .login(&username, password, self.handle.clone())
            .await?;

        if let Some(previous) = self.username.replace(username)
            && Some(&previous) != self.username.as_ref()
        {
            self.kernel.logout(&previous, &self.handle).await?;
        }
        info!(username = ?self.username, "Connection logged in");
        Ok(Reply::Ok)
    }

    fn current_user(&self) -> &str {
        self.username.as_deref().unwrap_or_default()
    }
}
