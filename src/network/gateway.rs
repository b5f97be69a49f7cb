//! Gateway - WebSocket listener that accepts incoming connections.
//!
//! The Gateway binds one socket and spawns a [`Connection`] task for each
//! client that completes the WebSocket handshake.

use crate::config::ListenConfig;
use crate::kernel::KernelHandle;
use crate::network::Connection;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

/// The Gateway accepts incoming WebSocket connections and spawns handlers.
pub struct Gateway {
    listener: TcpListener,
    config: Arc<ListenConfig>,
    kernel: KernelHandle,
}

impl Gateway {
    /// Bind the gateway to the configured address.
    pub async fn bind(config: ListenConfig, kernel: KernelHandle) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(config.address).await?;
        info!(address = %listener.local_addr()?, "WebSocket listener bound");

        Ok(Self {
            listener,
            config: Arc::new(config),
            kernel,
        })
    }

    /// The bound address (useful when the configured port is 0).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` fires.
    #[instrument(skip_all, name = "gateway")]
    pub async fn run(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        loop {
            let accepted = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Gateway stopping");
                    return Ok(());
                }
                accepted = self.listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, addr)) => {
                    info!(%addr, "WebSocket connection attempt");
                    let config = Arc::clone(&self.config);
                    let kernel = self.kernel.clone();
                    tokio::spawn(async move {
                        serve(stream, addr, config, kernel).await;
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept WebSocket connection");
                }
            }
        }
    }
}

async fn serve(stream: TcpStream, addr: SocketAddr, config: Arc<ListenConfig>, kernel: KernelHandle) {
    // Origin validation for the WebSocket handshake
    let origin_check = |req: &Request, response: Response| -> Result<Response, ErrorResponse> {
        let origin = req.headers().get("Origin").and_then(|o| o.to_str().ok());
        if config.origin_allowed(origin) {
            return Ok(response);
        }
        warn!(%addr, origin = ?origin, "WebSocket origin rejected");

        let mut rejection = ErrorResponse::new(Some("Origin not allowed".to_string()));
        *rejection.status_mut() = http::StatusCode::FORBIDDEN;
        Err(rejection)
    };

    match accept_hdr_async(stream, origin_check).await {
        Ok(ws_stream) => {
            info!(%addr, "WebSocket handshake successful");
            let connection = Connection::new(addr, kernel);
            if let Err(e) = connection.run(ws_stream).await {
                error!(%addr, error = %e, "WebSocket connection error");
            }
        }
        Err(e) => {
            warn!(%addr, error = %e, "WebSocket handshake failed");
        }
    }
}
