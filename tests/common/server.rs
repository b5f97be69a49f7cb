//! In-process test server.
//!
//! Spawns a kernel and a gateway bound to an ephemeral localhost port.

use buzzd::config::{KernelConfig, ListenConfig};
use buzzd::kernel::{Kernel, KernelHandle};
use buzzd::network::Gateway;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;

/// A running kernel plus gateway.
pub struct TestServer {
    pub kernel: KernelHandle,
    addr: SocketAddr,
    shutdown: CancellationToken,
}

impl TestServer {
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with(ListenConfig {
            address: "127.0.0.1:0".parse()?,
            allow_origins: Vec::new(),
        })
        .await
    }

    pub async fn spawn_with(listen: ListenConfig) -> anyhow::Result<Self> {
        let (kernel, _join) = Kernel::spawn(&KernelConfig::default());
        let gateway = Gateway::bind(listen, kernel.clone()).await?;
        let addr = gateway.local_addr()?;
        let shutdown = CancellationToken::new();
        tokio::spawn(gateway.run(shutdown.clone()));

        Ok(Self {
            kernel,
            addr,
            shutdown,
        })
    }

    /// WebSocket URL of the gateway.
    pub fn url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.kernel.shutdown();
    }
}
