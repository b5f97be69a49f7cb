//! WebSocket test client speaking the buzzd line protocol.

use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

pub struct TestWsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestWsClient {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let (stream, _response) = connect_async(url).await?;
        Ok(Self { stream })
    }

    pub async fn send(&mut self, line: &str) -> anyhow::Result<()> {
        self.stream.send(Message::Text(line.to_string())).await?;
        Ok(())
    }

    /// Receive the next text frame.
    pub async fn recv(&mut self) -> anyhow::Result<String> {
        loop {
            let frame = timeout(Duration::from_secs(5), self.stream.next())
                .await?
                .ok_or_else(|| anyhow::anyhow!("connection closed"))??;
            if let Message::Text(text) = frame {
                return Ok(text);
            }
        }
    }

    /// Send a command and return the first frame that is a reply rather
    /// than a push.
    pub async fn request(&mut self, line: &str) -> anyhow::Result<String> {
        self.send(line).await?;
        loop {
            let frame = self.recv().await?;
            if frame.starts_with("OK") || frame.starts_with("error") {
                return Ok(frame);
            }
        }
    }

    /// Receive frames until one starts with `prefix`.
    #[allow(dead_code)]
    pub async fn recv_push(&mut self, prefix: &str) -> anyhow::Result<String> {
        loop {
            let frame = self.recv().await?;
            if let Some(rest) = frame.strip_prefix(prefix) {
                return Ok(rest.trim_start().to_string());
            }
        }
    }

    #[allow(dead_code)]
    pub async fn send_binary(&mut self, data: Vec<u8>) -> anyhow::Result<()> {
        self.stream.send(Message::Binary(data)).await?;
        Ok(())
    }

    #[allow(dead_code)]
    pub async fn close(mut self) -> anyhow::Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}
