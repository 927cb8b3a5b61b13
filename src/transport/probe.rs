//! Connection probes for relay transport endpoints

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::utils::Result;
use crate::utils::error::TransportError;

/// An open connection produced by a probe
#[async_trait]
pub trait TransportConnection: Send {
    /// Endpoint this connection is open to
    fn endpoint(&self) -> &str;

    /// Close the connection
    async fn close(&mut self);
}

/// Opens connections to candidate endpoints
#[async_trait]
pub trait TransportProbe: Send + Sync {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn TransportConnection>>;
}

/// Probe that completes a WebSocket handshake
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketProbe;

struct WebSocketConnection {
    endpoint: String,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl TransportConnection for WebSocketConnection {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            log::trace!("close of {} failed: {}", self.endpoint, e);
        }
    }
}

#[async_trait]
impl TransportProbe for WebSocketProbe {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn TransportConnection>> {
        let (stream, _response) =
            connect_async(endpoint)
                .await
                .map_err(|e| TransportError::Connect {
                    endpoint: endpoint.to_string(),
                    reason: e.to_string(),
                })?;
        Ok(Box::new(WebSocketConnection {
            endpoint: endpoint.to_string(),
            stream,
        }))
    }
}
