//! TCP connector.

use async_trait::async_trait;
use tokio::net::TcpStream;

use super::Connect;
use crate::error::Result;

/// Connects to the aggregator's TCP address.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    /// Create a connector for `host:port`.
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    /// The configured aggregator address.
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl Connect for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&mut self) -> Result<Self::Stream> {
        let stream = TcpStream::connect(&self.addr).await?;
        Ok(stream)
    }
}
