//! Transport seam: how the session obtains stream connections.
//!
//! The batch phase runs over a single connection held for its whole
//! lifetime; the winners poll opens a fresh connection per attempt. Both
//! go through [`Connect`], so the session controller can be driven over
//! in-memory streams in tests.

mod tcp;

pub use tcp::TcpConnector;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;

/// Produces stream connections to the aggregator.
#[async_trait]
pub trait Connect {
    /// The stream type produced.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Open a new connection.
    async fn connect(&mut self) -> Result<Self::Stream>;
}
