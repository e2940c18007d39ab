//! Session controller: drives the end-to-end exchange with the aggregator.
//!
//! Lifecycle:
//! 1. Connect (one connection for the whole batch phase)
//! 2. Loop: pull a batch, send it as one frame, await the ack, classify
//! 3. Send the exit notice on the same connection
//! 4. Poll for winners on fresh connections until they are ready
//!
//! Any I/O error while sending batches ends the session; only the winners
//! poll retries, and only on the "not ready" response. Cancellation is
//! cooperative: it is observed between batch iterations and during the
//! poll backoff wait. A socket read or write already in flight runs to
//! completion; aborts do not interrupt blocked I/O.
//!
//! # Example
//!
//! ```ignore
//! use betwire_client::{Client, CsvSource, TcpConnector};
//!
//! #[tokio::main]
//! async fn main() {
//!     let source = CsvSource::open("agency.csv", "7").unwrap();
//!     let mut client = Client::builder("7").build(TcpConnector::new("127.0.0.1:12345"));
//!     let outcome = client.run(source).await.unwrap();
//!     println!("{:?}", outcome);
//! }
//! ```

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::batch::Batcher;
use crate::error::{BetwireError, Result};
use crate::protocol::{
    is_not_ready, parse_winners, winners_request, Ack, FrameTransport, EXIT_NOTICE,
    MAX_PAYLOAD_SIZE,
};
use crate::record::RecordSource;
use crate::transport::Connect;

/// Default maximum batch payload size: the protocol ceiling.
pub const DEFAULT_MAX_BATCH_BYTES: usize = MAX_PAYLOAD_SIZE;

/// Default base period for the winners poll.
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_secs(1);

/// Default multiple of the base period waited between poll attempts.
pub const DEFAULT_POLL_BACKOFF_FACTOR: u32 = 2;

/// Builder for configuring a client session.
pub struct ClientBuilder {
    agency_id: String,
    max_batch_bytes: usize,
    poll_period: Duration,
    poll_backoff_factor: u32,
    cancel: CancellationToken,
}

impl ClientBuilder {
    /// Create a builder for the given agency identity.
    pub fn new(agency_id: impl Into<String>) -> Self {
        Self {
            agency_id: agency_id.into(),
            max_batch_bytes: DEFAULT_MAX_BATCH_BYTES,
            poll_period: DEFAULT_POLL_PERIOD,
            poll_backoff_factor: DEFAULT_POLL_BACKOFF_FACTOR,
            cancel: CancellationToken::new(),
        }
    }

    /// Set the maximum batch payload size in bytes.
    ///
    /// Values above the protocol ceiling are clamped to it.
    pub fn max_batch_bytes(mut self, limit: usize) -> Self {
        self.max_batch_bytes = limit.min(MAX_PAYLOAD_SIZE);
        self
    }

    /// Set the base period for the winners poll.
    pub fn poll_period(mut self, period: Duration) -> Self {
        self.poll_period = period;
        self
    }

    /// Set the backoff multiple applied to the base period between polls.
    pub fn poll_backoff_factor(mut self, factor: u32) -> Self {
        self.poll_backoff_factor = factor;
        self
    }

    /// Use an externally owned cancellation token.
    ///
    /// Cancelling it stops the session at the next suspension point:
    /// before the next batch is sent, or during the poll backoff wait.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Build the client over the given connector.
    pub fn build<C: Connect>(self, connector: C) -> Client<C> {
        Client {
            connector,
            agency_id: self.agency_id,
            max_batch_bytes: self.max_batch_bytes,
            backoff: self.poll_period * self.poll_backoff_factor,
            cancel: self.cancel,
        }
    }
}

/// Tally of a finished (or stopped) session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// Batches sent and answered, whatever the classification.
    pub batches_sent: u64,
    /// Records in batches the aggregator accepted.
    pub records_accepted: u64,
    /// Records in batches the aggregator recorded but did not accept.
    pub records_rejected: u64,
    /// Winning national ids; populated once polling completed.
    pub winners: Vec<String>,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Every batch was sent and the winners arrived.
    Done(SessionReport),
    /// Stopped by cancellation before completion.
    Stopped(SessionReport),
}

/// Outcome of one phase: keep going, or stop at the operator's request.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stopped,
}

/// A configured client session over some connector.
///
/// The connection and the record source are owned exclusively by the
/// session for its lifetime; both are released on every exit path.
pub struct Client<C> {
    connector: C,
    agency_id: String,
    max_batch_bytes: usize,
    backoff: Duration,
    cancel: CancellationToken,
}

impl<C: Connect> Client<C> {
    /// Create a client builder.
    pub fn builder(agency_id: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(agency_id)
    }

    /// A token that stops the session at the next suspension point.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the whole session: send every batch, notify exit, poll winners.
    ///
    /// # Errors
    ///
    /// Connection and frame I/O failures during the batch phase are fatal,
    /// as is a fatal ack ([`BetwireError::RemoteError`]) and an
    /// unparseable winners response. There is no reconnect and no batch
    /// retransmission.
    pub async fn run<S: RecordSource>(&mut self, source: S) -> Result<SessionOutcome> {
        let mut report = SessionReport::default();
        let mut batcher = Batcher::new(source);

        tracing::debug!(agency_id = %self.agency_id, "connecting to aggregator");
        let stream = self.connector.connect().await?;
        let mut transport = FrameTransport::new(stream);

        if self.send_batches(&mut batcher, &mut transport, &mut report).await? == Flow::Stopped {
            return Ok(SessionOutcome::Stopped(report));
        }

        // The exit notice is best-effort: the batches above are already
        // acknowledged, so a failure here is not allowed to fail them.
        if let Err(e) = transport.send(EXIT_NOTICE.as_bytes()).await {
            tracing::warn!(error = %e, "failed to deliver the exit notice");
        }
        drop(transport);

        match self.poll_winners(&mut report).await? {
            Flow::Continue => Ok(SessionOutcome::Done(report)),
            Flow::Stopped => Ok(SessionOutcome::Stopped(report)),
        }
    }

    /// Send batches until the source is exhausted.
    ///
    /// Cancellation is checked before each iteration; a pending batch is
    /// then never built or sent, but an exchange already in flight is
    /// finished first.
    async fn send_batches<S: RecordSource>(
        &mut self,
        batcher: &mut Batcher<S>,
        transport: &mut FrameTransport<C::Stream>,
        report: &mut SessionReport,
    ) -> Result<Flow> {
        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("stop requested, leaving the batch loop");
                return Ok(Flow::Stopped);
            }

            let batch = batcher.next_batch(self.max_batch_bytes)?;
            if batch.count == 0 {
                tracing::debug!(batches = report.batches_sent, "record source exhausted");
                return Ok(Flow::Continue);
            }

            transport.send(batch.payload.as_bytes()).await?;
            let response = transport.recv_text().await?;
            report.batches_sent += 1;

            match Ack::classify(&response) {
                Ack::Accepted => {
                    report.records_accepted += batch.count as u64;
                    tracing::debug!(records = batch.count, "batch accepted");
                }
                Ack::Rejected => {
                    report.records_rejected += batch.count as u64;
                    tracing::warn!(records = batch.count, response = %response, "batch rejected");
                }
                Ack::Fatal => {
                    tracing::error!(records = batch.count, "aggregator reported a fatal error");
                    return Err(BetwireError::RemoteError);
                }
            }
        }
    }

    /// Poll the aggregator until the winners are ready.
    ///
    /// The one deliberate retry site: the "not ready" sentinel waits out
    /// the backoff on a fresh connection per attempt. I/O errors and
    /// unparseable responses stay fatal.
    async fn poll_winners(&mut self, report: &mut SessionReport) -> Result<Flow> {
        let request = winners_request(&self.agency_id);

        loop {
            let stream = self.connector.connect().await?;
            let mut transport = FrameTransport::new(stream);
            transport.send(request.as_bytes()).await?;
            let response = transport.recv_text().await?;
            drop(transport);

            if !is_not_ready(&response) {
                let winners = parse_winners(&response)?;
                tracing::info!(winners = winners.len(), "winners received");
                report.winners = winners;
                return Ok(Flow::Continue);
            }

            tracing::debug!(backoff = ?self.backoff, "winners not ready yet");
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("stop requested during the poll wait");
                    return Ok(Flow::Stopped);
                }
                _ = tokio::time::sleep(self.backoff) => {}
            }
        }
    }
}
