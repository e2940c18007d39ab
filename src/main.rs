//! betwire command line client.
//!
//! Uploads one agency's bets to the aggregator, then waits for the
//! winners draw. Ctrl-C stops the session at the next safe point.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use betwire_client::{Client, CsvSource, SessionOutcome, TcpConnector};

/// Upload an agency's bets to the aggregator and wait for the winners.
#[derive(Debug, Parser)]
#[command(name = "betwire", version)]
struct Cli {
    /// Aggregator address, host:port.
    #[arg(long, default_value = "127.0.0.1:12345")]
    server: String,

    /// Agency identifier sent with every record.
    #[arg(long)]
    agency_id: String,

    /// CSV file with this agency's bets.
    #[arg(long, default_value = "agency.csv")]
    data: PathBuf,

    /// Maximum batch payload size in bytes (clamped to the protocol ceiling).
    #[arg(long, default_value_t = betwire_client::protocol::MAX_PAYLOAD_SIZE)]
    max_batch_bytes: usize,

    /// Base period in milliseconds for the winners poll.
    #[arg(long, default_value_t = 1000)]
    poll_period_ms: u64,

    /// Backoff multiple applied to the base period between polls.
    #[arg(long, default_value_t = 2)]
    poll_backoff_factor: u32,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run(Cli::parse()).await {
        Ok(SessionOutcome::Done(report)) => {
            tracing::info!(
                batches = report.batches_sent,
                accepted = report.records_accepted,
                rejected = report.records_rejected,
                winners = report.winners.len(),
                "session finished"
            );
            ExitCode::SUCCESS
        }
        Ok(SessionOutcome::Stopped(report)) => {
            tracing::info!(batches = report.batches_sent, "session stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("session failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<SessionOutcome> {
    let source = CsvSource::open(&cli.data, &cli.agency_id)
        .with_context(|| format!("cannot open {}", cli.data.display()))?;

    let cancel = CancellationToken::new();
    let mut client = Client::<TcpConnector>::builder(cli.agency_id)
        .max_batch_bytes(cli.max_batch_bytes)
        .poll_period(Duration::from_millis(cli.poll_period_ms))
        .poll_backoff_factor(cli.poll_backoff_factor)
        .cancellation_token(cancel.clone())
        .build(TcpConnector::new(cli.server));

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping after the current exchange");
            cancel.cancel();
        }
    });

    let outcome = client.run(source).await?;
    Ok(outcome)
}
