//! # betwire-client
//!
//! Rust client for the betwire aggregator protocol.
//!
//! Reads an agency's bet records from a local CSV file, packs them into
//! size-bounded batches, ships each batch as one length-prefixed frame
//! over a persistent stream connection, then polls the aggregator until
//! the winners are drawn.
//!
//! ## Architecture
//!
//! - **Record source** ([`record`]): pull-based CSV iterator
//! - **Batch windower** ([`batch`]): size-bounded packing with carry-over
//! - **Frame protocol** ([`protocol`]): 2-byte big-endian length prefix
//!   framing with loop-until-complete reads and writes
//! - **Session controller** ([`client`]): connect → batches → exit → poll
//!
//! ## Example
//!
//! ```ignore
//! use betwire_client::{Client, CsvSource, TcpConnector};
//!
//! #[tokio::main]
//! async fn main() {
//!     let source = CsvSource::open("agency.csv", "7").unwrap();
//!     let mut client = Client::builder("7")
//!         .build(TcpConnector::new("127.0.0.1:12345"));
//!
//!     match client.run(source).await {
//!         Ok(outcome) => println!("{:?}", outcome),
//!         Err(e) => eprintln!("session failed: {}", e),
//!     }
//! }
//! ```

pub mod batch;
pub mod error;
pub mod protocol;
pub mod record;
pub mod transport;

mod client;

pub use batch::{Batch, Batcher};
pub use client::{Client, ClientBuilder, SessionOutcome, SessionReport};
pub use error::{BetwireError, Result};
pub use record::{Bet, CsvSource, RecordSource};
pub use transport::{Connect, TcpConnector};
