//! Batch windowing: packing records into size-bounded payloads.
//!
//! The windower pulls records from a source and serializes them into one
//! textual batch, stopping before the payload would exceed the size limit.
//! A record pulled past the limit has already been consumed from the
//! source, so it is held as a carry-over and placed first in the next
//! batch. It is never re-read and never dropped.

use crate::error::Result;
use crate::record::{Bet, RecordSource};

/// One serialized batch and the number of records in it.
///
/// `count == 0` means the source is exhausted and nothing is carried
/// over: there are no more batches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Concatenated serialized records.
    pub payload: String,
    /// Records in the payload.
    pub count: usize,
}

/// Windows a record source into size-bounded batches.
pub struct Batcher<S> {
    source: S,
    carry_over: Option<Bet>,
}

impl<S: RecordSource> Batcher<S> {
    /// Wrap a record source. The windower owns it for the session.
    pub fn new(source: S) -> Self {
        Self {
            source,
            carry_over: None,
        }
    }

    /// Build the next batch of at most `max_payload_bytes`.
    ///
    /// The limit check only fires once the batch already holds a record,
    /// so a single record longer than the limit goes alone into an
    /// oversize batch; the frame transport rejects it only past the
    /// 16-bit wire ceiling.
    pub fn next_batch(&mut self, max_payload_bytes: usize) -> Result<Batch> {
        let mut payload = String::new();
        let mut count = 0;

        if let Some(bet) = self.carry_over.take() {
            payload.push_str(&bet.serialize());
            count += 1;
        }

        loop {
            let bet = match self.source.next()? {
                Some(bet) => bet,
                None => break,
            };
            let serialized = bet.serialize();
            if !payload.is_empty() && payload.len() + serialized.len() > max_payload_bytes {
                // Already consumed from the source: defer to the next batch.
                self.carry_over = Some(bet);
                break;
            }
            payload.push_str(&serialized);
            count += 1;
        }

        Ok(Batch { payload, count })
    }
}
