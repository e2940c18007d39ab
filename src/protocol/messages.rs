//! Payload shapes exchanged with the aggregator.
//!
//! The framing layer is content-agnostic; these are the payloads it
//! carries: batch text, the exit notice, the winners request, the ack
//! response to a batch, and the winners result set.

use crate::error::{BetwireError, Result};

/// Ack token meaning the aggregator stored the batch (case-insensitive).
pub const ACK_SUCCESS: &str = "success";

/// Token marking a fatal server-side failure. Doubles as the "results not
/// ready yet" reply to a winners request.
pub const ACK_ERROR: &str = "error";

/// Notice that no more batches are coming on this connection.
pub const EXIT_NOTICE: &str = "exit";

/// Token that opens a winners request.
pub const WINNERS_TOKEN: &str = "winners";

/// Classification of the single response frame following a sent batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// Batch stored by the aggregator.
    Accepted,
    /// Batch recorded but not successful; the session continues.
    Rejected,
    /// Fatal server-side failure; the session ends.
    Fatal,
}

impl Ack {
    /// Classify a response payload.
    ///
    /// Matching is case-insensitive and exact: `"Success"` is accepted,
    /// `"ERROR"` is fatal, and anything else (`"partial"`, say) is a
    /// non-fatal rejection.
    pub fn classify(response: &str) -> Self {
        if response.eq_ignore_ascii_case(ACK_SUCCESS) {
            Self::Accepted
        } else if response.eq_ignore_ascii_case(ACK_ERROR) {
            Self::Fatal
        } else {
            Self::Rejected
        }
    }
}

/// Build the winners request carrying the client's identity.
pub fn winners_request(agency_id: &str) -> String {
    format!("{};{}", WINNERS_TOKEN, agency_id)
}

/// Whether a winners response is the "not ready yet" sentinel.
pub fn is_not_ready(response: &str) -> bool {
    response.eq_ignore_ascii_case(ACK_ERROR)
}

/// Parse a winners response into the list of winning national ids.
pub fn parse_winners(response: &str) -> Result<Vec<String>> {
    serde_json::from_str(response).map_err(|e| {
        BetwireError::Protocol(format!("winners response is not a JSON string array: {}", e))
    })
}
