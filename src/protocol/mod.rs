//! Protocol module - wire format, framing, and message shapes.
//!
//! This module implements the exchange with the aggregator:
//! - 2-byte big-endian length prefix encoding/decoding
//! - Frame transport with loop-until-complete reads and writes
//! - The known payload shapes (batch text, exit, winners, acks)

mod framed;
mod messages;
mod wire_format;

pub use framed::FrameTransport;
pub use messages::{
    is_not_ready, parse_winners, winners_request, Ack, ACK_ERROR, ACK_SUCCESS, EXIT_NOTICE,
    WINNERS_TOKEN,
};
pub use wire_format::{
    decode_len, encode_len, LEN_PREFIX_SIZE, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE,
    WIRE_MAX_PAYLOAD_SIZE,
};
