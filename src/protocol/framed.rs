//! Frame transport over a stream that may transfer partial buffers.
//!
//! Stream sockets do not guarantee that a single read or write call moves
//! the full buffer, so both directions loop until every byte has crossed:
//! [`FrameTransport::send`] resumes the remaining suffix after a short
//! write, and [`FrameTransport::recv`] keeps reading until the declared
//! payload length has arrived.
//!
//! Any I/O error aborts immediately without retry; a peer that closes the
//! connection mid-frame surfaces as [`BetwireError::ConnectionClosed`].

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::wire_format::{decode_len, encode_len, LEN_PREFIX_SIZE};
use crate::error::{BetwireError, Result};

/// Length-prefixed framing over an owned stream.
pub struct FrameTransport<S> {
    stream: S,
}

impl<S: AsyncRead + AsyncWrite + Unpin> FrameTransport<S> {
    /// Wrap a connected stream.
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Consume the transport, returning the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Write one frame: the 2-byte big-endian prefix followed by the payload.
    ///
    /// Does not return until the transport has accepted every byte.
    ///
    /// # Errors
    ///
    /// [`BetwireError::PayloadTooLarge`] if the payload exceeds the 16-bit
    /// prefix, or [`BetwireError::Io`] on any write error.
    pub async fn send(&mut self, payload: &[u8]) -> Result<()> {
        let prefix = encode_len(payload.len())?;

        let mut frame = Vec::with_capacity(LEN_PREFIX_SIZE + payload.len());
        frame.extend_from_slice(&prefix);
        frame.extend_from_slice(payload);

        let mut written = 0;
        while written < frame.len() {
            let n = self.stream.write(&frame[written..]).await?;
            if n == 0 {
                return Err(BetwireError::Io(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    "stream accepted 0 bytes",
                )));
            }
            written += n;
        }
        self.stream.flush().await?;
        Ok(())
    }

    /// Read one frame: exactly 2 prefix bytes, then exactly the declared
    /// number of payload bytes.
    ///
    /// # Errors
    ///
    /// [`BetwireError::ConnectionClosed`] if the peer closes before the full
    /// frame has arrived, or [`BetwireError::Io`] on any read error.
    pub async fn recv(&mut self) -> Result<Bytes> {
        let mut prefix = [0u8; LEN_PREFIX_SIZE];
        self.read_full(&mut prefix).await?;

        let len = decode_len(prefix) as usize;
        let mut payload = vec![0u8; len];
        self.read_full(&mut payload).await?;
        Ok(Bytes::from(payload))
    }

    /// Read one frame and validate it as UTF-8 text.
    ///
    /// Responses in this protocol are always text; non-UTF-8 bytes are a
    /// [`BetwireError::Protocol`] error.
    pub async fn recv_text(&mut self) -> Result<String> {
        let payload = self.recv().await?;
        String::from_utf8(payload.to_vec())
            .map_err(|_| BetwireError::Protocol("response is not valid UTF-8".to_string()))
    }

    /// Fill `buf` completely, looping on short reads.
    async fn read_full(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.stream.read(&mut buf[filled..]).await?;
            if n == 0 {
                return Err(BetwireError::ConnectionClosed);
            }
            filled += n;
        }
        Ok(())
    }
}
