//! Transport trait for peripheral communication.
//!
//! The [`Transport`] trait abstracts over the physical link to a station
//! peripheral. The serial implementation lives in `shack-transport`; mock
//! and simulated transports live in `shack-test-harness`.
//!
//! The frame protocol has no delimiters, so the layers above this trait
//! reason in exact byte counts. [`receive_exact`] gathers a fixed-length
//! reply across however many reads the link delivers it in.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{Error, Result};

/// Asynchronous byte-level transport to a peripheral.
///
/// Implementations handle buffering and error recovery at the physical
/// layer. Protocol-level concerns (frame layout, CRC, acknowledgement) are
/// handled by the codec that consumes this trait.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the device.
    ///
    /// Returns the number of bytes written. Callers that require a full
    /// frame compare the count against the frame length themselves.
    async fn send(&mut self, data: &[u8]) -> Result<usize>;

    /// Receive bytes from the device into the provided buffer.
    ///
    /// Returns the number of bytes actually read. Will wait up to `timeout`
    /// for data to arrive; returns [`Error::Timeout`] if no data is received
    /// within the deadline.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the transport connection.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::NotConnected`].
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}

/// Read until `buf` is full or `timeout` elapses.
///
/// Returns the number of bytes gathered. A partial fill is returned as
/// `Ok(n)` with `n < buf.len()` so the caller can report a short read;
/// [`Error::Timeout`] is returned only when nothing arrived at all.
pub async fn receive_exact(
    transport: &mut dyn Transport,
    buf: &mut [u8],
    timeout: Duration,
) -> Result<usize> {
    let deadline = Instant::now() + timeout;
    let mut filled = 0;

    while filled < buf.len() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match transport.receive(&mut buf[filled..], remaining).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(Error::Timeout) => break,
            Err(e) => return Err(e),
        }
    }

    if filled == 0 && !buf.is_empty() {
        return Err(Error::Timeout);
    }
    tracing::trace!(want = buf.len(), got = filled, "receive_exact");
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Delivers queued chunks one per `receive()` call.
    struct Chunked {
        chunks: VecDeque<Vec<u8>>,
    }

    #[async_trait]
    impl Transport for Chunked {
        async fn send(&mut self, data: &[u8]) -> Result<usize> {
            Ok(data.len())
        }

        async fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
            match self.chunks.pop_front() {
                Some(chunk) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    Ok(n)
                }
                None => Err(Error::Timeout),
            }
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }

        fn is_connected(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn gathers_split_reply() {
        let mut t = Chunked {
            chunks: VecDeque::from(vec![vec![0x03], vec![0x30, 0x63]]),
        };
        let mut buf = [0u8; 3];
        let n = receive_exact(&mut t, &mut buf, Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(buf, [0x03, 0x30, 0x63]);
    }

    #[tokio::test]
    async fn partial_reply_is_short_count() {
        let mut t = Chunked {
            chunks: VecDeque::from(vec![vec![0x03]]),
        };
        let mut buf = [0u8; 3];
        let n = receive_exact(&mut t, &mut buf, Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(n, 1);
    }

    #[tokio::test]
    async fn silence_is_timeout() {
        let mut t = Chunked {
            chunks: VecDeque::new(),
        };
        let mut buf = [0u8; 1];
        let result = receive_exact(&mut t, &mut buf, Duration::from_millis(50)).await;
        assert!(matches!(result, Err(Error::Timeout)));
    }
}
