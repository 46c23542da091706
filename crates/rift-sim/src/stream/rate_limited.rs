//! Read throttling for simulated slow transfers.
//!
//! The stream releases bytes on a schedule derived from the target bit rate
//! and the time elapsed since the first read: after `t` seconds at most
//! `t * bit_rate / 8` bytes have been handed out. Reads that arrive ahead of
//! schedule sleep until the next byte is due.
//!
//! Byte accounting is derived from the position in the source, so the
//! source must be seekable. Seeking restarts the schedule at the new
//! position.

use super::bit_rate::BitRate;
use crate::error::StreamError;
use std::future::Future;
use std::io::{self, SeekFrom};
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncSeek, AsyncSeekExt, ReadBuf};
use tokio::time::{Instant, Sleep};
use tracing::debug;

/// Lowest accepted bit rate. Anything slower is effectively a stalled
/// transfer.
pub const MIN_BIT_RATE: u64 = 128;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Bytes that may have been released after `elapsed`.
fn bytes_due(elapsed: Duration, bit_rate: u64) -> u64 {
    (elapsed.as_nanos() * u128::from(bit_rate) / (8 * NANOS_PER_SEC)) as u64
}

/// Earliest offset from the start of the window at which `bytes` are due.
fn time_for_bytes(bytes: u64, bit_rate: u64) -> Duration {
    let bits_nanos = u128::from(bytes) * 8 * NANOS_PER_SEC;
    let rate = u128::from(bit_rate);
    Duration::from_nanos(bits_nanos.div_ceil(rate) as u64)
}

/// Decorates a seekable source, limiting read throughput to a bit rate.
pub struct RateLimitedStream<S> {
    inner: S,
    bit_rate: u64,
    started: Option<Instant>,
    origin: u64,
    position: u64,
    end: Option<u64>,
    seeking: bool,
    delay: Option<Pin<Box<Sleep>>>,
    scratch: Vec<u8>,
}

impl<S> RateLimitedStream<S>
where
    S: AsyncRead + AsyncSeek + Unpin,
{
    /// Wrap `inner`.
    ///
    /// Fails with [`StreamError::InvalidArgument`] below [`MIN_BIT_RATE`] and
    /// with [`StreamError::Unsupported`] when the source cannot report its
    /// position.
    pub async fn new(mut inner: S, bit_rate: impl Into<BitRate>) -> Result<Self, StreamError> {
        let bit_rate = bit_rate.into().as_u64();
        if bit_rate < MIN_BIT_RATE {
            return Err(StreamError::InvalidArgument {
                name: "bit_rate",
                reason: format!(
                    "must be at least {MIN_BIT_RATE} bits per second, got {bit_rate}"
                ),
            });
        }

        let position = inner.seek(SeekFrom::Current(0)).await.map_err(|e| {
            StreamError::Unsupported(format!("rate limiting requires a seekable source: {e}"))
        })?;

        // Reads at or past the construction-time length report end of
        // source immediately.
        let end = match inner.seek(SeekFrom::End(0)).await {
            Ok(end) => {
                inner.seek(SeekFrom::Start(position)).await?;
                Some(end)
            }
            Err(_) => None,
        };

        debug!("Rate limiting stream at {} bit/s from offset {}", bit_rate, position);

        Ok(Self {
            inner,
            bit_rate,
            started: None,
            origin: position,
            position,
            end,
            seeking: false,
            delay: None,
            scratch: Vec::new(),
        })
    }

    pub fn bit_rate(&self) -> BitRate {
        BitRate(self.bit_rate)
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn restart(&mut self, position: u64) {
        self.origin = position;
        self.position = position;
        self.started = None;
        self.delay = None;
    }
}

impl<S> AsyncRead for RateLimitedStream<S>
where
    S: AsyncRead + AsyncSeek + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        if this.end.is_some_and(|end| this.position >= end) {
            return Poll::Ready(Ok(()));
        }

        loop {
            if let Some(delay) = this.delay.as_mut() {
                ready!(delay.as_mut().poll(cx));
                this.delay = None;
            }

            let started = *this.started.get_or_insert_with(Instant::now);
            let released = this.position - this.origin;
            let allowance = bytes_due(started.elapsed(), this.bit_rate).saturating_sub(released);

            if allowance > 0 {
                let limit = allowance.min(buf.remaining() as u64) as usize;
                if this.scratch.len() < limit {
                    this.scratch.resize(limit, 0);
                }
                let mut limited = ReadBuf::new(&mut this.scratch[..limit]);
                ready!(Pin::new(&mut this.inner).poll_read(cx, &mut limited))?;
                let filled = limited.filled();
                buf.put_slice(filled);
                this.position += filled.len() as u64;
                return Poll::Ready(Ok(()));
            }

            let due_at = started + time_for_bytes(released + 1, this.bit_rate);
            this.delay = Some(Box::pin(tokio::time::sleep_until(due_at)));
        }
    }
}

impl<S> AsyncSeek for RateLimitedStream<S>
where
    S: AsyncRead + AsyncSeek + Unpin,
{
    fn start_seek(self: Pin<&mut Self>, position: SeekFrom) -> io::Result<()> {
        let this = self.get_mut();
        Pin::new(&mut this.inner).start_seek(position)?;
        this.seeking = true;
        Ok(())
    }

    fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        let this = self.get_mut();
        let position = ready!(Pin::new(&mut this.inner).poll_complete(cx))?;
        if std::mem::take(&mut this.seeking) && position != this.position {
            this.restart(position);
        }
        Poll::Ready(Ok(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::AsyncReadExt;

    /// Readable source that refuses to seek.
    struct Forward(Cursor<Vec<u8>>);

    impl AsyncRead for Forward {
        fn poll_read(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Pin::new(&mut self.0).poll_read(cx, buf)
        }
    }

    impl AsyncSeek for Forward {
        fn start_seek(self: Pin<&mut Self>, _position: SeekFrom) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Unsupported, "not seekable"))
        }

        fn poll_complete(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
            Poll::Ready(Ok(0))
        }
    }

    #[test]
    fn test_schedule_math() {
        assert_eq!(bytes_due(Duration::from_secs(1), 8_000), 1_000);
        assert_eq!(bytes_due(Duration::from_millis(999), 8), 0);
        assert_eq!(time_for_bytes(1_000, 8_000), Duration::from_secs(1));
        assert_eq!(time_for_bytes(1, 3_000), Duration::from_nanos(2_666_667));
        let due = time_for_bytes(7, 3_000);
        assert!(bytes_due(due, 3_000) >= 7);
    }

    #[tokio::test]
    async fn test_rejects_low_bit_rate() {
        let result = RateLimitedStream::new(Cursor::new(vec![0u8; 4]), MIN_BIT_RATE - 1).await;
        assert!(matches!(
            result,
            Err(StreamError::InvalidArgument { name: "bit_rate", .. })
        ));
        assert!(RateLimitedStream::new(Cursor::new(vec![0u8; 4]), MIN_BIT_RATE)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_rejects_non_seekable_source() {
        let result = RateLimitedStream::new(Forward(Cursor::new(vec![1, 2, 3])), 8_000).await;
        assert!(matches!(result, Err(StreamError::Unsupported(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_duration_follows_bit_rate() {
        let data: Vec<u8> = (0..1_000u32).map(|i| (i % 251) as u8).collect();
        let mut stream = RateLimitedStream::new(Cursor::new(data.clone()), 8_000)
            .await
            .unwrap();

        let start = Instant::now();
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(out, data);
        assert!(elapsed >= Duration::from_secs(1), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(1_050), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_of_source_returns_without_waiting() {
        let mut stream = RateLimitedStream::new(Cursor::new(vec![1u8; 16]), MIN_BIT_RATE)
            .await
            .unwrap();

        let start = Instant::now();
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(out.len(), 16);
        assert!(elapsed >= Duration::from_secs(1), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(1_010), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_starts_at_current_offset() {
        let mut source = Cursor::new(b"abcdef".to_vec());
        source.set_position(4);
        let mut stream = RateLimitedStream::new(source, 8_000).await.unwrap();
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"ef");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reads_never_exceed_schedule() {
        let mut stream = RateLimitedStream::new(Cursor::new(vec![7u8; 4_000]), 16_000)
            .await
            .unwrap();
        let start = Instant::now();
        let mut total = 0u64;
        let mut buffer = [0u8; 512];
        loop {
            let read = stream.read(&mut buffer).await.unwrap();
            if read == 0 {
                break;
            }
            total += read as u64;
            assert!(total <= bytes_due(start.elapsed(), 16_000));
        }
        assert_eq!(total, 4_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_seek_restarts_window() {
        let mut stream = RateLimitedStream::new(Cursor::new(b"abcdef".to_vec()), 800)
            .await
            .unwrap();
        let mut first = Vec::new();
        stream.read_to_end(&mut first).await.unwrap();
        assert_eq!(first, b"abcdef");

        let position = stream.seek(SeekFrom::Start(2)).await.unwrap();
        assert_eq!(position, 2);

        let start = Instant::now();
        let mut rest = Vec::new();
        stream.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest, b"cdef");
        assert!(start.elapsed() >= Duration::from_millis(40));
    }
}
