use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{Instant, sleep_until, timeout_at};
use tracing::{debug, trace};

use crate::protocol::ConnError;

/// Capacity of the per-connection read buffer.
///
/// Bounds the length of a single request line or header line.
pub const BUFFER_SIZE: usize = 4 * 1024;

/// Chunk size used by [`Connection::write_from_reader`] when the caller
/// passes zero.
pub const DEFAULT_TRANSFER_CHUNK: usize = 16 * 1024;

/// A connected byte stream the engine can serve.
pub trait Channel: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> Channel for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// A channel with a fixed read buffer and per-phase byte counters.
///
/// Unread input lives in `buffer[buffer_pos..buffer_size]`. Writes are not
/// buffered; every [`write`](Connection::write) goes straight to the channel.
pub struct Connection {
    channel: Box<dyn Channel>,
    peer: SocketAddr,
    buffer: Box<[u8]>,
    buffer_pos: usize,
    buffer_size: usize,
    in_bytes: u64,
    out_bytes: u64,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.peer)
            .field("buffer_pos", &self.buffer_pos)
            .field("buffer_size", &self.buffer_size)
            .field("in_bytes", &self.in_bytes)
            .field("out_bytes", &self.out_bytes)
            .finish_non_exhaustive()
    }
}

impl Connection {
    pub fn new<C: Channel + 'static>(channel: C, peer: SocketAddr) -> Self {
        Self {
            channel: Box::new(channel),
            peer,
            buffer: vec![0u8; BUFFER_SIZE].into_boxed_slice(),
            buffer_pos: 0,
            buffer_size: 0,
            in_bytes: 0,
            out_bytes: 0,
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Bytes read from the channel since the last [`read_init`](Self::read_init).
    pub fn in_bytes(&self) -> u64 {
        self.in_bytes
    }

    /// Bytes written to the channel since the last [`read_init`](Self::read_init).
    pub fn out_bytes(&self) -> u64 {
        self.out_bytes
    }

    /// Starts a new read phase: moves unread bytes to the front of the buffer
    /// and resets the byte counters.
    pub fn read_init(&mut self) {
        self.compact();
        self.in_bytes = 0;
        self.out_bytes = 0;
    }

    /// Moves unread bytes to offset zero.
    pub fn compact(&mut self) {
        if self.buffer_pos == 0 {
            return;
        }
        self.buffer.copy_within(self.buffer_pos..self.buffer_size, 0);
        self.buffer_size -= self.buffer_pos;
        self.buffer_pos = 0;
    }

    /// Waits up to `timeout` for more input, see [`read_until`](Self::read_until).
    pub async fn read(&mut self, timeout: Duration) -> Result<usize, ConnError> {
        self.read_until(Instant::now() + timeout).await
    }

    /// Appends whatever the channel delivers next to the buffer, waiting no
    /// later than `deadline`.
    ///
    /// A full buffer is compacted first; if it is full of unread bytes the
    /// read fails with [`ConnError::BufferFull`]. End of stream is reported as
    /// [`ConnError::Closed`].
    pub async fn read_until(&mut self, deadline: Instant) -> Result<usize, ConnError> {
        if self.buffer_size == self.buffer.len() {
            if self.buffer_pos == 0 {
                return Err(ConnError::BufferFull { capacity: self.buffer.len() });
            }
            self.compact();
        }

        let free = &mut self.buffer[self.buffer_size..];
        let n = match timeout_at(deadline, self.channel.read(free)).await {
            Err(_) => return Err(ConnError::Timeout),
            Ok(Err(e)) => return Err(ConnError::io(e)),
            Ok(Ok(0)) => return Err(ConnError::Closed),
            Ok(Ok(n)) => n,
        };

        trace!(peer = %self.peer, read = n, "filled read buffer");
        self.buffer_size += n;
        self.in_bytes += n as u64;
        Ok(n)
    }

    /// Unread bytes currently held in the buffer.
    #[inline]
    pub fn buffered(&self) -> &[u8] {
        &self.buffer[self.buffer_pos..self.buffer_size]
    }

    #[inline]
    pub fn bytes_available(&self) -> usize {
        self.buffer_size - self.buffer_pos
    }

    /// Marks `n` buffered bytes as read.
    pub fn consume(&mut self, n: usize) {
        self.buffer_pos = (self.buffer_pos + n).min(self.buffer_size);
    }

    /// Removes up to `max` buffered bytes and returns them.
    pub fn take(&mut self, max: usize) -> Bytes {
        let n = max.min(self.bytes_available());
        let taken = Bytes::copy_from_slice(&self.buffer[self.buffer_pos..self.buffer_pos + n]);
        self.buffer_pos += n;
        taken
    }

    /// Sends all of `data` and flushes the channel.
    pub async fn write(&mut self, data: &[u8]) -> Result<(), ConnError> {
        if data.is_empty() {
            return Ok(());
        }
        self.channel.write_all(data).await?;
        self.channel.flush().await?;
        self.out_bytes += data.len() as u64;
        Ok(())
    }

    /// Copies `len` bytes starting at `start` from `reader` to the channel in
    /// pieces of at most `chunk_size` bytes.
    ///
    /// With a `rate` in bytes per second, sleeps between pieces so that the
    /// transfer never runs ahead of it. Returns the number of bytes sent.
    pub async fn write_from_reader<R>(&mut self, reader: &mut R, start: u64, len: u64, chunk_size: usize, rate: Option<u64>) -> Result<u64, ConnError>
    where
        R: AsyncRead + AsyncSeek + Unpin + ?Sized,
    {
        let chunk_size = if chunk_size == 0 { DEFAULT_TRANSFER_CHUNK } else { chunk_size };
        reader.seek(std::io::SeekFrom::Start(start)).await?;

        let began = Instant::now();
        let mut piece = vec![0u8; chunk_size];
        let mut sent = 0u64;

        while sent < len {
            let want = usize::try_from(len - sent).map_or(chunk_size, |remaining| remaining.min(chunk_size));
            let n = reader.read(&mut piece[..want]).await?;
            if n == 0 {
                return Err(ConnError::io(std::io::Error::from(std::io::ErrorKind::UnexpectedEof)));
            }

            self.write(&piece[..n]).await?;
            sent += n as u64;

            if let Some(rate) = rate {
                pace(began, sent, rate).await;
            }
        }

        debug!(peer = %self.peer, sent, "transfer complete");
        Ok(sent)
    }

    /// Shuts the write half down. Errors are ignored, the peer may already
    /// be gone.
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.channel.shutdown().await {
            trace!(peer = %self.peer, cause = %e, "shutdown failed");
        }
    }
}

/// Sleeps until `sent` bytes are due at `rate` bytes per second after `began`.
async fn pace(began: Instant, sent: u64, rate: u64) {
    if rate == 0 {
        return;
    }
    let due = Duration::from_secs_f64(sent as f64 / rate as f64);
    let at = began + due;
    if at > Instant::now() {
        sleep_until(at).await;
    }
}
