//! Growable buffer for response bodies of unknown length.
//!
//! # Algorithm
//! ```text
//!            read n > 0, filled < cap
//!           ┌──────────┐
//!           ▼          │
//!       ┌─────────┐────┘  filled == cap   ┌─────────┐
//!  ────▶│ Filling │──────────────────────▶│ Probing │
//!       └─────────┘                        └─────────┘
//!         │    ▲                             │     │
//!   read 0│    │ copy, append probe byte     │ 1   │ 0
//!         │    └──────────┌─────────┐◀───────┘     │
//!         │               │ Growing │              │
//!         ▼               └─────────┘              ▼
//!       ┌──────┐                                ┌──────┐
//!       │ Done │                                │ Done │
//!       └──────┘                                └──────┘
//! ```
//!
//! The response's `content-length` is never consulted. Capacity doubles on
//! growth, so total copying stays linear in the final size, and the output is
//! trimmed to exactly the bytes read.

use axum::body::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Initial capacity: 32 KiB.
pub const INITIAL_CAPACITY: usize = 32 * 1024;

/// Position of the read loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    /// Reading into the free tail of the buffer.
    Filling,
    /// Buffer is exactly full; one more byte decides whether the stream ended.
    Probing,
    /// Probe returned a byte; the buffer must double before it is stored.
    Growing(u8),
    /// End of stream observed.
    Done,
}

/// Byte buffer that doubles when a probe shows the stream continues.
///
/// Invariant: `filled <= capacity` at every transition.
#[derive(Debug)]
pub struct GrowableBuffer {
    buf: Vec<u8>,
    filled: usize,
    state: ReadState,
    growths: u32,
}

impl Default for GrowableBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl GrowableBuffer {
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    /// A zero capacity is bumped to one so the loop can always make progress.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity.max(1)],
            filled: 0,
            state: ReadState::Filling,
            growths: 0,
        }
    }

    pub fn state(&self) -> ReadState {
        self.state
    }

    /// Number of valid bytes held.
    pub fn filled(&self) -> usize {
        self.filled
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// How many times the buffer doubled.
    pub fn growths(&self) -> u32 {
        self.growths
    }

    /// Perform one transition and return the new state.
    ///
    /// Calling this in `Done` is a no-op.
    pub async fn step<R>(&mut self, reader: &mut R) -> std::io::Result<ReadState>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        self.state = match self.state {
            ReadState::Filling => {
                let n = read_retrying(reader, &mut self.buf[self.filled..]).await?;
                if n == 0 {
                    ReadState::Done
                } else {
                    self.filled += n;
                    self.after_fill()
                }
            }
            ReadState::Probing => {
                let mut probe = [0u8; 1];
                match read_retrying(reader, &mut probe).await? {
                    0 => ReadState::Done,
                    _ => ReadState::Growing(probe[0]),
                }
            }
            ReadState::Growing(byte) => {
                let mut grown = vec![0; self.buf.len() * 2];
                grown[..self.filled].copy_from_slice(&self.buf[..self.filled]);
                grown[self.filled] = byte;
                self.buf = grown;
                self.filled += 1;
                self.growths += 1;
                self.after_fill()
            }
            ReadState::Done => ReadState::Done,
        };
        debug_assert!(self.filled <= self.buf.len());
        Ok(self.state)
    }

    /// Run the loop until end of stream. Returns the number of bytes held.
    pub async fn fill_from<R>(&mut self, reader: &mut R) -> std::io::Result<usize>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        while self.state != ReadState::Done {
            self.step(reader).await?;
        }
        Ok(self.filled)
    }

    /// Exactly the first `filled` bytes, with no spare capacity behind them.
    pub fn into_bytes(mut self) -> Bytes {
        self.buf.truncate(self.filled);
        Bytes::from(self.buf.into_boxed_slice())
    }

    fn after_fill(&self) -> ReadState {
        if self.filled == self.buf.len() {
            ReadState::Probing
        } else {
            ReadState::Filling
        }
    }
}

async fn read_retrying<R>(reader: &mut R, dst: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin + ?Sized,
{
    loop {
        match reader.read(dst).await {
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}
