use std::io::{self, BufRead, Read, Seek, SeekFrom};
use std::sync::Arc;

use tracing::debug;

use crate::codec::Codec;
use crate::decompressor::Decompressor;
use crate::error::Result;
use crate::options::DecompressOptions;

/// Compressed bytes pulled from the source per refill.
const READ_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    /// Nothing read from the source since construction or the last rewind.
    Unstarted,
    Streaming,
    /// Source exhausted and the decompressor finished; the size is known.
    Eof,
}

/// Decompressing reader over a BZ3v1 container.
///
/// Implements [`Read`] and [`BufRead`] for any byte source, and [`Seek`]
/// when the source itself is seekable. Positions are offsets into the
/// *decompressed* stream.
///
/// # Seeking
/// Frame boundaries are only known by decoding, so seeking is emulated:
/// - forward: decode and discard up to the target;
/// - backward: seek the source back to offset 0, replace the decompressor
///   with a fresh one, then decode and discard up to the target;
/// - from the end: decode to the end once to learn the total size (cached
///   afterwards), then proceed as above.
///
/// A target past the end leaves the reader at the end; the returned offset
/// is always the actual position.
pub struct Reader<R> {
    inner: R,
    decompressor: Decompressor,
    /// Decoded bytes not yet handed out: `decoded[consumed..]`.
    decoded: Vec<u8>,
    consumed: usize,
    chunk: Vec<u8>,
    pos: u64,
    size: Option<u64>,
    state: ReadState,
}

impl<R: Read> Reader<R> {
    /// Single-threaded, lenient reader.
    pub fn new(inner: R, codec: Arc<dyn Codec>) -> Result<Self> {
        Self::with_options(inner, codec, DecompressOptions::default())
    }

    pub fn with_options(inner: R, codec: Arc<dyn Codec>, options: DecompressOptions) -> Result<Self> {
        Ok(Self {
            inner,
            decompressor: Decompressor::with_options(codec, options)?,
            decoded: Vec::new(),
            consumed: 0,
            chunk: vec![0u8; READ_CHUNK_SIZE],
            pos: 0,
            size: None,
            state: ReadState::Unstarted,
        })
    }

    /// Current offset in the decompressed stream.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Total decompressed size, once the end has been reached at least once.
    pub fn known_size(&self) -> Option<u64> {
        self.size
    }

    /// Trailing bytes after the last frame. Only complete once the end of
    /// the stream has been reached.
    pub fn unused_data(&self) -> &[u8] {
        self.decompressor.unused_data()
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Decode until at least one unread byte is buffered or the source is
    /// exhausted.
    fn refill(&mut self) -> io::Result<()> {
        while self.consumed == self.decoded.len() && self.state != ReadState::Eof {
            self.decoded.clear();
            self.consumed = 0;
            let n = self.inner.read(&mut self.chunk)?;
            if n == 0 {
                self.decompressor.finish()?;
                self.state = ReadState::Eof;
                self.size = Some(self.pos);
                debug!(size = self.pos, "reached end of stream");
                break;
            }
            self.state = ReadState::Streaming;
            self.decompressor
                .decompress_to(&self.chunk[..n], &mut self.decoded)?;
        }
        Ok(())
    }

    /// Read and discard up to `count` bytes; returns how many were skipped.
    fn skip(&mut self, mut count: u64) -> io::Result<u64> {
        let mut skipped = 0;
        while count > 0 {
            let available = self.fill_buf()?.len();
            if available == 0 {
                break;
            }
            let step = available.min(usize::try_from(count).unwrap_or(usize::MAX));
            self.consume(step);
            count -= step as u64;
            skipped += step as u64;
        }
        Ok(skipped)
    }
}

impl<R: Read> Read for Reader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl<R: Read> BufRead for Reader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.refill()?;
        Ok(&self.decoded[self.consumed..])
    }

    fn consume(&mut self, amt: usize) {
        let amt = amt.min(self.decoded.len() - self.consumed);
        self.consumed += amt;
        self.pos += amt as u64;
    }
}

impl<R: Read + Seek> Reader<R> {
    /// Go back to the start of the container with a reset decompressor.
    fn rewind_source(&mut self) -> io::Result<()> {
        debug!(from = self.pos, "rewinding to start of container");
        self.inner.seek(SeekFrom::Start(0))?;
        self.decompressor.reset();
        self.decoded.clear();
        self.consumed = 0;
        self.pos = 0;
        self.state = ReadState::Unstarted;
        Ok(())
    }
}

impl<R: Read + Seek> Seek for Reader<R> {
    fn seek(&mut self, target: SeekFrom) -> io::Result<u64> {
        let target = match target {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
            SeekFrom::End(delta) => {
                let size = match self.size {
                    Some(size) => size,
                    None => {
                        self.skip(u64::MAX)?;
                        self.pos
                    }
                };
                size.checked_add_signed(delta)
            }
        };
        let target = target.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )
        })?;

        if target < self.pos {
            self.rewind_source()?;
        }
        let distance = target - self.pos;
        self.skip(distance)?;
        Ok(self.pos)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.pos)
    }
}
