use std::io::{self, Write};
use std::sync::Arc;

use crate::codec::Codec;
use crate::compressor::Compressor;
use crate::error::Result;
use crate::options::CompressOptions;

/// Streaming writer producing a BZ3v1 container on any [`Write`] sink.
///
/// Bytes written are buffered into blocks by an inner [`Compressor`]; frames
/// reach the sink as soon as they are complete. [`finish`](Self::finish)
/// must be called to write the last frame: dropping the writer without it
/// loses the buffered tail.
pub struct Writer<W: Write> {
    inner: W,
    compressor: Compressor,
    /// Reused for the bytes each call hands to the sink.
    out: Vec<u8>,
    bytes_in: u64,
}

impl<W: Write> Writer<W> {
    pub fn new(inner: W, codec: Arc<dyn Codec>, block_size: u32) -> Result<Self> {
        Self::with_options(inner, codec, CompressOptions::default().with_block_size(block_size))
    }

    pub fn with_options(inner: W, codec: Arc<dyn Codec>, options: CompressOptions) -> Result<Self> {
        Ok(Self {
            inner,
            compressor: Compressor::with_options(codec, options)?,
            out: Vec::new(),
            bytes_in: 0,
        })
    }

    /// Uncompressed bytes accepted so far.
    pub fn bytes_in(&self) -> u64 {
        self.bytes_in
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Write the final frame, flush the sink and hand it back.
    pub fn finish(mut self) -> Result<W> {
        self.out.clear();
        let result = self.compressor.flush_to(&mut self.out);
        self.inner.write_all(&self.out)?;
        self.inner.flush()?;
        result?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for Writer<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.out.clear();
        // frames finished before a failing block still reach the sink
        let result = self.compressor.compress_to(buf, &mut self.out);
        self.inner.write_all(&self.out)?;
        result?;
        self.bytes_in += buf.len() as u64;
        Ok(buf.len())
    }

    /// Flushes the sink only; a partial block stays buffered until `finish`.
    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
