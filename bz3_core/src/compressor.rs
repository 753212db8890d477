use std::sync::Arc;

use tracing::debug;

use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::format::encode_header;
use crate::options::CompressOptions;
use crate::parallel::BlockPool;

/// Incremental BZ3v1 compressor.
///
/// # Write contract
/// Call [`compress`](Self::compress) any number of times with arbitrary-sized
/// byte slices and forward whatever it returns to the sink. The very first
/// call emits the 9-byte header, even when the slice is empty. Every time
/// `block_size` raw bytes have been gathered, one frame is emitted. Call
/// [`flush`](Self::flush) once at the end to emit the last, shorter frame.
///
/// # Output layout
/// ```text
/// [HEADER: "BZ3v1" + block_size]
/// [FRAME 0] [FRAME 1] ... [FRAME N-1]      ← all but the last hold block_size raw bytes
/// ```
///
/// With `threads > 1`, up to `threads` full blocks are encoded concurrently;
/// the frames still come out in input order.
pub struct Compressor {
    block_size: usize,
    pool: BlockPool,
    /// Pending raw bytes not yet turned into a frame.
    pending: Vec<u8>,
    header_written: bool,
    finished: bool,
    failure: Option<Error>,
    frames_written: u64,
}

impl Compressor {
    /// Single-threaded compressor with the given block size.
    pub fn new(codec: Arc<dyn Codec>, block_size: u32) -> Result<Self> {
        Self::with_options(codec, CompressOptions::default().with_block_size(block_size))
    }

    pub fn with_options(codec: Arc<dyn Codec>, options: CompressOptions) -> Result<Self> {
        options.validate()?;
        let pool = BlockPool::new(codec.as_ref(), options.block_size, options.threads)?;
        Ok(Self {
            block_size: options.block_size as usize,
            pool,
            pending: Vec::new(),
            header_written: false,
            finished: false,
            failure: None,
            frames_written: 0,
        })
    }

    pub fn block_size(&self) -> u32 {
        self.block_size as u32
    }

    /// Number of frames emitted so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// The failure that made this compressor unusable, if any.
    pub fn last_error(&self) -> Option<&Error> {
        self.failure.as_ref()
    }

    /// Buffer `chunk` and return the container bytes that became ready.
    pub fn compress(&mut self, chunk: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.compress_to(chunk, &mut out)?;
        Ok(out)
    }

    /// Like [`compress`](Self::compress), appending to `out` instead.
    pub fn compress_to(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> Result<()> {
        self.check_usable()?;
        self.write_header(out);
        self.pending.extend_from_slice(chunk);
        let result = self.drain_full_blocks(out);
        self.record(result)
    }

    /// Emit the final frame (if any raw bytes remain) and finalize.
    pub fn flush(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.flush_to(&mut out)?;
        Ok(out)
    }

    /// Like [`flush`](Self::flush), appending to `out` instead.
    pub fn flush_to(&mut self, out: &mut Vec<u8>) -> Result<()> {
        self.check_usable()?;
        self.write_header(out);
        let result = if self.pending.is_empty() {
            Ok(())
        } else {
            let remaining = std::mem::take(&mut self.pending);
            self.pool
                .encode_batch(self.frames_written, &[remaining.as_slice()], out)
                .map(|()| self.frames_written += 1)
        };
        self.finished = true;
        debug!(frames = self.frames_written, "compressor finished");
        self.record(result)
    }

    fn write_header(&mut self, out: &mut Vec<u8>) {
        if !self.header_written {
            out.extend_from_slice(&encode_header(self.block_size as u32));
            self.header_written = true;
            debug!(block_size = self.block_size, threads = self.pool.width(), "wrote header");
        }
    }

    /// Encode every complete block in `pending`, up to `width` at a time, and
    /// evict the consumed prefix.
    fn drain_full_blocks(&mut self, out: &mut Vec<u8>) -> Result<()> {
        let mut cursor = 0;
        let mut result = Ok(());
        while self.pending.len() - cursor >= self.block_size {
            let full = (self.pending.len() - cursor) / self.block_size;
            let take = full.min(self.pool.width());
            let end = cursor + take * self.block_size;
            let blocks: Vec<&[u8]> = self.pending[cursor..end].chunks(self.block_size).collect();
            result = self.pool.encode_batch(self.frames_written, &blocks, out);
            if result.is_err() {
                break;
            }
            self.frames_written += take as u64;
            cursor = end;
        }
        self.pending.drain(..cursor);
        result
    }

    fn check_usable(&self) -> Result<()> {
        if let Some(e) = &self.failure {
            return Err(e.clone());
        }
        if self.finished {
            return Err(Error::Finished);
        }
        Ok(())
    }

    fn record(&mut self, result: Result<()>) -> Result<()> {
        if let Err(e) = &result {
            self.failure = Some(e.clone());
        }
        result
    }
}
