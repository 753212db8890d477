use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, trace};

use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::worker::BlockWorker;

/// One complete frame borrowed from the decompressor's input buffer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameRef<'a> {
    pub payload: &'a [u8],
    pub original_size: usize,
}

/// Order-preserving fan-out of block work across workers.
///
/// Owns one [`BlockWorker`] per thread. A batch never holds more items than
/// there are workers, so each item gets a worker to itself for its whole
/// lifetime. Results land in per-index slots and are appended to the
/// caller's buffer only after every item of the batch has succeeded.
pub(crate) struct BlockPool {
    workers: Vec<BlockWorker>,
    /// Present only when there is more than one worker.
    threads: Option<ThreadPool>,
}

impl BlockPool {
    pub(crate) fn new(codec: &dyn Codec, block_size: u32, threads: usize) -> Result<Self> {
        let workers = (0..threads)
            .map(|_| BlockWorker::new(codec, block_size))
            .collect::<Result<Vec<_>>>()?;
        let threads = if workers.len() > 1 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(workers.len())
                .thread_name(|i| format!("bz3-block-{}", i))
                .build()
                .map_err(|e| Error::Resource(format!("block worker threads: {}", e)))?;
            Some(pool)
        } else {
            None
        };
        debug!(
            codec = codec.name(),
            block_size,
            workers = workers.len(),
            "block pool ready"
        );
        Ok(Self { workers, threads })
    }

    /// Maximum number of items a single batch may carry.
    pub(crate) fn width(&self) -> usize {
        self.workers.len()
    }

    /// Encode `blocks` (at most `width()` of them) and append their frames to
    /// `out` in input order.
    pub(crate) fn encode_batch(
        &mut self,
        first_seq: u64,
        blocks: &[&[u8]],
        out: &mut Vec<u8>,
    ) -> Result<()> {
        debug_assert!(blocks.len() <= self.workers.len());
        let before = out.len();
        match &self.threads {
            None => {
                let worker = &mut self.workers[0];
                for (i, raw) in blocks.iter().enumerate() {
                    if let Err(e) = worker.encode_frame(first_seq + i as u64, raw, out) {
                        out.truncate(before);
                        return Err(e);
                    }
                }
            }
            Some(pool) => {
                let workers = &mut self.workers[..blocks.len()];
                let slots: Vec<Result<Vec<u8>>> = pool.install(|| {
                    workers
                        .par_iter_mut()
                        .zip(blocks.par_iter())
                        .enumerate()
                        .map(|(i, (worker, raw))| {
                            let mut frame = Vec::new();
                            worker.encode_frame(first_seq + i as u64, raw, &mut frame)?;
                            Ok(frame)
                        })
                        .collect()
                });
                let frames = slots.into_iter().collect::<Result<Vec<_>>>()?;
                for frame in &frames {
                    out.extend_from_slice(frame);
                }
            }
        }
        trace!(first_seq, blocks = blocks.len(), bytes = out.len() - before, "encoded batch");
        Ok(())
    }

    /// Decode `frames` (at most `width()` of them) and append the decoded
    /// bytes to `out` in frame order.
    pub(crate) fn decode_batch(
        &mut self,
        first_seq: u64,
        frames: &[FrameRef<'_>],
        out: &mut Vec<u8>,
    ) -> Result<()> {
        debug_assert!(frames.len() <= self.workers.len());
        let before = out.len();
        match &self.threads {
            None => {
                let worker = &mut self.workers[0];
                for (i, frame) in frames.iter().enumerate() {
                    let seq = first_seq + i as u64;
                    if let Err(e) = worker.decode_payload(seq, frame.payload, frame.original_size, out) {
                        out.truncate(before);
                        return Err(e);
                    }
                }
            }
            Some(pool) => {
                let workers = &mut self.workers[..frames.len()];
                let slots: Vec<Result<Vec<u8>>> = pool.install(|| {
                    workers
                        .par_iter_mut()
                        .zip(frames.par_iter())
                        .enumerate()
                        .map(|(i, (worker, frame))| {
                            let mut block = Vec::with_capacity(frame.original_size);
                            worker.decode_payload(
                                first_seq + i as u64,
                                frame.payload,
                                frame.original_size,
                                &mut block,
                            )?;
                            Ok(block)
                        })
                        .collect()
                });
                let blocks = slots.into_iter().collect::<Result<Vec<_>>>()?;
                for block in &blocks {
                    out.extend_from_slice(block);
                }
            }
        }
        trace!(first_seq, frames = frames.len(), bytes = out.len() - before, "decoded batch");
        Ok(())
    }
}
