use std::sync::Arc;

use tracing::{debug, warn};

use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::format::{decode_header, peek_frame_header, FRAME_HEADER_SIZE, HEADER_SIZE};
use crate::options::DecompressOptions;
use crate::parallel::{BlockPool, FrameRef};

/// Everything that only exists once the header has been parsed.
struct Stream {
    block_size: u32,
    max_payload: usize,
    pool: BlockPool,
}

/// Incremental BZ3v1 decompressor.
///
/// Feed container bytes in chunks of any size through
/// [`decompress`](Self::decompress); each call returns the bytes of every
/// frame that became complete. Partial headers, partial frame headers and
/// partial payloads are buffered until the next call, so the concatenated
/// output never depends on where the input was split.
///
/// The container has no terminator. When the caller knows the input is
/// exhausted it calls [`finish`](Self::finish), which decides (according to
/// [`DecompressOptions::strict`]) whether leftover bytes are an error or
/// [`unused_data`](Self::unused_data).
pub struct Decompressor {
    codec: Arc<dyn Codec>,
    options: DecompressOptions,
    /// `None` until the 9 header bytes have been seen.
    stream: Option<Stream>,
    /// Stream state kept across `reset`, reused if the next header declares
    /// the same block size.
    spare: Option<Stream>,
    /// Undigested input. After the logical end of the stream this is the
    /// unused data.
    pending: Vec<u8>,
    /// Set once a frame header failed validation in lenient mode, or at
    /// `finish` with leftover bytes.
    ended: bool,
    finished: bool,
    failure: Option<Error>,
    frames_read: u64,
}

impl Decompressor {
    /// Single-threaded, lenient decompressor.
    pub fn new(codec: Arc<dyn Codec>) -> Result<Self> {
        Self::with_options(codec, DecompressOptions::default())
    }

    pub fn with_options(codec: Arc<dyn Codec>, options: DecompressOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            codec,
            options,
            stream: None,
            spare: None,
            pending: Vec::new(),
            ended: false,
            finished: false,
            failure: None,
            frames_read: 0,
        })
    }

    /// Block size declared by the header, once it has been parsed.
    pub fn block_size(&self) -> Option<u32> {
        self.stream.as_ref().map(|s| s.block_size)
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The failure that made this decompressor unusable, if any.
    pub fn last_error(&self) -> Option<&Error> {
        self.failure.as_ref()
    }

    /// Bytes that are not part of any frame decoded so far.
    ///
    /// Only meaningful once the caller has fed the whole input and called
    /// [`finish`](Self::finish); before that it includes the partial frame
    /// still being assembled. Empty while the header is incomplete.
    pub fn unused_data(&self) -> &[u8] {
        if self.stream.is_some() {
            &self.pending
        } else {
            &[]
        }
    }

    /// Return to the freshly constructed state, discarding buffered input,
    /// counters and any recorded failure.
    ///
    /// The worker pool is kept and reused when the next header declares the
    /// same block size.
    pub fn reset(&mut self) {
        if let Some(stream) = self.stream.take() {
            self.spare = Some(stream);
        }
        self.pending.clear();
        self.ended = false;
        self.finished = false;
        self.failure = None;
        self.frames_read = 0;
    }

    /// Feed `chunk` and return the bytes decoded from it.
    pub fn decompress(&mut self, chunk: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.decompress_to(chunk, &mut out)?;
        Ok(out)
    }

    /// Like [`decompress`](Self::decompress), appending to `out` instead.
    ///
    /// Returns the number of bytes appended. On error, bytes of frames that
    /// were decoded before the failing one stay in `out`.
    pub fn decompress_to(&mut self, chunk: &[u8], out: &mut Vec<u8>) -> Result<usize> {
        self.check_usable()?;
        let before = out.len();
        self.pending.extend_from_slice(chunk);
        if self.ended {
            return Ok(0);
        }
        let result = self.drain_frames(out);
        self.record(result)?;
        Ok(out.len() - before)
    }

    /// Declare the input exhausted.
    ///
    /// An incomplete header is always a format error. An incomplete trailing
    /// frame is a [`Error::TruncatedStream`] in strict mode and unused data
    /// otherwise.
    pub fn finish(&mut self) -> Result<()> {
        self.check_usable()?;
        self.finished = true;
        let result = if self.stream.is_none() {
            Err(Error::Format(format!(
                "header too short: input ended after {} of {} bytes",
                self.pending.len(),
                HEADER_SIZE
            )))
        } else if !self.ended && !self.pending.is_empty() {
            if self.options.strict {
                Err(Error::TruncatedStream(format!(
                    "{} bytes of an incomplete frame after frame {}",
                    self.pending.len(),
                    self.frames_read
                )))
            } else {
                warn!(
                    bytes = self.pending.len(),
                    frames = self.frames_read,
                    "input ended inside a frame, keeping the tail as unused data"
                );
                self.ended = true;
                Ok(())
            }
        } else {
            Ok(())
        };
        debug!(frames = self.frames_read, unused = self.pending.len(), "decompressor finished");
        self.record(result)
    }

    fn drain_frames(&mut self, out: &mut Vec<u8>) -> Result<()> {
        if self.stream.is_none() {
            if self.pending.len() < HEADER_SIZE {
                return Ok(());
            }
            let block_size = decode_header(&self.pending[..HEADER_SIZE])?;
            let stream = match self.spare.take() {
                Some(spare) if spare.block_size == block_size => spare,
                _ => Stream {
                    block_size,
                    max_payload: self.codec.max_compressed_len(block_size as usize),
                    pool: BlockPool::new(self.codec.as_ref(), block_size, self.options.threads)?,
                },
            };
            debug!(block_size, threads = self.options.threads, "parsed header");
            self.stream = Some(stream);
            self.pending.drain(..HEADER_SIZE);
        }
        let Some(stream) = self.stream.as_mut() else {
            return Ok(());
        };

        let mut cursor = 0;
        let mut result = Ok(());
        while !self.ended {
            let mut frames = Vec::with_capacity(stream.pool.width());
            let mut end = cursor;
            while frames.len() < stream.pool.width() {
                let Some(header) = peek_frame_header(&self.pending[end..]) else {
                    break;
                };
                if let Err(e) = header.validate(stream.block_size, stream.max_payload) {
                    if self.options.strict {
                        result = Err(e);
                    } else {
                        warn!(
                            error = %e,
                            frames = self.frames_read + frames.len() as u64,
                            "bytes after the last frame do not form a frame, treating them as unused data"
                        );
                        self.ended = true;
                    }
                    break;
                }
                let frame_end = end + header.frame_len();
                if self.pending.len() < frame_end {
                    break;
                }
                frames.push(FrameRef {
                    payload: &self.pending[end + FRAME_HEADER_SIZE..frame_end],
                    original_size: header.original_size as usize,
                });
                end = frame_end;
            }
            if frames.is_empty() {
                break;
            }
            if let Err(e) = stream.pool.decode_batch(self.frames_read, &frames, out) {
                result = Err(e);
                break;
            }
            self.frames_read += frames.len() as u64;
            cursor = end;
            if result.is_err() {
                break;
            }
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
