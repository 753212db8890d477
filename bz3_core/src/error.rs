use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Error type shared by every component of the container engine.
///
/// Errors fall into three groups:
///
/// - **Data errors** ([`Error::Format`], [`Error::TruncatedStream`],
///   [`Error::CorruptData`]): the bytes being decoded are not a valid
///   container, or the block primitive rejected a block.
/// - **Setup errors** ([`Error::Resource`], [`Error::InvalidArgument`],
///   [`Error::BufferTooSmall`]): the engine could not be built or the caller
///   handed it something unusable.
/// - **State and I/O** ([`Error::Finished`], [`Error::Io`]).
///
/// `Clone`, so a compressor or decompressor can keep the failure that made
/// it unusable and hand it back on every later call.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Bad magic, short header, block size out of range, or a frame header
    /// that cannot belong to the stream.
    #[error("invalid BZ3 container: {0}")]
    Format(String),

    /// A frame header or payload was cut short at the forced end of input.
    #[error("truncated stream: {0}")]
    TruncatedStream(String),

    /// The block primitive failed, or produced a block of the wrong size.
    #[error("corrupt data in block {block}: {reason}")]
    CorruptData { block: u64, reason: String },

    /// A primitive handle, scratch buffer or worker pool could not be allocated.
    #[error("resource allocation failed: {0}")]
    Resource(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("output buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    /// The instance was finalized by `flush`/`finish` and accepts no more input.
    #[error("stream already finished")]
    Finished,

    #[error("I/O error: {0}")]
    Io(#[source] Arc<io::Error>),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn corrupt(block: u64, reason: impl std::fmt::Display) -> Self {
        Error::CorruptData {
            block,
            reason: reason.to_string(),
        }
    }

    /// True for errors caused by the bytes being decoded rather than by the
    /// environment or the caller.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Error::Format(_) | Error::TruncatedStream(_) | Error::CorruptData { .. }
        )
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(Arc::new(e))
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        let kind = match &e {
            Error::Io(inner) => inner.kind(),
            Error::Format(_) | Error::CorruptData { .. } => io::ErrorKind::InvalidData,
            Error::TruncatedStream(_) => io::ErrorKind::UnexpectedEof,
            Error::Resource(_) => io::ErrorKind::OutOfMemory,
            Error::InvalidArgument(_) | Error::BufferTooSmall { .. } => {
                io::ErrorKind::InvalidInput
            }
            Error::Finished => io::ErrorKind::Other,
        };
        io::Error::new(kind, e)
    }
}
