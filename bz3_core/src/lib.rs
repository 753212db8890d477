pub mod codec;
pub mod compressor;
pub mod decompressor;
pub mod error;
pub mod format;
pub mod oneshot;
pub mod options;
pub mod reader;
pub mod writer;

mod parallel;
mod worker;

#[cfg(test)]
mod testing;

pub use codec::{Codec, CodecHandle};
pub use compressor::Compressor;
pub use decompressor::Decompressor;
pub use error::{Error, Result};
pub use format::{DEFAULT_BLOCK_SIZE, HEADER_SIZE, MAGIC, MAX_BLOCK_SIZE, MIN_BLOCK_SIZE};
pub use oneshot::{
    bound, compress, compress_into, compress_stream, decompress, decompress_into,
    decompress_stream, test_stream,
};
pub use options::{CompressOptions, DecompressOptions, MAX_THREADS};
pub use reader::Reader;
pub use writer::Writer;
