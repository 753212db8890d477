use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::format::{validate_block_size, DEFAULT_BLOCK_SIZE};

/// Upper limit on block workers per compressor or decompressor.
pub const MAX_THREADS: usize = 16;

/// Settings for the write side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressOptions {
    /// Raw bytes per block; every frame but the last holds exactly this many.
    pub block_size: u32,
    /// Number of block workers. 1 keeps all work on the calling thread.
    pub threads: usize,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            threads: 1,
        }
    }
}

impl CompressOptions {
    pub fn with_block_size(mut self, block_size: u32) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_block_size(self.block_size)?;
        validate_threads(self.threads)
    }
}

/// Settings for the read side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecompressOptions {
    /// Number of block workers. 1 keeps all work on the calling thread.
    pub threads: usize,
    /// Treat trailing bytes that are not a complete, valid frame as an error
    /// instead of unused data.
    pub strict: bool,
}

impl Default for DecompressOptions {
    fn default() -> Self {
        Self {
            threads: 1,
            strict: false,
        }
    }
}

impl DecompressOptions {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_threads(self.threads)
    }
}

fn validate_threads(threads: usize) -> Result<()> {
    if threads == 0 || threads > MAX_THREADS {
        return Err(Error::InvalidArgument(format!(
            "thread count {} outside 1..={}",
            threads, MAX_THREADS
        )));
    }
    Ok(())
}
