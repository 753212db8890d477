use bz3_core::{Codec, CodecHandle};

/// Zstandard block codec.
///
/// Each block is compressed independently with `zstd` at the configured level
/// (default: 3). Every handle owns one compression and one decompression
/// context, reused for all the blocks that worker sees.
///
/// Best for: general text, JSON, logs, mixed structured data.
pub struct ZstdCodec {
    /// Compression level (1 = fast / larger, 22 = slow / smallest).
    pub level: i32,
}

impl Default for ZstdCodec {
    fn default() -> Self {
        Self { level: 3 }
    }
}

impl ZstdCodec {
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

struct ZstdHandle {
    compressor: zstd::bulk::Compressor<'static>,
    decompressor: zstd::bulk::Decompressor<'static>,
}

impl Codec for ZstdCodec {
    fn name(&self) -> &'static str {
        "zstd"
    }

    fn max_compressed_len(&self, raw_len: usize) -> usize {
        zstd::zstd_safe::compress_bound(raw_len)
    }

    fn new_handle(&self, _block_size: u32) -> anyhow::Result<Box<dyn CodecHandle>> {
        Ok(Box::new(ZstdHandle {
            compressor: zstd::bulk::Compressor::new(self.level)?,
            decompressor: zstd::bulk::Decompressor::new()?,
        }))
    }
}

impl CodecHandle for ZstdHandle {
    fn encode(&mut self, raw: &[u8], out: &mut Vec<u8>) -> anyhow::Result<()> {
        // compress_to_buffer only writes into spare capacity
        out.reserve(zstd::zstd_safe::compress_bound(raw.len()));
        self.compressor.compress_to_buffer(raw, out)?;
        Ok(())
    }

    fn decode(
        &mut self,
        compressed: &[u8],
        original_size: usize,
        out: &mut Vec<u8>,
    ) -> anyhow::Result<()> {
        out.reserve(original_size);
        let n = self.decompressor.decompress_to_buffer(compressed, out)?;
        if n != original_size {
            anyhow::bail!("zstd block decoded to {} bytes, expected {}", n, original_size);
        }
        Ok(())
    }
}
