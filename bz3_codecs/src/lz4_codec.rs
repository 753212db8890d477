use bz3_core::{Codec, CodecHandle};
use lz4_flex::block::{compress_into, decompress_into, get_maximum_output_size};

/// LZ4 block codec.
///
/// Fastest decompression of all bundled codecs. Best for local workloads
/// where decode speed matters more than size reduction.
///
/// Handles are stateless; the frame header already carries the block's
/// original size, so the payload is the raw LZ4 block with no size prefix.
pub struct Lz4Codec;

struct Lz4Handle;

impl Codec for Lz4Codec {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn max_compressed_len(&self, raw_len: usize) -> usize {
        get_maximum_output_size(raw_len)
    }

    fn new_handle(&self, _block_size: u32) -> anyhow::Result<Box<dyn CodecHandle>> {
        Ok(Box::new(Lz4Handle))
    }
}

impl CodecHandle for Lz4Handle {
    fn encode(&mut self, raw: &[u8], out: &mut Vec<u8>) -> anyhow::Result<()> {
        out.resize(get_maximum_output_size(raw.len()), 0);
        let n = compress_into(raw, out).map_err(|e| anyhow::anyhow!("lz4 compress error: {}", e))?;
        out.truncate(n);
        Ok(())
    }

    fn decode(
        &mut self,
        compressed: &[u8],
        original_size: usize,
        out: &mut Vec<u8>,
    ) -> anyhow::Result<()> {
        out.resize(original_size, 0);
        let n = decompress_into(compressed, out)
            .map_err(|e| anyhow::anyhow!("lz4 decompress error: {}", e))?;
        if n != original_size {
            out.clear();
            anyhow::bail!("lz4 block decoded to {} bytes, expected {}", n, original_size);
        }
        Ok(())
    }
}
