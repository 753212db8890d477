use bz3_core::{Codec, CodecHandle};
use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

/// Raw DEFLATE block codec (no zlib or gzip wrapper).
///
/// Slower than zstd at similar ratios, but universally decodable.
pub struct DeflateCodec {
    /// Compression level, 0 (stored) to 9 (smallest).
    pub level: u32,
}

impl Default for DeflateCodec {
    fn default() -> Self {
        Self { level: 6 }
    }
}

impl DeflateCodec {
    pub fn new(level: u32) -> Self {
        Self { level }
    }
}

struct DeflateHandle {
    compress: Compress,
    decompress: Decompress,
}

/// Stored-block fallback costs 5 bytes per 64 KiB; the slack also covers
/// encoders that emit a fixed-Huffman block before falling back.
fn deflate_bound(raw_len: usize) -> usize {
    raw_len + (raw_len >> 3) + 64
}

impl Codec for DeflateCodec {
    fn name(&self) -> &'static str {
        "deflate"
    }

    fn max_compressed_len(&self, raw_len: usize) -> usize {
        deflate_bound(raw_len)
    }

    fn new_handle(&self, _block_size: u32) -> anyhow::Result<Box<dyn CodecHandle>> {
        if self.level > 9 {
            anyhow::bail!("deflate level {} is out of range 0..=9", self.level);
        }
        Ok(Box::new(DeflateHandle {
            compress: Compress::new(Compression::new(self.level), false),
            decompress: Decompress::new(false),
        }))
    }
}

impl CodecHandle for DeflateHandle {
    fn encode(&mut self, raw: &[u8], out: &mut Vec<u8>) -> anyhow::Result<()> {
        self.compress.reset();
        out.reserve(deflate_bound(raw.len()));
        loop {
            let consumed = self.compress.total_in() as usize;
            let status = self
                .compress
                .compress_vec(&raw[consumed..], out, FlushCompress::Finish)?;
            if matches!(status, Status::StreamEnd) {
                return Ok(());
            }
            if out.len() == out.capacity() {
                out.reserve(out.capacity().max(64));
            }
        }
    }

    fn decode(
        &mut self,
        compressed: &[u8],
        original_size: usize,
        out: &mut Vec<u8>,
    ) -> anyhow::Result<()> {
        self.decompress.reset(false);
        // One spare byte so an oversized stream is detected instead of stalling.
        out.reserve(original_size + 1);
        loop {
            let consumed = self.decompress.total_in() as usize;
            let produced = out.len();
            let status = self.decompress.decompress_vec(
                &compressed[consumed..],
                out,
                FlushDecompress::Finish,
            )?;
            if out.len() > original_size {
                anyhow::bail!("deflate block decodes past {} bytes", original_size);
            }
            if matches!(status, Status::StreamEnd) {
                break;
            }
            if self.decompress.total_in() as usize == consumed && out.len() == produced {
                anyhow::bail!("deflate block is truncated");
            }
        }
        if out.len() != original_size {
            anyhow::bail!(
                "deflate block decoded to {} bytes, expected {}",
                out.len(),
                original_size
            );
        }
        Ok(())
    }
}
