use bz3_core::{Codec, CodecHandle};

/// No-op codec: stores blocks verbatim, with no compression.
///
/// Useful for:
/// - Verifying the container round-trip independently of any codec.
/// - Data that is already compressed, where further compression would only
///   expand it.
pub struct PassThroughCodec;

struct PassThroughHandle;

impl Codec for PassThroughCodec {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn max_compressed_len(&self, raw_len: usize) -> usize {
        raw_len
    }

    fn new_handle(&self, _block_size: u32) -> anyhow::Result<Box<dyn CodecHandle>> {
        Ok(Box::new(PassThroughHandle))
    }
}

impl CodecHandle for PassThroughHandle {
    fn encode(&mut self, raw: &[u8], out: &mut Vec<u8>) -> anyhow::Result<()> {
        out.extend_from_slice(raw);
        Ok(())
    }

    fn decode(
        &mut self,
        compressed: &[u8],
        original_size: usize,
        out: &mut Vec<u8>,
    ) -> anyhow::Result<()> {
        if compressed.len() != original_size {
            anyhow::bail!(
                "stored block holds {} bytes, expected {}",
                compressed.len(),
                original_size
            );
        }
        out.extend_from_slice(compressed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_verbatim() {
        let mut h = PassThroughCodec.new_handle(1 << 16).unwrap();
        let mut out = Vec::new();
        h.encode(b"abc", &mut out).unwrap();
        assert_eq!(out, b"abc");
        let mut back = Vec::new();
        h.decode(&out, 3, &mut back).unwrap();
        assert_eq!(back, b"abc");
    }

    #[test]
    fn length_mismatch_fails() {
        let mut h = PassThroughCodec.new_handle(1 << 16).unwrap();
        let mut out = Vec::new();
        assert!(h.decode(b"abc", 4, &mut out).is_err());
        assert!(out.is_empty());
    }
}
