use std::sync::atomic::{AtomicUsize, Ordering};

use crate::codec::{Codec, CodecHandle};

/// XOR "codec": output is the input with every byte flipped by `KEY`.
///
/// Refuses to encode a block containing `POISON` and refuses to decode a
/// payload that would produce it, which gives tests a deterministic way to
/// make the primitive fail.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct TestCodec {
    pub fail_handles: bool,
}

impl TestCodec {
    pub const KEY: u8 = 0x5A;
    pub const POISON: u8 = 0xFF;
}

struct TestHandle;

impl Codec for TestCodec {
    fn name(&self) -> &'static str {
        "test-xor"
    }

    fn max_compressed_len(&self, raw_len: usize) -> usize {
        raw_len
    }

    fn new_handle(&self, _block_size: u32) -> anyhow::Result<Box<dyn CodecHandle>> {
        if self.fail_handles {
            anyhow::bail!("out of handles");
        }
        Ok(Box::new(TestHandle))
    }
}

impl CodecHandle for TestHandle {
    fn encode(&mut self, raw: &[u8], out: &mut Vec<u8>) -> anyhow::Result<()> {
        if raw.contains(&TestCodec::POISON) {
            anyhow::bail!("poisoned block");
        }
        out.extend(raw.iter().map(|b| b ^ TestCodec::KEY));
        Ok(())
    }

    fn decode(
        &mut self,
        compressed: &[u8],
        _original_size: usize,
        out: &mut Vec<u8>,
    ) -> anyhow::Result<()> {
        out.extend(compressed.iter().map(|b| b ^ TestCodec::KEY));
        if out.contains(&TestCodec::POISON) {
            anyhow::bail!("poisoned payload");
        }
        Ok(())
    }
}

/// `len` deterministic bytes that never contain `TestCodec::POISON`.
pub(crate) fn pattern(len: usize) -> Vec<u8> {
    let mut rng: u64 = 0x9E37_79B9_7F4A_7C15;
    (0..len)
        .map(|_| {
            rng = rng
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            b'a' + ((rng >> 33) % 26) as u8
        })
        .collect()
}

/// `TestCodec` that counts the handles it hands out.
#[derive(Debug, Default)]
pub(crate) struct CountingCodec {
    inner: TestCodec,
    handles: AtomicUsize,
}

impl CountingCodec {
    pub fn handles(&self) -> usize {
        self.handles.load(Ordering::SeqCst)
    }
}

impl Codec for CountingCodec {
    fn name(&self) -> &'static str {
        "test-counting"
    }

    fn max_compressed_len(&self, raw_len: usize) -> usize {
        self.inner.max_compressed_len(raw_len)
    }

    fn new_handle(&self, block_size: u32) -> anyhow::Result<Box<dyn CodecHandle>> {
        self.handles.fetch_add(1, Ordering::SeqCst);
        self.inner.new_handle(block_size)
    }
}
