/// Block compression primitive, factory side.
///
/// A `Codec` is shared (`Arc<dyn Codec>`) between every compressor,
/// decompressor and reader that uses it. It never touches block data itself:
/// it hands out [`CodecHandle`]s, and each handle is owned by exactly one
/// worker at a time.
///
/// Each `Codec` implementation:
/// - Must compress/decompress blocks independently. No state may carry from
///   one block to the next; this is what lets blocks be encoded and decoded
///   in parallel and in any order.
/// - Must report a worst-case payload size through `max_compressed_len`.
///   The decompressor uses it to reject frame headers that cannot be valid.
pub trait Codec: Send + Sync {
    /// Human-readable codec name for logs and error messages.
    fn name(&self) -> &'static str;

    /// Provable upper bound on the encoded size of `raw_len` input bytes.
    fn max_compressed_len(&self, raw_len: usize) -> usize;

    /// Allocate per-worker state able to encode and decode blocks of up to
    /// `block_size` bytes.
    fn new_handle(&self, block_size: u32) -> anyhow::Result<Box<dyn CodecHandle>>;
}

/// Per-worker block primitive state (contexts, tables, window memory).
///
/// Released by `Drop`.
pub trait CodecHandle: Send {
    /// Encode one block into `out`. `out` arrives empty.
    fn encode(&mut self, raw: &[u8], out: &mut Vec<u8>) -> anyhow::Result<()>;

    /// Decode one block into `out`. `out` arrives empty and must hold exactly
    /// `original_size` bytes on success.
    fn decode(
        &mut self,
        compressed: &[u8],
        original_size: usize,
        out: &mut Vec<u8>,
    ) -> anyhow::Result<()>;
}
