use crate::codec::{Codec, CodecHandle};
use crate::error::{Error, Result};
use crate::format::write_frame;

/// One primitive handle plus the scratch buffer it encodes into and decodes
/// from. Both are released together when the worker is dropped.
///
/// The scratch buffer grows on first use rather than at construction, so a
/// worker for a 511 MiB block size costs nothing until a block arrives.
pub(crate) struct BlockWorker {
    handle: Box<dyn CodecHandle>,
    scratch: Vec<u8>,
    max_payload: usize,
}

impl BlockWorker {
    pub(crate) fn new(codec: &dyn Codec, block_size: u32) -> Result<Self> {
        let handle = codec.new_handle(block_size).map_err(|e| {
            Error::Resource(format!(
                "{} handle for block size {}: {:#}",
                codec.name(),
                block_size,
                e
            ))
        })?;
        Ok(Self {
            handle,
            scratch: Vec::new(),
            max_payload: codec.max_compressed_len(block_size as usize),
        })
    }

    fn reserve_scratch(&mut self, len: usize) -> Result<()> {
        self.scratch.clear();
        self.scratch
            .try_reserve(len)
            .map_err(|e| Error::Resource(format!("scratch buffer of {} bytes: {}", len, e)))
    }

    /// Encode `raw` and append the complete frame (length prefix + payload)
    /// to `out`. On failure nothing is appended.
    pub(crate) fn encode_frame(&mut self, seq: u64, raw: &[u8], out: &mut Vec<u8>) -> Result<()> {
        self.reserve_scratch(self.max_payload)?;
        self.handle
            .encode(raw, &mut self.scratch)
            .map_err(|e| Error::corrupt(seq, format!("encode failed: {:#}", e)))?;
        if self.scratch.len() > self.max_payload {
            return Err(Error::corrupt(
                seq,
                format!(
                    "encoder produced {} bytes, above its bound of {}",
                    self.scratch.len(),
                    self.max_payload
                ),
            ));
        }
        write_frame(out, &self.scratch, raw.len());
        Ok(())
    }

    /// Decode one frame payload and append exactly `original_size` bytes to
    /// `out`. On failure nothing is appended.
    pub(crate) fn decode_payload(
        &mut self,
        seq: u64,
        payload: &[u8],
        original_size: usize,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        self.reserve_scratch(original_size)?;
        self.handle
            .decode(payload, original_size, &mut self.scratch)
            .map_err(|e| Error::corrupt(seq, format!("decode failed: {:#}", e)))?;
        if self.scratch.len() != original_size {
            return Err(Error::corrupt(
                seq,
                format!(
                    "decoded {} bytes but frame header says {}",
                    self.scratch.len(),
                    original_size
                ),
            ));
        }
        out.extend_from_slice(&self.scratch);
        Ok(())
    }
}
