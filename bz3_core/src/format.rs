use crate::error::{Error, Result};

/// Magic bytes opening every BZ3v1 container.
pub const MAGIC: &[u8; 5] = b"BZ3v1";

/// Fixed size of the container header in bytes.
///   magic[5] + block_size:i32 = 9
pub const HEADER_SIZE: usize = 9;

/// Size of the length prefix in front of every frame payload.
///   compressed_size:i32 + original_size:i32 = 8
pub const FRAME_HEADER_SIZE: usize = 8;

/// Smallest block size a container may declare: 65 KiB.
pub const MIN_BLOCK_SIZE: u32 = 65 * 1024;

/// Largest block size a container may declare: 511 MiB.
pub const MAX_BLOCK_SIZE: u32 = 511 * 1024 * 1024;

/// Default block size: 1 MiB.
pub const DEFAULT_BLOCK_SIZE: u32 = 1024 * 1024;

// ── Header ─────────────────────────────────────────────────────────────────

/// Check that `block_size` lies within `[MIN_BLOCK_SIZE, MAX_BLOCK_SIZE]`.
pub fn validate_block_size(block_size: u32) -> Result<u32> {
    if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&block_size) {
        return Err(Error::Format(format!(
            "block size {} outside the valid range {}..={}",
            block_size, MIN_BLOCK_SIZE, MAX_BLOCK_SIZE
        )));
    }
    Ok(block_size)
}

/// Serialize the container header. The block size is not validated here.
pub fn encode_header(block_size: u32) -> [u8; HEADER_SIZE] {
    let mut buf = [0u8; HEADER_SIZE];
    buf[..5].copy_from_slice(MAGIC);
    buf[5..9].copy_from_slice(&(block_size as i32).to_le_bytes());
    buf
}

/// Parse the container header from the first `HEADER_SIZE` bytes of `buf`.
///
/// Checks, in order: length, magic, block size range.
pub fn decode_header(buf: &[u8]) -> Result<u32> {
    if buf.len() < HEADER_SIZE {
        return Err(Error::Format(format!(
            "header too short: {} of {} bytes",
            buf.len(),
            HEADER_SIZE
        )));
    }
    if &buf[..5] != MAGIC {
        return Err(Error::Format("invalid signature, expected BZ3v1".into()));
    }
    let raw = read_i32(&buf[5..9]);
    if raw < 0 {
        return Err(Error::Format(format!("negative block size {} in header", raw)));
    }
    validate_block_size(raw as u32)
}

// ── Frames ─────────────────────────────────────────────────────────────────

/// The 8-byte length prefix in front of each compressed block.
///
/// Sizes stay signed so that a hostile or damaged stream can be inspected
/// (and rejected) exactly as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub compressed_size: i32,
    pub original_size: i32,
}

impl FrameHeader {
    pub fn to_bytes(&self) -> [u8; FRAME_HEADER_SIZE] {
        let mut buf = [0u8; FRAME_HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.compressed_size.to_le_bytes());
        buf[4..8].copy_from_slice(&self.original_size.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; FRAME_HEADER_SIZE]) -> Self {
        Self {
            compressed_size: read_i32(&buf[0..4]),
            original_size: read_i32(&buf[4..8]),
        }
    }

    /// Reject frame headers that cannot belong to a stream with this block
    /// size and payload bound.
    pub fn validate(&self, block_size: u32, max_payload: usize) -> Result<()> {
        if self.compressed_size < 0 || self.original_size < 0 {
            return Err(Error::Format(format!(
                "negative frame sizes (compressed {}, original {})",
                self.compressed_size, self.original_size
            )));
        }
        if self.original_size as u32 > block_size {
            return Err(Error::Format(format!(
                "frame original size {} exceeds block size {}",
                self.original_size, block_size
            )));
        }
        if self.compressed_size as usize > max_payload {
            return Err(Error::Format(format!(
                "frame compressed size {} exceeds bound {}",
                self.compressed_size, max_payload
            )));
        }
        Ok(())
    }

    /// Total bytes the frame occupies on the wire. Only meaningful after
    /// `validate` succeeded.
    pub fn frame_len(&self) -> usize {
        FRAME_HEADER_SIZE + self.compressed_size as usize
    }
}

/// Read the frame header at the start of `buf` without consuming anything.
///
/// Returns `None` until at least `FRAME_HEADER_SIZE` bytes are available.
pub fn peek_frame_header(buf: &[u8]) -> Option<FrameHeader> {
    let head: &[u8; FRAME_HEADER_SIZE] = buf.get(..FRAME_HEADER_SIZE)?.try_into().ok()?;
    Some(FrameHeader::from_bytes(head))
}

/// Append one frame (length prefix + payload) to `out`.
pub fn write_frame(out: &mut Vec<u8>, compressed: &[u8], original_size: usize) {
    let header = FrameHeader {
        compressed_size: compressed.len() as i32,
        original_size: original_size as i32,
    };
    out.reserve(FRAME_HEADER_SIZE + compressed.len());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(compressed);
}

/// Serialize one frame into a fresh buffer.
pub fn encode_frame(compressed: &[u8], original_size: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(FRAME_HEADER_SIZE + compressed.len());
    write_frame(&mut out, compressed, original_size);
    out
}

fn read_i32(bytes: &[u8]) -> i32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[..4]);
    i32::from_le_bytes(raw)
}
