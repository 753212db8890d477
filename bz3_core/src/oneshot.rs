use std::io::{self, Read, Write};
use std::sync::Arc;

use tracing::debug;

use crate::codec::Codec;
use crate::compressor::Compressor;
use crate::decompressor::Decompressor;
use crate::error::{Error, Result};
use crate::format::{FRAME_HEADER_SIZE, HEADER_SIZE};
use crate::options::{CompressOptions, DecompressOptions};
use crate::reader::Reader;
use crate::writer::Writer;

/// Uncompressed bytes pulled from the source per read in `compress_stream`.
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Compress `data` into a complete container.
pub fn compress(codec: Arc<dyn Codec>, block_size: u32, data: &[u8]) -> Result<Vec<u8>> {
    let mut compressor = Compressor::new(codec, block_size)?;
    let mut out = Vec::new();
    compressor.compress_to(data, &mut out)?;
    compressor.flush_to(&mut out)?;
    Ok(out)
}

/// Decompress a complete container. Trailing bytes are ignored.
pub fn decompress(codec: Arc<dyn Codec>, data: &[u8]) -> Result<Vec<u8>> {
    let mut decompressor = Decompressor::new(codec)?;
    let mut out = Vec::new();
    decompressor.decompress_to(data, &mut out)?;
    decompressor.finish()?;
    Ok(out)
}

/// Worst-case container size for `len` input bytes.
///
/// Header, plus one frame header and one codec bound per block.
pub fn bound(codec: &dyn Codec, block_size: u32, len: usize) -> usize {
    let block_size = block_size as usize;
    let full = len / block_size;
    let tail = len % block_size;
    let mut total = HEADER_SIZE + full * (FRAME_HEADER_SIZE + codec.max_compressed_len(block_size));
    if tail > 0 {
        total += FRAME_HEADER_SIZE + codec.max_compressed_len(tail);
    }
    total
}

/// Compress `data` into `out`, returning the number of bytes written.
pub fn compress_into(
    codec: Arc<dyn Codec>,
    block_size: u32,
    data: &[u8],
    out: &mut [u8],
) -> Result<usize> {
    let bytes = compress(codec, block_size, data)?;
    copy_into(&bytes, out)
}

/// Decompress the container in `data` into `out`, returning the number of
/// bytes written.
pub fn decompress_into(codec: Arc<dyn Codec>, data: &[u8], out: &mut [u8]) -> Result<usize> {
    let bytes = decompress(codec, data)?;
    copy_into(&bytes, out)
}

fn copy_into(bytes: &[u8], out: &mut [u8]) -> Result<usize> {
    let available = out.len();
    let dst = out.get_mut(..bytes.len()).ok_or(Error::BufferTooSmall {
        needed: bytes.len(),
        available,
    })?;
    dst.copy_from_slice(bytes);
    Ok(bytes.len())
}

/// Compress everything `input` yields into `output`. Returns the number of
/// uncompressed bytes read.
pub fn compress_stream<R: Read, W: Write>(
    codec: Arc<dyn Codec>,
    options: CompressOptions,
    mut input: R,
    output: W,
) -> Result<u64> {
    let mut writer = Writer::with_options(output, codec, options)?;
    let mut buf = vec![0u8; STREAM_CHUNK_SIZE];
    loop {
        let n = match input.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        writer.write_all(&buf[..n]).map_err(unwrap_engine_error)?;
    }
    let total = writer.bytes_in();
    writer.finish()?;
    debug!(bytes = total, "compressed stream");
    Ok(total)
}

/// Decompress the container `input` yields into `output`. Returns the number
/// of decompressed bytes written.
pub fn decompress_stream<R: Read, W: Write>(
    codec: Arc<dyn Codec>,
    options: DecompressOptions,
    input: R,
    mut output: W,
) -> Result<u64> {
    let mut reader = Reader::with_options(input, codec, options)?;
    let total = io::copy(&mut reader, &mut output).map_err(unwrap_engine_error)?;
    output.flush()?;
    debug!(bytes = total, "decompressed stream");
    Ok(total)
}

/// Decode the whole container and discard the output, reporting whether it
/// is valid.
///
/// With `strict = false` format, truncation and corruption problems yield
/// `Ok(false)` and trailing bytes are tolerated. With `strict = true` those
/// problems are returned as errors and trailing bytes are rejected. I/O
/// errors of the source always propagate.
pub fn test_stream<R: Read>(codec: Arc<dyn Codec>, input: R, strict: bool) -> Result<bool> {
    let options = DecompressOptions::default().with_strict(strict);
    match decompress_stream(codec, options, input, io::sink()) {
        Ok(_) => Ok(true),
        Err(e) if e.is_data_error() && !strict => {
            debug!(error = %e, "container failed validation");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Recover the engine error wrapped into an `io::Error` by the `Read` and
/// `Write` adapters.
fn unwrap_engine_error(e: io::Error) -> Error {
    if let Some(engine) = e.get_ref().and_then(|inner| inner.downcast_ref::<Error>()) {
        return engine.clone();
    }
    e.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::MIN_BLOCK_SIZE;
    use crate::testing::{pattern, TestCodec};

    fn codec() -> Arc<dyn Codec> {
        Arc::new(TestCodec::default())
    }

    #[test]
    fn bound_covers_header_and_frames() {
        let c = TestCodec::default();
        let bs = MIN_BLOCK_SIZE as usize;
        assert_eq!(bound(&c, MIN_BLOCK_SIZE, 0), HEADER_SIZE);
        assert_eq!(bound(&c, MIN_BLOCK_SIZE, 10), HEADER_SIZE + FRAME_HEADER_SIZE + 10);
        assert_eq!(
            bound(&c, MIN_BLOCK_SIZE, 2 * bs + 1),
            HEADER_SIZE + 3 * FRAME_HEADER_SIZE + 2 * bs + 1
        );
        let data = pattern(2 * bs + 1);
        let bytes = compress(codec(), MIN_BLOCK_SIZE, &data).unwrap();
        assert!(bytes.len() <= bound(&c, MIN_BLOCK_SIZE, data.len()));
    }

    #[test]
    fn into_variants_report_small_buffers() {
        let data = pattern(1000);
        let mut small = [0u8; 16];
        let err = compress_into(codec(), MIN_BLOCK_SIZE, &data, &mut small).unwrap_err();
        assert!(matches!(err, Error::BufferTooSmall { available: 16, .. }));

        let mut buf = vec![0u8; bound(&TestCodec::default(), MIN_BLOCK_SIZE, data.len())];
        let n = compress_into(codec(), MIN_BLOCK_SIZE, &data, &mut buf).unwrap();
        let mut plain = vec![0u8; data.len()];
        let m = decompress_into(codec(), &buf[..n], &mut plain).unwrap();
        assert_eq!(m, data.len());
        assert_eq!(plain, data);
    }

    #[test]
    fn stream_helpers_round_trip() {
        let data = pattern(3 * MIN_BLOCK_SIZE as usize + 11);
        let options = CompressOptions::default().with_block_size(MIN_BLOCK_SIZE);
        let mut container = Vec::new();
        let read = compress_stream(codec(), options, data.as_slice(), &mut container).unwrap();
        assert_eq!(read, data.len() as u64);

        let mut plain = Vec::new();
        let written =
            decompress_stream(codec(), DecompressOptions::default(), container.as_slice(), &mut plain)
                .unwrap();
        assert_eq!(written, data.len() as u64);
        assert_eq!(plain, data);
    }

    /// Source that records the largest read buffer it was handed.
    struct WidestRead<'a> {
        data: &'a [u8],
        widest: usize,
    }

    impl Read for WidestRead<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.widest = self.widest.max(buf.len());
            self.data.read(buf)
        }
    }

    #[test]
    fn compress_stream_reads_in_small_chunks() {
        let data = pattern(300_000);
        let options = CompressOptions::default().with_block_size(crate::format::DEFAULT_BLOCK_SIZE);
        let mut source = WidestRead { data: &data, widest: 0 };
        let mut container = Vec::new();
        compress_stream(codec(), options, &mut source, &mut container).unwrap();
        assert_eq!(source.widest, STREAM_CHUNK_SIZE);
        assert_eq!(decompress(codec(), &container).unwrap(), data);
    }

    #[test]
    fn test_stream_strictness() {
        let data = pattern(1000);
        let good = compress(codec(), MIN_BLOCK_SIZE, &data).unwrap();
        assert!(test_stream(codec(), good.as_slice(), false).unwrap());
        assert!(test_stream(codec(), good.as_slice(), true).unwrap());

        let truncated = &good[..good.len() - 1];
        assert!(test_stream(codec(), truncated, false).unwrap());
        assert!(matches!(
            test_stream(codec(), truncated, true),
            Err(Error::TruncatedStream(_))
        ));

        let mut corrupt = good.clone();
        let last = corrupt.len() - 1;
        corrupt[last] = TestCodec::POISON ^ TestCodec::KEY;
        assert!(!test_stream(codec(), corrupt.as_slice(), false).unwrap());
        assert!(matches!(
            test_stream(codec(), corrupt.as_slice(), true),
            Err(Error::CorruptData { .. })
        ));

        assert!(!test_stream(codec(), &b"BZ3"[..], false).unwrap());
        assert!(matches!(test_stream(codec(), &b"BZ3"[..], true), Err(Error::Format(_))));
    }
}
