mod deflate_codec;
mod lz4_codec;
mod passthrough;
mod zstd_codec;

pub use deflate_codec::DeflateCodec;
pub use lz4_codec::Lz4Codec;
pub use passthrough::PassThroughCodec;
pub use zstd_codec::ZstdCodec;

use bz3_core::Codec;
use std::sync::Arc;

/// Names accepted by [`codec_by_name`].
pub const CODEC_NAMES: [&str; 4] = ["passthrough", "zstd", "lz4", "deflate"];

/// Resolve a bundled block primitive from its name, with default settings.
///
/// The container header does not record which primitive produced it, so
/// callers pick one explicitly and must use the same one on both ends.
///
/// None of the bundled primitives produce bzip3 block payloads. Containers
/// written with them carry the `BZ3v1` header but cannot be read by bzip3
/// tooling, and containers from that tooling need a bzip3 [`Codec`]
/// supplied by the caller.
pub fn codec_by_name(name: &str) -> anyhow::Result<Arc<dyn Codec>> {
    match name {
        "passthrough" => Ok(Arc::new(PassThroughCodec)),
        "zstd" => Ok(Arc::new(ZstdCodec::default())),
        "lz4" => Ok(Arc::new(Lz4Codec)),
        "deflate" => Ok(Arc::new(DeflateCodec::default())),
        "bzip3" => anyhow::bail!(
            "the bzip3 block primitive is not bundled; pass your own bz3_core::Codec"
        ),
        _ => anyhow::bail!("unknown codec {:?}; expected one of {:?}", name, CODEC_NAMES),
    }
}
