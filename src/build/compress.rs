//! LZ4 compression of the finished asset image.

use crate::diagnostics::BuildError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompressionLevel {
    #[default]
    Fast,
    High,
}

pub struct CompressResult {
    pub compressed: Vec<u8>,
    pub uncompressed_size: usize,
}

/// Compress an image into a raw LZ4 block prefixed with the uncompressed
/// size as u32 LE. The firmware decompresses in place with only that
/// header, not the full LZ4 frame format.
#[cfg(feature = "lz4")]
pub fn compress(data: &[u8], _level: CompressionLevel) -> Result<CompressResult, BuildError> {
    if data.len() > u32::MAX as usize {
        return Err(BuildError::resource("image exceeds the 4 GiB size limit"));
    }

    let block = lz4_flex::block::compress(data);

    let mut compressed = Vec::with_capacity(4 + block.len());
    compressed.extend_from_slice(&(data.len() as u32).to_le_bytes());
    compressed.extend_from_slice(&block);

    Ok(CompressResult {
        compressed,
        uncompressed_size: data.len(),
    })
}

#[cfg(not(feature = "lz4"))]
pub fn compress(_data: &[u8], _level: CompressionLevel) -> Result<CompressResult, BuildError> {
    Err(BuildError::compression_unavailable())
}

#[cfg(all(test, feature = "lz4"))]
mod compress_tests {
    use super::*;

    #[test]
    fn repetitive_data_shrinks() {
        let data = vec![0u8; 64 * 1024];
        let result = compress(&data, CompressionLevel::Fast).unwrap();
        assert_eq!(result.uncompressed_size, data.len());
        assert!(result.compressed.len() < data.len());
        assert_eq!(&result.compressed[..4], &(data.len() as u32).to_le_bytes());
    }

    #[test]
    fn block_round_trips() {
        let data: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        let result = compress(&data, CompressionLevel::High).unwrap();

        let size = u32::from_le_bytes(result.compressed[..4].try_into().unwrap()) as usize;
        let restored =
            lz4_flex::block::decompress(&result.compressed[4..], size).expect("valid block");
        assert_eq!(restored, data);
    }
}
