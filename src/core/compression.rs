// Payload decompression

use crate::core::error::{EnvLogError, Result};
use flate2::read::GzDecoder;
use std::io::Read;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    None,
    Gzip,
}

impl CompressionType {
    /// Sniff the gzip magic; anything else is treated as plain text.
    pub fn detect(data: &[u8]) -> Self {
        if data.starts_with(&GZIP_MAGIC) {
            CompressionType::Gzip
        } else {
            CompressionType::None
        }
    }
}

pub fn decompress(data: &[u8], compression: CompressionType) -> Result<Vec<u8>> {
    match compression {
        CompressionType::None => Ok(data.to_vec()),

        CompressionType::Gzip => {
            let mut decoder = GzDecoder::new(data);
            let mut decompressed = Vec::new();
            decoder
                .read_to_end(&mut decompressed)
                .map_err(|e| EnvLogError::DecompressionFailed(format!("Gzip: {}", e)))?;
            Ok(decompressed)
        }
    }
}

#[cfg(test)]
pub(crate) fn gzip(data: &[u8]) -> Vec<u8> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decompress_none() {
        let data = b"hello world";
        let result = decompress(data, CompressionType::None).unwrap();
        assert_eq!(result, data);
    }

    #[test]
    fn test_decompress_gzip() {
        let compressed = gzip(b"[1,{}]");
        assert_eq!(CompressionType::detect(&compressed), CompressionType::Gzip);
        let raw = decompress(&compressed, CompressionType::Gzip).unwrap();
        assert_eq!(raw, b"[1,{}]");
    }

    #[test]
    fn test_decompress_garbage_fails() {
        let err = decompress(&[0x1f, 0x8b, 0, 1, 2], CompressionType::Gzip).unwrap_err();
        assert!(matches!(err, EnvLogError::DecompressionFailed(_)));
    }

    #[test]
    fn test_detect_plain() {
        assert_eq!(CompressionType::detect(b"[1,{}]"), CompressionType::None);
    }
}
