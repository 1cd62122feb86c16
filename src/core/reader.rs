// Payload decoding for day archives, diffs and the known-days list

use crate::core::compression::{decompress, CompressionType};
use crate::core::error::Result;
use crate::core::format::Sample;
use std::path::{Path, PathBuf};

/// Decompress (when gzip) and decode a body as UTF-8.
pub fn decode_body(data: &[u8]) -> Result<String> {
    let raw = decompress(data, CompressionType::detect(data))?;
    Ok(String::from_utf8(raw)?)
}

/// A JSON array of samples, as returned by the diff endpoint.
pub fn parse_records(text: &str) -> Result<Vec<Sample>> {
    Ok(serde_json::from_str(text)?)
}

/// Archive files hold comma-joined sample literals without the enclosing
/// brackets, so wrap before parsing.
pub fn parse_archive(text: &str) -> Result<Vec<Sample>> {
    let body = text.trim().trim_end_matches(',');
    if body.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&format!("[{}]", body))?)
}

pub fn parse_day_list(text: &str) -> Result<Vec<String>> {
    Ok(serde_json::from_str(text)?)
}

/// A local `recYYYYMMDD.txt[.gz]` archive file.
#[derive(Debug, Clone)]
pub struct ArchiveFile {
    pub path: PathBuf,
    pub day_key: Option<String>,
    pub samples: Vec<Sample>,
}

impl ArchiveFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = std::fs::read(&path)?;
        let samples = parse_archive(&decode_body(&data)?)?;
        let day_key = Self::day_key_from_name(&path);
        Ok(Self {
            path,
            day_key,
            samples,
        })
    }

    fn day_key_from_name(path: &Path) -> Option<String> {
        let name = path.file_name()?.to_str()?;
        let key = name.strip_prefix("rec")?.get(..8)?;
        key.chars().all(|c| c.is_ascii_digit()).then(|| key.to_string())
    }
}
