// Error handling for the envlog engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EnvLogError>;

#[derive(Error, Debug)]
pub enum EnvLogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid day key: {0}")]
    InvalidDayKey(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid UTF-8 payload")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("Config error: {0}")]
    Config(String),
}
