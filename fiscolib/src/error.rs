//! Единый тип ошибок публичного API.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FiscoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("no header row found in the first {0} rows")]
    NoHeader(usize),

    #[error("row {0} is out of range")]
    RowOutOfRange(usize),

    #[error("invalid batch state: {0}")]
    InvalidState(&'static str),

    #[error("submission failed: {0}")]
    Submission(String),
}

pub type Result<T> = std::result::Result<T, FiscoError>;
