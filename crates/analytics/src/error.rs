// In crates/analytics/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Statistics file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Statistics file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
