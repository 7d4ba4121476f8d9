//! Error taxonomy for a bot run.
//!
//! Tolerated absences (missing banner, missing description, exhausted
//! pagination) never appear here — lookups report present/absent in their
//! `Ok` value and the call site substitutes or falls back. Everything in
//! this enum is fatal to the run.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Browser transport or protocol failure (launch, CDP, page gone).
    #[error("browser error: {0}")]
    Browser(String),

    /// A required UI element was not reachable, even via fallback.
    #[error("navigation failed at {step}: {detail}")]
    Navigation { step: String, detail: String },

    /// A required field was missing from a result item.
    #[error("article extraction failed: {0}")]
    Extraction(String),

    /// The tabular report could not be opened or written.
    #[error("failed to write report {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An article image could not be fetched or saved.
    #[error("image download failed for {url}: {detail}")]
    Download { url: String, detail: String },

    #[error("invalid run configuration: {0}")]
    Config(String),
}

impl From<chromiumoxide::error::CdpError> for Error {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        Error::Browser(e.to_string())
    }
}
