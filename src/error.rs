//! Error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the clipping pipeline.
///
/// HTTP and transport failures of a submission are not raised; they are
/// reported through [`crate::models::SubmissionResult`] (see [`SubmissionError`]).
#[derive(Debug, Error)]
pub enum ClipError {
    #[error("Blinko settings not found. Please configure the extension.")]
    MissingSettings,
    #[error("element is not inside a post container")]
    DetachedTrigger,
    #[error("failed to access settings file {path}: {source}")]
    SettingsIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings file: {0}")]
    SettingsFormat(#[from] serde_json::Error),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Why a note upsert failed
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("API Error: {status} {reason}")]
    Http { status: u16, reason: String },
    #[error("{0}")]
    Network(String),
}

pub type Result<T> = std::result::Result<T, ClipError>;
