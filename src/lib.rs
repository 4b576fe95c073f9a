//! Library for clipping social-media posts from rendered pages into Blinko notes

pub mod background;
pub mod client;
pub mod config;
pub mod content;
pub mod document;
pub mod dom;
pub mod error;
pub mod extractor;
pub mod markdown;
pub mod models;
pub mod settings;
pub mod toast;
pub mod utils;

// Re-export main types and functions for convenient access
pub use background::{BackgroundWorker, Message, MessageSender};
pub use client::{upsert_url, BlinkoClient};
pub use content::ContentScript;
pub use document::{Document, MutationObserver, MutationRecord};
pub use error::{ClipError, SubmissionError};
pub use extractor::{extract_post, PostExtractor};
pub use markdown::format_note;
pub use models::{PostRecord, SubmissionPayload, SubmissionResult};
pub use settings::{FileSettingsStore, MemorySettingsStore, Settings, SettingsForm, SettingsStore};
pub use toast::Toast;
