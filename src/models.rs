//! Data models for clipped posts and Blinko submissions

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Snapshot of one rendered post at click time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostRecord {
    pub author_name: String,
    pub author_handle: String,
    pub avatar_url: String,
    pub body_text: String,
    pub image_urls: Vec<String>,
    pub timestamp_iso: String,
    pub timestamp_display: String,
    pub permalink: String,
}

/// JSON body of `POST /api/v1/note/upsert`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionPayload {
    pub content: String,
    #[serde(rename = "type")]
    pub note_type: i64,
    pub attachments: Vec<Value>,
    pub references: Vec<Value>,
}

impl SubmissionPayload {
    pub fn new(content: impl Into<String>, note_type: i64) -> Self {
        Self {
            content: content.into(),
            note_type,
            attachments: Vec::new(),
            references: Vec::new(),
        }
    }
}

/// Outcome reported back to the page, shaped like the extension's reply message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmissionResult {
    pub fn success(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Error text shown to the user; a failure without a message reads "Unknown error"
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or("Unknown error")
    }
}
