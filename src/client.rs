//! Blinko HTTP API client.
//!
//! Sends one authenticated note upsert per request and turns the response
//! into a [`SubmissionResult`]. Nothing is retried.

use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Result, SubmissionError};
use crate::models::{SubmissionPayload, SubmissionResult};
use crate::utils::strip_trailing_slash;

/// Blinko note type for markdown content
pub const MARKDOWN_NOTE_TYPE: i64 = 1;

const UPSERT_PATH: &str = "/api/v1/note/upsert";

/// Full upsert endpoint for a service base URL
pub fn upsert_url(base_url: &str) -> String {
    format!("{}{}", strip_trailing_slash(base_url), UPSERT_PATH)
}

#[derive(Debug, Clone)]
pub struct BlinkoClient {
    http: reqwest::Client,
    note_type: i64,
}

impl BlinkoClient {
    /// Create a client that tags notes with `note_type`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(note_type: i64) -> Result<Self> {
        // No timeout: the request is allowed to run until it settles
        let http = reqwest::Client::builder()
            .user_agent(concat!("blinko-clipper/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, note_type })
    }

    pub fn note_type(&self) -> i64 {
        self.note_type
    }

    /// Upsert `content` as a note and report the outcome
    pub async fn save(&self, content: &str, base_url: &str, token: &str) -> SubmissionResult {
        match self.upsert(content, base_url, token).await {
            Ok(data) => SubmissionResult::success(data),
            Err(e) => {
                warn!(error = %e, "Blinko API error");
                SubmissionResult::failure(e.to_string())
            }
        }
    }

    async fn upsert(
        &self,
        content: &str,
        base_url: &str,
        token: &str,
    ) -> std::result::Result<Value, SubmissionError> {
        let url = upsert_url(base_url);
        let payload = SubmissionPayload::new(content, self.note_type);
        debug!(url = %url, bytes = content.len(), "Posting note to Blinko");

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SubmissionError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(http_error(status));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| SubmissionError::Network(e.to_string()))?;

        info!(url = %url, status = status.as_u16(), "Note saved to Blinko");
        Ok(data)
    }
}

fn http_error(status: StatusCode) -> SubmissionError {
    SubmissionError::Http {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or_default().to_string(),
    }
}
