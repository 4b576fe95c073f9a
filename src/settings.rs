//! Blinko connection settings: the shared store and the settings form

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{ClipError, Result};
use crate::utils::strip_trailing_slash;

/// How long form status messages stay visible
pub const STATUS_DURATION: Duration = Duration::from_secs(3);

/// Service base URL and bearer token, stored under the extension's key names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "blinkoBaseUrl", default)]
    pub base_url: String,
    #[serde(rename = "blinkoToken", default)]
    pub token: String,
}

impl Settings {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    /// Both fields must be present before anything is extracted or sent
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() || self.token.is_empty() {
            return Err(ClipError::MissingSettings);
        }
        Ok(())
    }
}

/// Durable key-value storage for [`Settings`], shared by the form and the content script
pub trait SettingsStore: Send + Sync {
    /// Current settings; unset keys read as empty strings
    fn get(&self) -> Result<Settings>;
    /// Replace both values in one write
    fn set(&self, settings: &Settings) -> Result<()>;
}

/// Settings kept in a JSON file
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> ClipError {
        ClipError::SettingsIo {
            path: self.path.clone(),
            source,
        }
    }
}

impl SettingsStore for FileSettingsStore {
    fn get(&self) -> Result<Settings> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No settings file yet");
                Ok(Settings::default())
            }
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn set(&self, settings: &Settings) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| self.io_error(e))?;

        // Write to a sibling temp file, then rename over the old file
        let json = serde_json::to_string_pretty(settings)?;
        let mut file = NamedTempFile::new_in(&dir).map_err(|e| self.io_error(e))?;
        file.write_all(json.as_bytes())
            .map_err(|e| self.io_error(e))?;
        file.persist(&self.path)
            .map_err(|e| self.io_error(e.error))?;

        info!(path = %self.path.display(), "Settings saved");
        Ok(())
    }
}

/// In-process settings, for tests and embedding
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: Mutex<Settings>,
}

impl MemorySettingsStore {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self) -> Result<Settings> {
        Ok(self
            .settings
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone()))
    }

    fn set(&self, settings: &Settings) -> Result<()> {
        match self.settings.lock() {
            Ok(mut guard) => *guard = settings.clone(),
            Err(poisoned) => *poisoned.into_inner() = settings.clone(),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub kind: StatusKind,
}

/// The settings form: two text fields, a save action and an inline status line
#[derive(Debug, Default)]
pub struct SettingsForm {
    pub base_url: String,
    pub token: String,
    status: Option<(StatusMessage, Instant)>,
}

impl SettingsForm {
    /// Pre-fill the fields from the store
    pub fn load(store: &dyn SettingsStore) -> Result<Self> {
        let saved = store.get()?;
        Ok(Self {
            base_url: saved.base_url,
            token: saved.token,
            status: None,
        })
    }

    /// Normalize and persist the fields. Returns false when a field is empty;
    /// in that case nothing is written and the status line shows the error.
    /// The status line is set at `now`.
    pub fn save(&mut self, store: &dyn SettingsStore, now: Instant) -> Result<bool> {
        let base_url = strip_trailing_slash(self.base_url.trim()).to_string();
        let token = self.token.trim().to_string();

        if base_url.is_empty() || token.is_empty() {
            self.show_status("Please fill in both fields.", StatusKind::Error, now);
            return Ok(false);
        }

        store.set(&Settings::new(base_url, token))?;
        self.show_status("Settings saved!", StatusKind::Success, now);
        Ok(true)
    }

    fn show_status(&mut self, text: &str, kind: StatusKind, now: Instant) {
        let message = StatusMessage {
            text: text.to_string(),
            kind,
        };
        self.status = Some((message, now + STATUS_DURATION));
    }

    /// Status line as seen at `now`; it clears itself three seconds after it was set
    pub fn status(&self, now: Instant) -> Option<&StatusMessage> {
        match &self.status {
            Some((message, clear_at)) if now < *clear_at => Some(message),
            _ => None,
        }
    }
}
