//! JSON value editor for the selected key.
//!
//! Holds the last saved text and the edited text; the two differing is what
//! makes the editor dirty. Values are always read and written as whole
//! documents, last writer wins.

use std::time::{Duration, Instant};

use serde_json::Value;

use crate::tree::RequestToken;
use crate::{NamespacePath, TextBuffer};

/// How long "Saved!" stays up before the editor returns to idle.
pub const SUCCESS_DISPLAY: Duration = Duration::from_secs(2);

pub const INVALID_JSON_MESSAGE: &str = "Invalid JSON format.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorStatus {
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub key: NamespacePath,
    pub token: RequestToken,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub key: NamespacePath,
    pub value: Value,
    pub token: RequestToken,
}

#[derive(Debug)]
enum Pending {
    Load,
    /// Text that becomes the saved copy once the write succeeds.
    Save(String),
}

#[derive(Debug)]
pub struct ValueEditor {
    key: Option<NamespacePath>,
    original: String,
    buffer: TextBuffer,
    status: EditorStatus,
    error: Option<String>,
    generation: u64,
    pending: Option<(RequestToken, Pending)>,
    saved_at: Option<Instant>,
}

impl Default for ValueEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueEditor {
    pub fn new() -> Self {
        Self {
            key: None,
            original: String::new(),
            buffer: TextBuffer::new(),
            status: EditorStatus::Idle,
            error: None,
            generation: 0,
            pending: None,
            saved_at: None,
        }
    }

    pub fn key(&self) -> Option<&NamespacePath> {
        self.key.as_ref()
    }

    pub fn status(&self) -> EditorStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut TextBuffer {
        &mut self.buffer
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn content(&self) -> String {
        self.buffer.text()
    }

    /// Replace the edited text wholesale.
    pub fn set_content(&mut self, text: &str) {
        self.buffer.set_text(text);
    }

    pub fn is_dirty(&self) -> bool {
        self.buffer.text() != self.original
    }

    pub fn can_save(&self) -> bool {
        self.key.is_some() && self.is_dirty() && self.status != EditorStatus::Loading
    }

    pub fn can_revert(&self) -> bool {
        self.is_dirty()
    }

    pub fn save_label(&self) -> &'static str {
        match self.status {
            EditorStatus::Loading => "Saving...",
            EditorStatus::Success => "Saved!",
            _ => "Save",
        }
    }

    fn next_token(&mut self) -> RequestToken {
        self.generation += 1;
        RequestToken(self.generation)
    }

    /// Switch to another key (or none). Any outstanding request is orphaned.
    pub fn select(&mut self, key: Option<NamespacePath>) -> Option<LoadRequest> {
        let token = self.next_token();
        self.saved_at = None;
        self.error = None;
        self.key = key.clone();

        let Some(key) = key else {
            self.pending = None;
            self.original.clear();
            self.buffer.set_text("");
            self.status = EditorStatus::Idle;
            return None;
        };

        self.status = EditorStatus::Loading;
        self.pending = Some((token, Pending::Load));
        Some(LoadRequest { key, token })
    }

    fn take_pending(&mut self, token: RequestToken) -> Option<Pending> {
        if !matches!(&self.pending, Some((current, _)) if *current == token) {
            tracing::debug!(token = token.0, "Dropping stale editor response");
            return None;
        }
        self.pending.take().map(|(_, p)| p)
    }

    /// Apply a fetched value. Returns false if the response was stale.
    pub fn apply_load(&mut self, token: RequestToken, result: Result<Value, String>) -> bool {
        if !matches!(self.take_pending(token), Some(Pending::Load)) {
            return false;
        }
        match result {
            Ok(value) => {
                let text =
                    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
                self.buffer.set_text(&text);
                self.original = text;
                self.status = EditorStatus::Idle;
            }
            Err(message) => {
                self.error = Some(message);
                self.status = EditorStatus::Error;
            }
        }
        true
    }

    /// Validate the edited text and produce the write to perform.
    ///
    /// Invalid JSON puts the editor into the error state without a request.
    pub fn save(&mut self) -> Option<SaveRequest> {
        if !self.can_save() {
            return None;
        }
        let key = self.key.clone()?;
        let text = self.buffer.text();
        let value = match serde_json::from_str::<Value>(&text) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "Rejected invalid JSON");
                self.error = Some(INVALID_JSON_MESSAGE.to_string());
                self.status = EditorStatus::Error;
                return None;
            }
        };

        let token = self.next_token();
        self.error = None;
        self.status = EditorStatus::Loading;
        self.pending = Some((token, Pending::Save(text)));
        Some(SaveRequest { key, value, token })
    }

    /// Apply the outcome of a write. Returns false if the response was stale.
    pub fn apply_save(
        &mut self,
        token: RequestToken,
        result: Result<(), String>,
        now: Instant,
    ) -> bool {
        let Some(Pending::Save(text)) = self.take_pending(token) else {
            return false;
        };
        match result {
            Ok(()) => {
                self.original = text;
                self.status = EditorStatus::Success;
                self.saved_at = Some(now);
            }
            Err(message) => {
                self.error = Some(message);
                self.status = EditorStatus::Error;
            }
        }
        true
    }

    /// Discard edits.
    pub fn revert(&mut self) {
        let original = self.original.clone();
        self.buffer.set_text(&original);
    }

    /// Return to idle once the success notice has been shown long enough.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.saved_at {
            Some(at)
                if self.status == EditorStatus::Success
                    && now.duration_since(at) >= SUCCESS_DISPLAY =>
            {
                self.status = EditorStatus::Idle;
                self.saved_at = None;
                true
            }
            _ => false,
        }
    }
}
