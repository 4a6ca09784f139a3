//! Errors surfaced by the content cache.

use thiserror::Error;

/// Errors visible to callers of the content cache
///
/// Transport and storage failures never appear here directly. They are
/// either recovered (a usable snapshot exists) or folded into `LoadFailed`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContentError {
    /// No snapshot anywhere and the fetch cycle failed
    #[error("Failed to load content for '{language}': {reason}")]
    LoadFailed { language: String, reason: String },

    #[error("Unknown quest type: {0}")]
    UnknownQuestType(String),

    #[error("Malformed payload for quest {quest_id}: {reason}")]
    MalformedQuestPayload { quest_id: String, reason: String },
}

impl ContentError {
    pub fn load_failed(language: impl Into<String>, reason: impl Into<String>) -> Self {
        ContentError::LoadFailed {
            language: language.into(),
            reason: reason.into(),
        }
    }
}
