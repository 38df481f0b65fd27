//! Reply error types

use thiserror::Error;

/// Reply error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ReplyError {
    pub kind: ReplyErrorKind,
    pub message: String,
}

impl ReplyError {
    pub fn new(kind: ReplyErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ReplyErrorKind::Unavailable, message)
    }

    pub fn invalid_template(message: impl Into<String>) -> Self {
        Self::new(ReplyErrorKind::InvalidTemplate, message)
    }
}

/// Error classification for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyErrorKind {
    /// The source could not produce a reply at all
    Unavailable,
    /// A template would produce an empty message
    InvalidTemplate,
}
