//! Reply sources
//!
//! The conversation only ever talks to a `ReplySource`; the canned simulator
//! is the one shipped implementation.

mod canned;
mod error;
mod selector;

pub use canned::CannedReplies;
pub use error::ReplyError;

#[cfg(test)]
pub use canned::{DEFAULT_TEMPLATES, REPLY_DELAY};
#[cfg(test)]
pub use selector::FixedSelector;

use crate::runtime::ReplySource;
use crate::state_machine::{Message, ReplyRequest};
use async_trait::async_trait;
use std::sync::Arc;

/// Logging wrapper for reply sources
pub struct LoggingReplySource {
    inner: Arc<dyn ReplySource>,
    name: String,
}

impl LoggingReplySource {
    pub fn new(inner: Arc<dyn ReplySource>) -> Self {
        let name = inner.name().to_string();
        Self { inner, name }
    }
}

#[async_trait]
impl ReplySource for LoggingReplySource {
    async fn reply(&self, request: &ReplyRequest) -> Result<Message, ReplyError> {
        let start = std::time::Instant::now();
        let result = self.inner.reply(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(message) => {
                tracing::info!(
                    source = %self.name,
                    token = %request.token,
                    message_id = %message.id,
                    duration_ms = %duration.as_millis(),
                    has_attachment = message.attachment.is_some(),
                    "Reply completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    source = %self.name,
                    token = %request.token,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    "Reply failed"
                );
            }
        }

        result
    }

    fn name(&self) -> &str {
        &self.name
    }
}
