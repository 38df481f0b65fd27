//! Canned reply simulator
//!
//! Stands in for a real backend: waits a fixed delay, then answers with one
//! of a few fixed templates. The user's text does not affect the choice.

use super::error::ReplyError;
use super::selector::{RandomSelector, ReplySelector};
use crate::runtime::ReplySource;
use crate::state_machine::{Attachment, Message, Origin, ReplyRequest};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Time the simulator "thinks" before answering
pub const REPLY_DELAY: Duration = Duration::from_secs(2);

/// Placeholder images paired with the first two templates
pub const PLACEHOLDER_IMAGE_PORTRAIT: &str = "https://picsum.photos/200/300";
pub const PLACEHOLDER_IMAGE_LANDSCAPE: &str = "https://picsum.photos/300/200";

/// One canned answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTemplate {
    pub text: &'static str,
    pub image: Option<&'static str>,
}

pub const DEFAULT_TEMPLATES: [ReplyTemplate; 3] = [
    ReplyTemplate {
        text: "Thanks for your message! Here is a sample reply with an image.",
        image: Some(PLACEHOLDER_IMAGE_PORTRAIT),
    },
    ReplyTemplate {
        text: "I understand your message. Let me show you something.",
        image: Some(PLACEHOLDER_IMAGE_LANDSCAPE),
    },
    ReplyTemplate {
        text: "Here is a text-only reply without an image.",
        image: None,
    },
];

/// Mock reply source with a fixed delay and a pluggable selection strategy
pub struct CannedReplies {
    templates: Vec<ReplyTemplate>,
    selector: Arc<dyn ReplySelector>,
}

impl CannedReplies {
    /// The default template set with uniform random selection
    pub fn new() -> Self {
        Self::with_selector(Arc::new(RandomSelector))
    }

    pub fn with_selector(selector: Arc<dyn ReplySelector>) -> Self {
        Self {
            templates: DEFAULT_TEMPLATES.to_vec(),
            selector,
        }
    }

    #[cfg(test)]
    pub fn templates(&self) -> &[ReplyTemplate] {
        &self.templates
    }

    fn build_reply(&self) -> Result<Message, ReplyError> {
        if self.templates.is_empty() {
            return Err(ReplyError::unavailable("No reply templates configured"));
        }
        let index = self.selector.select(self.templates.len());
        let template = self
            .templates
            .get(index)
            .ok_or_else(|| ReplyError::invalid_template(format!("No template at {index}")))?;

        Message::new(
            Uuid::new_v4(),
            Origin::System,
            Some(template.text.to_string()),
            template.image.map(Attachment::image),
            Utc::now(),
        )
        .ok_or_else(|| ReplyError::invalid_template(format!("Template {index} is empty")))
    }
}

impl Default for CannedReplies {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplySource for CannedReplies {
    async fn reply(&self, request: &ReplyRequest) -> Result<Message, ReplyError> {
        tracing::debug!(token = %request.token, "Simulating reply");
        tokio::time::sleep(REPLY_DELAY).await;
        self.build_reply()
    }

    fn name(&self) -> &'static str {
        "canned"
    }
}
