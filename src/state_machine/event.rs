//! Events that can occur in a conversation

use super::state::{Message, ReplyToken};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    DraftEdited {
        text: String,
    },
    ImageAttached {
        location: String,
    },
    AttachmentCleared,
    SendRequested {
        /// Id for the user message, generated by the caller
        message_id: Uuid,
        sent_at: DateTime<Utc>,
    },
    RevealToggled {
        message_id: Uuid,
    },

    // Reply events
    ReplyArrived {
        token: ReplyToken,
        message: Message,
    },
    ReplyFailed {
        token: ReplyToken,
        error: String,
    },
}

impl Event {
    /// A send stamped with a fresh id and the current time
    #[cfg(test)]
    pub fn send_now() -> Self {
        Event::SendRequested {
            message_id: Uuid::new_v4(),
            sent_at: Utc::now(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::DraftEdited { .. } => "draft_edited",
            Event::ImageAttached { .. } => "image_attached",
            Event::AttachmentCleared => "attachment_cleared",
            Event::SendRequested { .. } => "send_requested",
            Event::RevealToggled { .. } => "reveal_toggled",
            Event::ReplyArrived { .. } => "reply_arrived",
            Event::ReplyFailed { .. } => "reply_failed",
        }
    }
}
