//! Effects produced by state transitions

use super::state::{Attachment, Message, ReplyToken};

/// What the reply source is asked to answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRequest {
    pub token: ReplyToken,
    pub text: Option<String>,
    pub attachment: Option<Attachment>,
}

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Ask the reply source for an answer (spawns as background task)
    RequestReply { request: ReplyRequest },

    /// A message was appended to the log
    NotifyMessage { message: Message },

    /// An existing message changed (reveal toggle)
    NotifyMessageUpdated { message: Message },

    /// Draft, flags or phase changed
    NotifyStateChange,

    /// A reply failed; diagnostics only, nothing user-visible
    LogReplyFailure { token: ReplyToken, error: String },
}

impl Effect {
    pub fn request_reply(request: ReplyRequest) -> Self {
        Effect::RequestReply { request }
    }

    pub fn notify_message(message: Message) -> Self {
        Effect::NotifyMessage { message }
    }
}
