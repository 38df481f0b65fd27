//! Conversation state types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Hard cap on draft length, counted in characters
pub const MAX_CHARACTERS: usize = 220;

// ============================================================================
// Messages
// ============================================================================

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    User,
    System,
}

/// Kind of media carried by an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    #[default]
    Image,
}

/// Reference to media attached to a draft or a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: AttachmentKind,
    /// URI or filesystem path of the media
    pub location: String,
}

impl Attachment {
    pub fn image(location: impl Into<String>) -> Self {
        Self {
            kind: AttachmentKind::Image,
            location: location.into(),
        }
    }
}

/// A single entry in the conversation log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
    pub origin: Origin,
    pub created_at: DateTime<Utc>,
    /// Toggled by a long press; shows the export control
    #[serde(default)]
    pub reveal_actions: bool,
}

impl Message {
    /// Build a message, returning None when it would carry neither text nor media
    pub fn new(
        id: Uuid,
        origin: Origin,
        text: Option<String>,
        attachment: Option<Attachment>,
        created_at: DateTime<Utc>,
    ) -> Option<Self> {
        let text = text.filter(|t| !t.trim().is_empty());
        if text.is_none() && attachment.is_none() {
            return None;
        }
        Some(Self {
            id,
            text,
            attachment,
            origin,
            created_at,
            reveal_actions: false,
        })
    }

    /// Export controls are only offered under replies
    pub fn export_action_visible(&self) -> bool {
        self.reveal_actions && self.origin == Origin::System
    }
}

// ============================================================================
// Draft
// ============================================================================

/// The user's unsent input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Draft {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
}

impl Draft {
    /// True when the draft holds nothing at all
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.attachment.is_none()
    }

    /// True when `send` would accept this draft
    pub fn is_sendable(&self) -> bool {
        !self.text.trim().is_empty() || self.attachment.is_some()
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Cut `text` down to at most `MAX_CHARACTERS` characters
pub fn truncate_to_limit(text: &str) -> String {
    text.chars().take(MAX_CHARACTERS).collect()
}

// ============================================================================
// Reply tracking
// ============================================================================

/// Identifier of one outstanding reply request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplyToken(pub u64);

impl fmt::Display for ReplyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reply-{}", self.0)
    }
}

/// Whether a send may start while another reply is still pending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SendPolicy {
    /// Every send starts its own reply, even if others are in flight
    #[default]
    AllowOverlap,
    /// Sends are rejected while a reply is pending
    Serialize,
}

// ============================================================================
// Conversation State
// ============================================================================

/// Coarse phase of the conversation, derived from the state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// No draft, no pending reply
    Idle,
    /// Draft is non-empty
    Composing,
    /// At least one reply is pending
    Sending,
}

/// Full state of one conversation session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ConversationState {
    messages: Vec<Message>,
    draft: Draft,
    has_started: bool,
    pending_replies: BTreeSet<ReplyToken>,
    next_reply_token: u64,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn has_started(&self) -> bool {
        self.has_started
    }

    pub fn is_awaiting_reply(&self) -> bool {
        !self.pending_replies.is_empty()
    }

    pub fn pending_replies(&self) -> impl Iterator<Item = ReplyToken> + '_ {
        self.pending_replies.iter().copied()
    }

    pub fn message(&self, id: Uuid) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn phase(&self) -> Phase {
        if self.is_awaiting_reply() {
            Phase::Sending
        } else if self.draft.is_empty() {
            Phase::Idle
        } else {
            Phase::Composing
        }
    }

    // Mutators are crate-private: only the transition function changes state.

    pub(crate) fn set_draft_text(&mut self, text: String) {
        self.draft.text = text;
    }

    pub(crate) fn set_draft_attachment(&mut self, attachment: Option<Attachment>) {
        self.draft.attachment = attachment;
    }

    pub(crate) fn take_draft(&mut self) -> Draft {
        std::mem::take(&mut self.draft)
    }

    pub(crate) fn mark_started(&mut self) {
        self.has_started = true;
    }

    pub(crate) fn push_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub(crate) fn message_mut(&mut self, id: Uuid) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    pub(crate) fn allocate_reply(&mut self) -> ReplyToken {
        let token = ReplyToken(self.next_reply_token);
        self.next_reply_token += 1;
        self.pending_replies.insert(token);
        token
    }

    pub(crate) fn settle_reply(&mut self, token: ReplyToken) -> bool {
        self.pending_replies.remove(&token)
    }
}

/// Context for a session (immutable configuration)
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub session_id: String,
    pub send_policy: SendPolicy,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>, send_policy: SendPolicy) -> Self {
        Self {
            session_id: session_id.into(),
            send_policy,
        }
    }
}
