//! Pure state transition function
//!
//! Given the same state, context and event this always produces the same
//! new state and effects. Ids and timestamps arrive inside events.

use super::effect::ReplyRequest;
use super::state::{
    truncate_to_limit, Attachment, ConversationState, Message, Origin, ReplyToken, SendPolicy,
    SessionContext,
};
use super::{Effect, Event};
use thiserror::Error;
use uuid::Uuid;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConversationState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConversationState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Events the state machine declines to apply.
///
/// None of these are failures from the user's point of view; the runtime
/// treats them as no-ops.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Nothing to send: draft has no text and no attachment")]
    EmptyDraft,
    #[error("A reply is still pending")]
    ReplyPending,
    #[error("Attachment location is empty")]
    EmptyAttachment,
    #[error("Message not found: {0}")]
    UnknownMessage(Uuid),
    #[error("No pending reply for {0}")]
    UnknownReply(ReplyToken),
    #[error("Message id already in the log: {0}")]
    DuplicateMessage(Uuid),
    #[error("Reply has no text and no attachment")]
    EmptyReply,
}

/// Pure transition function
pub fn transition(
    state: &ConversationState,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match event {
        // ============================================================
        // Draft editing
        // ============================================================
        Event::DraftEdited { text } => {
            let text = truncate_to_limit(&text);
            if text == state.draft().text {
                return Ok(TransitionResult::new(state.clone()));
            }
            let mut next = state.clone();
            next.set_draft_text(text);
            Ok(TransitionResult::new(next).with_effect(Effect::NotifyStateChange))
        }

        Event::ImageAttached { location } => {
            let location = location.trim();
            if location.is_empty() {
                return Err(TransitionError::EmptyAttachment);
            }
            let mut next = state.clone();
            // At most one attachment per draft; a new pick replaces the old one
            next.set_draft_attachment(Some(Attachment::image(location)));
            Ok(TransitionResult::new(next).with_effect(Effect::NotifyStateChange))
        }

        Event::AttachmentCleared => {
            if state.draft().attachment.is_none() {
                return Ok(TransitionResult::new(state.clone()));
            }
            let mut next = state.clone();
            next.set_draft_attachment(None);
            Ok(TransitionResult::new(next).with_effect(Effect::NotifyStateChange))
        }

        // ============================================================
        // Sending
        // ============================================================
        Event::SendRequested {
            message_id,
            sent_at,
        } => {
            if !state.draft().is_sendable() {
                return Err(TransitionError::EmptyDraft);
            }
            if context.send_policy == SendPolicy::Serialize && state.is_awaiting_reply() {
                return Err(TransitionError::ReplyPending);
            }
            if state.message(message_id).is_some() {
                return Err(TransitionError::DuplicateMessage(message_id));
            }

            let mut next = state.clone();
            next.mark_started();
            let draft = next.take_draft();
            let message = Message::new(
                message_id,
                Origin::User,
                Some(draft.text),
                draft.attachment,
                sent_at,
            )
            .ok_or(TransitionError::EmptyDraft)?;
            let request = ReplyRequest {
                token: next.allocate_reply(),
                text: message.text.clone(),
                attachment: message.attachment.clone(),
            };
            next.push_message(message.clone());

            Ok(TransitionResult::new(next)
                .with_effect(Effect::notify_message(message))
                .with_effect(Effect::NotifyStateChange)
                .with_effect(Effect::request_reply(request)))
        }

        // ============================================================
        // Reply handling
        // ============================================================
        Event::ReplyArrived { token, message } => {
            let mut next = state.clone();
            if !next.settle_reply(token) {
                return Err(TransitionError::UnknownReply(token));
            }
            match accept_reply(state, message) {
                Ok(message) => {
                    next.push_message(message.clone());
                    Ok(TransitionResult::new(next).with_effects([
                        Effect::notify_message(message),
                        Effect::NotifyStateChange,
                    ]))
                }
                // The token is settled either way; a malformed reply counts as a failed one
                Err(reason) => Ok(TransitionResult::new(next).with_effects([
                    Effect::LogReplyFailure {
                        token,
                        error: reason.to_string(),
                    },
                    Effect::NotifyStateChange,
                ])),
            }
        }

        Event::ReplyFailed { token, error } => {
            let mut next = state.clone();
            if !next.settle_reply(token) {
                return Err(TransitionError::UnknownReply(token));
            }
            Ok(TransitionResult::new(next).with_effects([
                Effect::LogReplyFailure { token, error },
                Effect::NotifyStateChange,
            ]))
        }

        // ============================================================
        // Message actions
        // ============================================================
        Event::RevealToggled { message_id } => {
            let mut next = state.clone();
            let message = next
                .message_mut(message_id)
                .ok_or(TransitionError::UnknownMessage(message_id))?;
            message.reveal_actions = !message.reveal_actions;
            let updated = message.clone();
            Ok(TransitionResult::new(next)
                .with_effect(Effect::NotifyMessageUpdated { message: updated }))
        }
    }
}

/// Rebuild a reply as a fresh system message, refusing ids already in the log
fn accept_reply(state: &ConversationState, reply: Message) -> Result<Message, TransitionError> {
    if state.message(reply.id).is_some() {
        return Err(TransitionError::DuplicateMessage(reply.id));
    }
    Message::new(
        reply.id,
        Origin::System,
        reply.text,
        reply.attachment,
        reply.created_at,
    )
    .ok_or(TransitionError::EmptyReply)
}
