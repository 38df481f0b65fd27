//! Runtime for a conversation session
//!
//! One task owns the state. Handles talk to it over channels, so every
//! mutation is applied in order on the same context.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;
pub use traits::*;

use crate::attachment::PickOutcome;
use crate::export::{render_document, ExportError};
use crate::state_machine::{
    ConversationState, Draft, Event, Message, Phase, SessionContext, TransitionError,
};
use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session runtime has stopped")]
    Closed,
}

/// An event plus an optional acknowledgement channel
#[derive(Debug)]
pub struct Command {
    pub event: Event,
    /// Receives whether the event changed the state, or why it was rejected
    pub ack: Option<oneshot::Sender<Result<bool, TransitionError>>>,
}

/// Notifications for renderers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    MessageAppended {
        message: Message,
    },
    MessageUpdated {
        message: Message,
    },
    StateChanged {
        phase: Phase,
        awaiting_reply: bool,
        has_started: bool,
        draft: Draft,
    },
}

impl SessionEvent {
    pub fn state_changed(state: &ConversationState) -> Self {
        SessionEvent::StateChanged {
            phase: state.phase(),
            awaiting_reply: state.is_awaiting_reply(),
            has_started: state.has_started(),
            draft: state.draft().clone(),
        }
    }
}

/// What happened to a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// Accepted but nothing changed (a cancelled pick, clearing an empty draft attachment)
    Unchanged,
    Ignored(TransitionError),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }
}

/// What happened to a send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Sent { message_id: Uuid },
    Ignored(TransitionError),
}

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<Command>,
    state_rx: watch::Receiver<ConversationState>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
    exporter: Arc<dyn Exporter>,
}

/// Start a session runtime on the current tokio runtime
pub fn spawn_session<R>(
    context: SessionContext,
    reply_source: R,
    exporter: Arc<dyn Exporter>,
) -> SessionHandle
where
    R: ReplySource + 'static,
{
    let (command_tx, command_rx) = mpsc::channel(32);
    let (broadcast_tx, _) = broadcast::channel(128);
    let (state_tx, state_rx) = watch::channel(ConversationState::new());

    let runtime = SessionRuntime::new(
        context,
        reply_source,
        command_rx,
        broadcast_tx.clone(),
        state_tx,
    );
    tokio::spawn(runtime.run());

    SessionHandle {
        command_tx,
        state_rx,
        broadcast_tx,
        exporter,
    }
}

impl SessionHandle {
    /// Send an event and wait until the runtime has applied or rejected it
    async fn dispatch(&self, event: Event) -> Result<Result<bool, TransitionError>, SessionError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.command_tx
            .send(Command {
                event,
                ack: Some(ack_tx),
            })
            .await
            .map_err(|_| SessionError::Closed)?;
        ack_rx.await.map_err(|_| SessionError::Closed)
    }

    async fn apply(&self, event: Event) -> Result<Outcome, SessionError> {
        Ok(match self.dispatch(event).await? {
            Ok(true) => Outcome::Applied,
            Ok(false) => Outcome::Unchanged,
            Err(e) => Outcome::Ignored(e),
        })
    }

    /// Replace the draft text; input beyond the limit is cut off
    pub async fn update_draft_text(&self, text: impl Into<String>) -> Result<Outcome, SessionError> {
        self.apply(Event::DraftEdited { text: text.into() }).await
    }

    pub async fn attach_image(&self, location: impl Into<String>) -> Result<Outcome, SessionError> {
        self.apply(Event::ImageAttached {
            location: location.into(),
        })
        .await
    }

    pub async fn clear_attachment(&self) -> Result<Outcome, SessionError> {
        self.apply(Event::AttachmentCleared).await
    }

    /// Ask the picker for an image and attach it; a cancelled pick changes nothing
    pub async fn pick_and_attach<P>(&self, picker: &P) -> Result<Outcome, SessionError>
    where
        P: ImagePicker + ?Sized,
    {
        match picker.pick_image().await {
            PickOutcome::Picked(location) => self.attach_image(location).await,
            PickOutcome::Cancelled => Ok(Outcome::Unchanged),
        }
    }

    /// Commit the draft as a user message and start a reply
    pub async fn send(&self) -> Result<SendOutcome, SessionError> {
        let message_id = Uuid::new_v4();
        let event = Event::SendRequested {
            message_id,
            sent_at: Utc::now(),
        };
        Ok(match self.dispatch(event).await? {
            Ok(_) => SendOutcome::Sent { message_id },
            Err(e) => SendOutcome::Ignored(e),
        })
    }

    pub async fn toggle_reveal_actions(&self, message_id: Uuid) -> Result<Outcome, SessionError> {
        self.apply(Event::RevealToggled { message_id }).await
    }

    /// Current state
    pub fn snapshot(&self) -> ConversationState {
        self.state_rx.borrow().clone()
    }

    /// Immutable copy of one message, for export or display
    pub fn message(&self, message_id: Uuid) -> Option<Message> {
        self.state_rx.borrow().message(message_id).cloned()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Wait until no reply is pending
    pub async fn settled(&self) -> Result<ConversationState, SessionError> {
        let mut rx = self.state_rx.clone();
        let state = rx
            .wait_for(|state| !state.is_awaiting_reply())
            .await
            .map_err(|_| SessionError::Closed)?;
        Ok(state.clone())
    }

    /// Render a message and hand it to the exporter.
    ///
    /// Failures are logged and reported as `None`; nothing else changes.
    pub async fn export_message(&self, message_id: Uuid) -> Option<PathBuf> {
        match self.try_export(message_id).await {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(%message_id, error = %e, "Message export failed");
                None
            }
        }
    }

    async fn try_export(&self, message_id: Uuid) -> Result<PathBuf, ExportError> {
        let message = self
            .message(message_id)
            .ok_or(ExportError::MessageNotFound(message_id))?;
        let document = render_document(&message)?;
        self.exporter.export(&document).await
    }
}
