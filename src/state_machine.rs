//! Core conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::{Effect, ReplyRequest};
pub use event::Event;
pub use state::{
    Attachment, AttachmentKind, ConversationState, Draft, Message, Origin, Phase, ReplyToken,
    SendPolicy, SessionContext, MAX_CHARACTERS,
};
pub use transition::{transition, TransitionError, TransitionResult};
