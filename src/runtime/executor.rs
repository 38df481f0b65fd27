//! Session runtime executor

use super::traits::ReplySource;
use super::{Command, SessionEvent};
use crate::state_machine::{
    transition, ConversationState, Effect, Event, ReplyRequest, SessionContext, TransitionError,
};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};

/// Owns the conversation state and applies every event to it, one at a time
pub struct SessionRuntime<R>
where
    R: ReplySource + 'static,
{
    context: SessionContext,
    state: ConversationState,
    reply_source: Arc<R>,
    command_rx: mpsc::Receiver<Command>,
    /// Spawned reply tasks report back through this channel
    reply_tx: mpsc::Sender<Event>,
    reply_rx: mpsc::Receiver<Event>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
    state_tx: watch::Sender<ConversationState>,
    commands_closed: bool,
}

impl<R> SessionRuntime<R>
where
    R: ReplySource + 'static,
{
    pub fn new(
        context: SessionContext,
        reply_source: R,
        command_rx: mpsc::Receiver<Command>,
        broadcast_tx: broadcast::Sender<SessionEvent>,
        state_tx: watch::Sender<ConversationState>,
    ) -> Self {
        let (reply_tx, reply_rx) = mpsc::channel(32);
        let state = state_tx.borrow().clone();
        Self {
            context,
            state,
            reply_source: Arc::new(reply_source),
            command_rx,
            reply_tx,
            reply_rx,
            broadcast_tx,
            state_tx,
            commands_closed: false,
        }
    }

    /// Process events until every handle is gone and no reply is outstanding
    pub async fn run(mut self) {
        tracing::info!(
            session_id = %self.context.session_id,
            policy = ?self.context.send_policy,
            reply_source = %self.reply_source.name(),
            "Starting session runtime"
        );

        loop {
            if self.commands_closed && !self.state.is_awaiting_reply() {
                break;
            }

            tokio::select! {
                command = self.command_rx.recv(), if !self.commands_closed => {
                    if let Some(Command { event, ack }) = command {
                        let result = self.process_event(event);
                        if let Some(ack) = ack {
                            let _ = ack.send(result);
                        }
                    } else {
                        tracing::debug!("All session handles dropped");
                        self.commands_closed = true;
                    }
                }
                Some(event) = self.reply_rx.recv() => {
                    let _ = self.process_event(event);
                }
            }
        }

        tracing::info!(session_id = %self.context.session_id, "Session runtime stopped");
    }

    /// Apply one event; `Ok(false)` means it was accepted but changed nothing
    fn process_event(&mut self, event: Event) -> Result<bool, TransitionError> {
        let name = event.name();
        let result = match transition(&self.state, &self.context, event) {
            Ok(r) => r,
            Err(e) => {
                // Rejections are no-ops, never surfaced as errors
                tracing::debug!(event = name, reason = %e, "Event ignored");
                return Err(e);
            }
        };

        tracing::debug!(event = name, effects = result.effects.len(), "Event applied");
        let changed = result.new_state != self.state;
        if changed {
            self.state = result.new_state;
            self.state_tx.send_replace(self.state.clone());
        }

        for effect in result.effects {
            self.execute_effect(effect);
        }
        Ok(changed)
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::RequestReply { request } => self.spawn_reply(request),

            Effect::NotifyMessage { message } => {
                let _ = self
                    .broadcast_tx
                    .send(SessionEvent::MessageAppended { message });
            }

            Effect::NotifyMessageUpdated { message } => {
                let _ = self
                    .broadcast_tx
                    .send(SessionEvent::MessageUpdated { message });
            }

            Effect::NotifyStateChange => {
                let _ = self
                    .broadcast_tx
                    .send(SessionEvent::state_changed(&self.state));
            }

            Effect::LogReplyFailure { token, error } => {
                tracing::warn!(
                    session_id = %self.context.session_id,
                    %token,
                    %error,
                    "Reply failed; nothing appended"
                );
            }
        }
    }

    fn spawn_reply(&self, request: ReplyRequest) {
        let reply_source = self.reply_source.clone();
        let reply_tx = self.reply_tx.clone();

        tokio::spawn(async move {
            tracing::debug!(token = %request.token, "Requesting reply (background)");
            let event = match reply_source.reply(&request).await {
                Ok(message) => Event::ReplyArrived {
                    token: request.token,
                    message,
                },
                Err(e) => Event::ReplyFailed {
                    token: request.token,
                    error: e.to_string(),
                },
            };
            let _ = reply_tx.send(event).await;
        });
    }
}
