//! Mock implementations for testing
//!
//! These mocks enable session tests without timers, files or randomness.

use super::traits::*;
use super::{spawn_session, SessionHandle};
use crate::attachment::PickOutcome;
use crate::export::{ExportDocument, ExportError};
use crate::reply::ReplyError;
use crate::state_machine::{Message, Origin, ReplyRequest, SendPolicy, SessionContext};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

// ============================================================================
// Mock Reply Source
// ============================================================================

/// Reply source that returns queued results after an optional delay
pub struct MockReplySource {
    responses: Mutex<VecDeque<Result<Message, ReplyError>>>,
    delay: Duration,
    /// Record of all requests made
    pub requests: Mutex<Vec<ReplyRequest>>,
}

impl MockReplySource {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            delay,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a text reply
    pub fn queue_text(&self, text: &str) {
        let message = Message::new(
            Uuid::new_v4(),
            Origin::System,
            Some(text.to_string()),
            None,
            Utc::now(),
        )
        .unwrap();
        self.queue_message(message);
    }

    /// Queue a reply exactly as given, even one `Message::new` would refuse
    pub fn queue_message(&self, message: Message) {
        self.responses.lock().unwrap().push_back(Ok(message));
    }

    /// Queue a failure
    pub fn queue_error(&self, error: ReplyError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<ReplyRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplySource for MockReplySource {
    async fn reply(&self, request: &ReplyRequest) -> Result<Message, ReplyError> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ReplyError::unavailable("No mock reply queued")))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

// ============================================================================
// Mock Exporter
// ============================================================================

/// Exporter that records documents instead of writing them
#[derive(Default)]
pub struct MockExporter {
    fail: bool,
    pub documents: Mutex<Vec<ExportDocument>>,
}

impl MockExporter {
    pub fn failing() -> Self {
        Self {
            fail: true,
            documents: Mutex::new(Vec::new()),
        }
    }

    pub fn recorded_documents(&self) -> Vec<ExportDocument> {
        self.documents.lock().unwrap().clone()
    }
}

#[async_trait]
impl Exporter for MockExporter {
    async fn export(&self, document: &ExportDocument) -> Result<PathBuf, ExportError> {
        if self.fail {
            return Err(ExportError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "mock export failure",
            )));
        }
        self.documents.lock().unwrap().push(document.clone());
        Ok(PathBuf::from("/mock").join(document.file_name()))
    }
}

// ============================================================================
// Scripted Picker
// ============================================================================

/// Picker that always returns the same outcome
pub struct ScriptedPicker(pub PickOutcome);

#[async_trait]
impl ImagePicker for ScriptedPicker {
    async fn pick_image(&self) -> PickOutcome {
        self.0.clone()
    }
}

// ============================================================================
// Test Session Builder
// ============================================================================

pub struct TestSession<R: ReplySource + 'static> {
    replies: R,
    exporter: Arc<MockExporter>,
    policy: SendPolicy,
}

impl TestSession<MockReplySource> {
    pub fn new() -> Self {
        Self {
            replies: MockReplySource::new(),
            exporter: Arc::new(MockExporter::default()),
            policy: SendPolicy::AllowOverlap,
        }
    }
}

impl<R: ReplySource + 'static> TestSession<R> {
    pub fn replies<R2: ReplySource + 'static>(self, replies: R2) -> TestSession<R2> {
        TestSession {
            replies,
            exporter: self.exporter,
            policy: self.policy,
        }
    }

    pub fn exporter(mut self, exporter: MockExporter) -> Self {
        self.exporter = Arc::new(exporter);
        self
    }

    pub fn policy(mut self, policy: SendPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> (SessionHandle, Arc<MockExporter>) {
        let context = SessionContext::new("test-session", self.policy);
        let handle = spawn_session(context, self.replies, self.exporter.clone());
        (handle, self.exporter)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reply::{CannedReplies, FixedSelector, DEFAULT_TEMPLATES, REPLY_DELAY};
    use crate::runtime::{Outcome, SendOutcome, SessionEvent};
    use crate::state_machine::{Attachment, Phase, TransitionError, MAX_CHARACTERS};

    fn sent_id(outcome: SendOutcome) -> Uuid {
        match outcome {
            SendOutcome::Sent { message_id } => message_id,
            SendOutcome::Ignored(e) => panic!("send ignored: {e}"),
        }
    }

    /// Scenario: "Hello" gets one user message now, one reply after the delay
    #[tokio::test(start_paused = true)]
    async fn test_hello_scenario_with_canned_replies() {
        let replies = CannedReplies::with_selector(Arc::new(FixedSelector(2)));
        let (session, _) = TestSession::new().replies(replies).build();
        let start = tokio::time::Instant::now();

        session.update_draft_text("Hello").await.unwrap();
        sent_id(session.send().await.unwrap());

        let state = session.snapshot();
        assert_eq!(state.messages().len(), 1);
        assert_eq!(state.messages()[0].origin, Origin::User);
        assert_eq!(state.messages()[0].text.as_deref(), Some("Hello"));
        assert!(state.is_awaiting_reply());
        assert_eq!(state.phase(), Phase::Sending);

        tokio::time::sleep(REPLY_DELAY.saturating_sub(Duration::from_millis(1))).await;
        assert_eq!(session.snapshot().messages().len(), 1);

        let state = session.settled().await.unwrap();
        assert!(start.elapsed() >= REPLY_DELAY);
        assert_eq!(state.messages().len(), 2);
        let reply = &state.messages()[1];
        assert_eq!(reply.origin, Origin::System);
        let text = reply.text.as_deref().unwrap();
        assert!(DEFAULT_TEMPLATES.iter().any(|t| t.text == text));
        assert_eq!(state.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_empty_send_changes_nothing() {
        let (session, _) = TestSession::new().build();
        session.update_draft_text("   ").await.unwrap();
        let before = session.snapshot();

        let outcome = session.send().await.unwrap();

        assert_eq!(outcome, SendOutcome::Ignored(TransitionError::EmptyDraft));
        assert_eq!(session.snapshot(), before);
    }

    #[tokio::test]
    async fn test_draft_cleared_and_started_stays_true() {
        let replies = MockReplySource::new();
        replies.queue_text("one");
        replies.queue_text("two");
        let (session, _) = TestSession::new().replies(replies).build();

        session.update_draft_text("first").await.unwrap();
        session.attach_image("file:///tmp/a.png").await.unwrap();
        sent_id(session.send().await.unwrap());
        let state = session.snapshot();
        assert!(state.draft().is_empty());
        assert!(state.has_started());

        session.settled().await.unwrap();
        session.update_draft_text("second").await.unwrap();
        sent_id(session.send().await.unwrap());
        let state = session.settled().await.unwrap();
        assert!(state.has_started());
        assert_eq!(state.messages().len(), 4);
    }

    #[tokio::test]
    async fn test_typing_past_limit_drops_overflow() {
        let (session, _) = TestSession::new().build();
        let typed: String = "x".repeat(MAX_CHARACTERS) + "y";

        session.update_draft_text(typed).await.unwrap();

        let draft = session.snapshot().draft().clone();
        assert_eq!(draft.char_count(), MAX_CHARACTERS);
        assert!(!draft.text.ends_with('y'));
    }

    #[tokio::test]
    async fn test_latest_attachment_wins() {
        let replies = MockReplySource::new();
        replies.queue_text("ok");
        let (session, _) = TestSession::new().replies(replies).build();

        session.attach_image("file:///tmp/a.png").await.unwrap();
        session.attach_image("file:///tmp/b.png").await.unwrap();
        let id = sent_id(session.send().await.unwrap());

        let sent = session.message(id).unwrap();
        assert_eq!(sent.attachment, Some(Attachment::image("file:///tmp/b.png")));
    }

    #[tokio::test]
    async fn test_reply_receives_sent_text_and_attachment() {
        let replies = Arc::new(MockReplySource::new());
        replies.queue_text("ok");
        let (session, _) = TestSession::new().replies(replies.clone()).build();

        session.update_draft_text("look").await.unwrap();
        session.attach_image("https://example.com/p.png").await.unwrap();
        sent_id(session.send().await.unwrap());
        session.settled().await.unwrap();

        let requests = replies.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].text.as_deref(), Some("look"));
        assert_eq!(
            requests[0].attachment,
            Some(Attachment::image("https://example.com/p.png"))
        );
    }

    #[tokio::test]
    async fn test_reply_failure_clears_pending_without_message() {
        let replies = MockReplySource::new();
        replies.queue_error(ReplyError::unavailable("backend down"));
        let (session, _) = TestSession::new().replies(replies).build();

        session.update_draft_text("Hello").await.unwrap();
        sent_id(session.send().await.unwrap());

        let state = session.settled().await.unwrap();
        assert_eq!(state.messages().len(), 1);
        assert!(!state.is_awaiting_reply());
    }

    #[tokio::test]
    async fn test_malformed_replies_never_reach_the_log() {
        let replies = MockReplySource::new();
        replies.queue_message(Message {
            id: Uuid::new_v4(),
            text: None,
            attachment: None,
            origin: Origin::System,
            created_at: Utc::now(),
            reveal_actions: false,
        });
        replies.queue_message(Message {
            id: Uuid::new_v4(),
            text: Some("pretending".to_string()),
            attachment: None,
            origin: Origin::User,
            created_at: Utc::now(),
            reveal_actions: true,
        });
        let (session, _) = TestSession::new().replies(replies).build();

        session.update_draft_text("first").await.unwrap();
        sent_id(session.send().await.unwrap());
        let state = session.settled().await.unwrap();
        assert_eq!(state.messages().len(), 1);

        session.update_draft_text("second").await.unwrap();
        sent_id(session.send().await.unwrap());
        let state = session.settled().await.unwrap();
        assert_eq!(state.messages().len(), 3);
        let reply = &state.messages()[2];
        assert_eq!(reply.origin, Origin::System);
        assert!(!reply.reveal_actions);
        assert_eq!(reply.text.as_deref(), Some("pretending"));
    }

    #[tokio::test]
    async fn test_clear_reports_whether_anything_was_attached() {
        let (session, _) = TestSession::new().build();

        assert_eq!(session.clear_attachment().await.unwrap(), Outcome::Unchanged);

        session.attach_image("file:///tmp/a.png").await.unwrap();
        assert_eq!(session.clear_attachment().await.unwrap(), Outcome::Applied);
        assert!(session.snapshot().draft().attachment.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_serialize_policy_rejects_send_while_pending() {
        let replies = MockReplySource::with_delay(Duration::from_secs(2));
        replies.queue_text("first reply");
        let (session, _) = TestSession::new()
            .replies(replies)
            .policy(SendPolicy::Serialize)
            .build();

        session.update_draft_text("first").await.unwrap();
        sent_id(session.send().await.unwrap());
        session.update_draft_text("second").await.unwrap();

        let outcome = session.send().await.unwrap();
        assert_eq!(outcome, SendOutcome::Ignored(TransitionError::ReplyPending));
        assert_eq!(session.snapshot().draft().text, "second");

        session.settled().await.unwrap();
        sent_id(session.send().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_sends_each_get_a_reply() {
        let replies = MockReplySource::with_delay(Duration::from_secs(2));
        replies.queue_text("reply one");
        replies.queue_text("reply two");
        let (session, _) = TestSession::new().replies(replies).build();

        session.update_draft_text("one").await.unwrap();
        sent_id(session.send().await.unwrap());
        session.update_draft_text("two").await.unwrap();
        sent_id(session.send().await.unwrap());
        assert_eq!(session.snapshot().pending_replies().count(), 2);

        let state = session.settled().await.unwrap();
        let origins: Vec<_> = state.messages().iter().map(|m| m.origin).collect();
        assert_eq!(
            origins,
            vec![Origin::User, Origin::User, Origin::System, Origin::System]
        );
    }

    #[tokio::test]
    async fn test_toggle_reveal_actions() {
        let replies = MockReplySource::new();
        replies.queue_text("ok");
        let (session, _) = TestSession::new().replies(replies).build();
        session.update_draft_text("Hello").await.unwrap();
        let id = sent_id(session.send().await.unwrap());

        assert!(session.toggle_reveal_actions(id).await.unwrap().is_applied());
        assert!(session.message(id).unwrap().reveal_actions);
        assert!(session.toggle_reveal_actions(id).await.unwrap().is_applied());
        assert!(!session.message(id).unwrap().reveal_actions);

        let unknown = Uuid::new_v4();
        assert_eq!(
            session.toggle_reveal_actions(unknown).await.unwrap(),
            Outcome::Ignored(TransitionError::UnknownMessage(unknown))
        );
    }

    #[tokio::test]
    async fn test_pick_and_attach() {
        let (session, _) = TestSession::new().build();

        let picked = ScriptedPicker(PickOutcome::Picked("file:///tmp/cat.png".to_string()));
        assert!(session.pick_and_attach(&picked).await.unwrap().is_applied());
        assert_eq!(
            session.snapshot().draft().attachment,
            Some(Attachment::image("file:///tmp/cat.png"))
        );

        let cancelled = ScriptedPicker(PickOutcome::Cancelled);
        assert_eq!(
            session.pick_and_attach(&cancelled).await.unwrap(),
            Outcome::Unchanged
        );
        assert!(session.snapshot().draft().attachment.is_some());

        session.clear_attachment().await.unwrap();
        assert!(session.snapshot().draft().attachment.is_none());
    }

    #[tokio::test]
    async fn test_export_message() {
        let replies = MockReplySource::new();
        replies.queue_text("exported reply");
        let (session, exporter) = TestSession::new().replies(replies).build();
        session.update_draft_text("Hello").await.unwrap();
        sent_id(session.send().await.unwrap());
        let state = session.settled().await.unwrap();
        let reply_id = state.messages()[1].id;

        let path = session.export_message(reply_id).await.unwrap();
        assert!(path.ends_with(format!("message-{reply_id}.html")));

        let documents = exporter.recorded_documents();
        assert_eq!(documents.len(), 1);
        assert!(documents[0].html.contains("<p>exported reply</p>"));

        assert_eq!(session.export_message(Uuid::new_v4()).await, None);
    }

    #[tokio::test]
    async fn test_export_failure_is_swallowed() {
        let replies = MockReplySource::new();
        replies.queue_text("ok");
        let (session, _) = TestSession::new()
            .replies(replies)
            .exporter(MockExporter::failing())
            .build();
        session.update_draft_text("Hello").await.unwrap();
        let id = sent_id(session.send().await.unwrap());

        assert_eq!(session.export_message(id).await, None);
        assert!(session.message(id).is_some());
    }

    #[tokio::test]
    async fn test_broadcast_event_sequence() {
        let replies = MockReplySource::new();
        replies.queue_text("hi back");
        let (session, _) = TestSession::new().replies(replies).build();
        let mut events = session.subscribe();

        session.update_draft_text("hi").await.unwrap();
        sent_id(session.send().await.unwrap());
        session.settled().await.unwrap();

        let mut received = Vec::new();
        while let Ok(event) = events.try_recv() {
            received.push(event);
        }

        let appended: Vec<Origin> = received
            .iter()
            .filter_map(|e| match e {
                SessionEvent::MessageAppended { message } => Some(message.origin),
                _ => None,
            })
            .collect();
        assert_eq!(appended, vec![Origin::User, Origin::System]);

        match received.last() {
            Some(SessionEvent::StateChanged {
                awaiting_reply,
                has_started,
                ..
            }) => {
                assert!(!awaiting_reply);
                assert!(has_started);
            }
            other => panic!("expected final state change, got {other:?}"),
        }
    }
}
