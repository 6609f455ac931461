//! Conversation controller: send, fold, stop

use std::sync::Arc;

use futures::StreamExt;
use medchat_ai::{ChatRequest, EncodedImage, Message, decode_stream};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    conversation::Conversation,
    events::ChatEvent,
    handle::ChatHandle,
    session::{Fold, GenerationSession, ReasoningMode},
    transport::Transport,
};

/// Request parameters for every send
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// How replies are split into thinking and content
    pub reasoning: ReasoningMode,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.7,
            reasoning: ReasoningMode::Auto,
        }
    }
}

/// Why a send was not started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Blank text and no images
    EmptyInput,
    /// A generation is already in flight
    Busy,
    /// Sending is disabled (backend not ready)
    Disabled,
}

/// How a send ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SendOutcome {
    /// Stream finished normally, explicitly or by ending
    Completed,
    /// Stopped by the user; partial content kept
    Cancelled,
    /// Transport or server error; the reply carries the error text
    Failed { message: String },
    /// Nothing was sent; the log is unchanged
    Rejected { reason: RejectReason },
}

impl SendOutcome {
    fn rejected(reason: RejectReason) -> Self {
        Self::Rejected { reason }
    }
}

/// Holds the active slot for one send.
///
/// Dropping it without [`SessionGuard::release`] means the send future was
/// dropped mid-flight: the request is cancelled, the slot freed and the
/// session reported as cancelled.
struct SessionGuard {
    session_id: Uuid,
    cancel: CancellationToken,
    handle: ChatHandle,
    event_tx: broadcast::Sender<ChatEvent>,
    released: bool,
}

impl SessionGuard {
    fn release(mut self, outcome: &SendOutcome) {
        self.released = true;
        self.handle.end();
        let _ = self.event_tx.send(ChatEvent::SessionEnd {
            session_id: self.session_id,
            outcome: outcome.clone(),
        });
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        tracing::debug!(session_id = %self.session_id, "send dropped before completion");
        self.cancel.cancel();
        self.handle.end();
        let _ = self.event_tx.send(ChatEvent::SessionEnd {
            session_id: self.session_id,
            outcome: SendOutcome::Cancelled,
        });
    }
}

#[derive(Debug)]
struct ChatState {
    conversation: Conversation,
    staged: Vec<EncodedImage>,
    enabled: bool,
}

/// Owns the conversation log and drives one generation at a time.
///
/// All methods take `&self`; share the controller behind an `Arc` to stage
/// images or stop from other tasks while a send is running. The state lock
/// is never held across an await.
pub struct ChatController {
    config: ChatConfig,
    state: Arc<Mutex<ChatState>>,
    transport: Arc<dyn Transport>,
    event_tx: broadcast::Sender<ChatEvent>,
    handle: ChatHandle,
}

impl ChatController {
    /// Create a new controller
    pub fn new(config: ChatConfig, transport: Arc<dyn Transport>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            config,
            state: Arc::new(Mutex::new(ChatState {
                conversation: Conversation::new(),
                staged: vec![],
                enabled: true,
            })),
            transport,
            event_tx,
            handle: ChatHandle::new(),
        }
    }

    /// Subscribe to controller events
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.event_tx.subscribe()
    }

    /// Get the controller config
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Get a cloneable handle for stopping from external code.
    pub fn handle(&self) -> ChatHandle {
        self.handle.clone()
    }

    /// Snapshot of the conversation log
    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().conversation.messages().to_vec()
    }

    /// Snapshot of the staged images
    pub fn staged_images(&self) -> Vec<EncodedImage> {
        self.state.lock().staged.clone()
    }

    /// Whether a generation is in flight
    pub fn is_generating(&self) -> bool {
        self.handle.is_generating()
    }

    /// Whether sending is currently allowed
    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    /// Gate sending on an externally computed readiness flag
    pub fn set_enabled(&self, enabled: bool) {
        let changed = {
            let mut state = self.state.lock();
            let changed = state.enabled != enabled;
            state.enabled = enabled;
            changed
        };
        if changed {
            tracing::debug!(enabled, "send gate changed");
            let _ = self.event_tx.send(ChatEvent::EnabledChanged { enabled });
        }
    }

    /// Attach an image to the next send
    pub fn stage_image(&self, image: EncodedImage) {
        let count = {
            let mut state = self.state.lock();
            state.staged.push(image);
            state.staged.len()
        };
        let _ = self.event_tx.send(ChatEvent::StagedImagesChanged { count });
    }

    /// Remove a staged image by index
    pub fn unstage_image(&self, index: usize) -> Option<EncodedImage> {
        let (removed, count) = {
            let mut state = self.state.lock();
            if index >= state.staged.len() {
                return None;
            }
            let removed = state.staged.remove(index);
            (removed, state.staged.len())
        };
        let _ = self.event_tx.send(ChatEvent::StagedImagesChanged { count });
        Some(removed)
    }

    /// Clear the log. Refused while a generation is in flight.
    pub fn clear(&self) -> bool {
        let mut state = self.state.lock();
        if self.handle.is_generating() {
            return false;
        }
        state.conversation.clear();
        drop(state);
        let _ = self.event_tx.send(ChatEvent::Cleared);
        true
    }

    /// Cancel the active generation, if any.
    pub fn stop(&self) {
        self.handle.stop();
    }

    /// Send text with the currently staged images
    pub async fn send(&self, text: &str) -> SendOutcome {
        self.run_send(text, None).await
    }

    /// Send text with an explicit image set; staged images are discarded
    pub async fn send_with_images(&self, text: &str, images: Vec<EncodedImage>) -> SendOutcome {
        self.run_send(text, Some(images)).await
    }

    /// Validate input, append the user turn and placeholder, and claim the
    /// active slot. Returns the session and the request to send.
    fn begin_session(
        &self,
        text: &str,
        images: Option<Vec<EncodedImage>>,
    ) -> Result<(GenerationSession, SessionGuard, ChatRequest), RejectReason> {
        let mut state = self.state.lock();

        if self.handle.is_generating() {
            return Err(RejectReason::Busy);
        }
        if !state.enabled {
            return Err(RejectReason::Disabled);
        }

        let text = text.trim();
        let has_images = images
            .as_ref()
            .map(|imgs| !imgs.is_empty())
            .unwrap_or(!state.staged.is_empty());
        if text.is_empty() && !has_images {
            return Err(RejectReason::EmptyInput);
        }

        let placeholder = Message::assistant_empty();
        let session = GenerationSession::new(self.config.reasoning, placeholder.timestamp);
        if !self.handle.begin(session.id(), session.cancel_token()) {
            return Err(RejectReason::Busy);
        }
        let guard = SessionGuard {
            session_id: session.id(),
            cancel: session.cancel_token(),
            handle: self.handle.clone(),
            event_tx: self.event_tx.clone(),
            released: false,
        };

        let staged = std::mem::take(&mut state.staged);
        let images = images.unwrap_or(staged);
        let user_message = Message::user_with_images(text, images);
        state.conversation.push(user_message.clone());
        let request = ChatRequest::streaming(
            state.conversation.messages(),
            self.config.max_tokens,
            self.config.temperature,
        );
        state.conversation.push(placeholder.clone());
        drop(state);

        let _ = self.event_tx.send(ChatEvent::StagedImagesChanged { count: 0 });
        let _ = self.event_tx.send(ChatEvent::MessageAppended {
            message: user_message,
        });
        let _ = self.event_tx.send(ChatEvent::MessageAppended {
            message: placeholder,
        });
        let _ = self.event_tx.send(ChatEvent::SessionStart {
            session_id: session.id(),
        });

        Ok((session, guard, request))
    }

    async fn run_send(&self, text: &str, images: Option<Vec<EncodedImage>>) -> SendOutcome {
        let (mut session, guard, request) = match self.begin_session(text, images) {
            Ok(started) => started,
            Err(reason) => {
                tracing::debug!(?reason, "send rejected");
                return SendOutcome::rejected(reason);
            }
        };
        tracing::debug!(
            session_id = %session.id(),
            messages = request.messages.len(),
            "generation started"
        );

        let cancel = session.cancel_token();
        match self.transport.open(request, cancel.clone()).await {
            Ok(body) => {
                let mut events = decode_stream(body, cancel.clone());
                while let Some(event) = events.next().await {
                    let fold = session.fold(&event);
                    self.publish(&session);
                    if fold == Fold::Finished {
                        break;
                    }
                }
            }
            Err(e) if cancel.is_cancelled() || e.is_aborted() => {
                tracing::debug!(session_id = %session.id(), "request aborted before response");
            }
            Err(e) => {
                tracing::warn!(session_id = %session.id(), error = %e, "chat request failed");
                session.fail(&e.user_message());
                self.publish(&session);
            }
        }

        self.finish(session, guard)
    }

    /// Replace the log tail with the session's current message.
    fn publish(&self, session: &GenerationSession) {
        let message = session.snapshot();
        self.state.lock().conversation.replace_last(message.clone());
        let _ = self.event_tx.send(ChatEvent::MessageUpdate {
            session_id: session.id(),
            message,
        });
    }

    fn finish(&self, session: GenerationSession, guard: SessionGuard) -> SendOutcome {
        let outcome = if session.is_error() {
            SendOutcome::Failed {
                message: session.content().to_string(),
            }
        } else if session.is_cancelled() && !session.is_finished() {
            SendOutcome::Cancelled
        } else {
            SendOutcome::Completed
        };

        tracing::debug!(
            session_id = %session.id(),
            outcome = ?outcome,
            content_len = session.content().len(),
            thinking_len = session.thinking().len(),
            "generation finished"
        );

        guard.release(&outcome);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use medchat_ai::{ByteStream, Error as AiError, Role, WireContent};
    use tokio_util::sync::CancellationToken;

    /// What the mock transport does for one request
    enum Script {
        /// Yield these chunks, then end
        Body(Vec<String>),
        /// Yield these chunks, then wait forever
        Hang(Vec<String>),
        /// Yield these chunks, then fail the read
        BodyThenFail(Vec<String>, AiError),
        /// Fail before any body
        Fail(AiError),
    }

    /// A mock transport that plays back scripted responses and records requests.
    struct MockTransport {
        scripts: Mutex<Vec<Script>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl MockTransport {
        fn new(scripts: Vec<Script>) -> Arc<Self> {
            Arc::new(Self {
                scripts: Mutex::new(scripts),
                requests: Mutex::new(vec![]),
            })
        }

        fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().clone()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn open(
            &self,
            request: ChatRequest,
            _cancel: CancellationToken,
        ) -> medchat_ai::Result<ByteStream> {
            self.requests.lock().push(request);
            let script = {
                let mut scripts = self.scripts.lock();
                if scripts.is_empty() {
                    Script::Body(vec![done()])
                } else {
                    scripts.remove(0)
                }
            };

            let stream: ByteStream = match script {
                Script::Fail(e) => return Err(e),
                Script::Body(chunks) => Box::pin(async_stream::stream! {
                    for chunk in chunks {
                        yield Ok::<_, AiError>(chunk.into_bytes());
                    }
                }),
                Script::Hang(chunks) => Box::pin(async_stream::stream! {
                    for chunk in chunks {
                        yield Ok::<_, AiError>(chunk.into_bytes());
                    }
                    futures::future::pending::<()>().await;
                }),
                Script::BodyThenFail(chunks, e) => Box::pin(async_stream::stream! {
                    for chunk in chunks {
                        yield Ok::<_, AiError>(chunk.into_bytes());
                    }
                    yield Err(e);
                }),
            };
            Ok(stream)
        }
    }

    fn delta(text: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"delta": {"content": text}}]})
        )
    }

    fn done() -> String {
        "data: [DONE]\n\n".to_string()
    }

    fn controller(scripts: Vec<Script>) -> (Arc<ChatController>, Arc<MockTransport>) {
        controller_with(ChatConfig::default(), scripts)
    }

    fn controller_with(
        config: ChatConfig,
        scripts: Vec<Script>,
    ) -> (Arc<ChatController>, Arc<MockTransport>) {
        let transport = MockTransport::new(scripts);
        let controller = Arc::new(ChatController::new(config, transport.clone()));
        (controller, transport)
    }

    fn image(tag: &[u8]) -> EncodedImage {
        EncodedImage::from_bytes("image/png", tag).unwrap()
    }

    /// Wait until the in-flight reply has the given content.
    async fn wait_for_content(rx: &mut broadcast::Receiver<ChatEvent>, expected: &str) {
        loop {
            match rx.recv().await.unwrap() {
                ChatEvent::MessageUpdate { message, .. } if message.content == expected => return,
                _ => {}
            }
        }
    }

    #[tokio::test]
    async fn test_hello_world_scenario() {
        let (ctl, _) = controller(vec![Script::Body(vec![
            delta("Hello"),
            delta(" world"),
            done(),
        ])]);

        assert_eq!(ctl.send("hi").await, SendOutcome::Completed);

        let msgs = ctl.messages();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].role, Role::User);
        assert_eq!(msgs[0].content, "hi");
        assert_eq!(msgs[1].role, Role::Assistant);
        assert_eq!(msgs[1].content, "Hello world");
        assert!(msgs[1].thinking.is_none());
        assert!(!msgs[1].error);
        assert!(!ctl.is_generating());
    }

    #[tokio::test]
    async fn test_reasoning_scenario_with_default_config() {
        let (ctl, _) = controller(vec![Script::Body(vec![
            delta("reasoning..."),
            delta(""),
            delta("Answer"),
            done(),
        ])]);

        assert_eq!(ctl.send("why?").await, SendOutcome::Completed);
        let reply = ctl.messages().pop().unwrap();
        assert_eq!(reply.thinking.as_deref(), Some("reasoning..."));
        assert_eq!(reply.content, "Answer");
        assert!(!reply.error);
    }

    #[tokio::test]
    async fn test_reasoning_never_keeps_everything_as_content() {
        let config = ChatConfig {
            reasoning: ReasoningMode::Never,
            ..ChatConfig::default()
        };
        let (ctl, _) = controller_with(
            config,
            vec![Script::Body(vec![
                delta("reasoning..."),
                delta(""),
                delta("Answer"),
                done(),
            ])],
        );

        ctl.send("why?").await;
        let reply = ctl.messages().pop().unwrap();
        assert!(reply.thinking.is_none());
        assert_eq!(reply.content, "reasoning...Answer");
    }

    #[tokio::test]
    async fn test_dropped_send_releases_active_slot() {
        let (ctl, transport) = controller(vec![
            Script::Hang(vec![delta("half")]),
            Script::Body(vec![delta("again"), done()]),
        ]);
        let mut rx = ctl.subscribe();

        let timed_out =
            tokio::time::timeout(std::time::Duration::from_millis(100), ctl.send("hi")).await;
        assert!(timed_out.is_err());

        assert!(!ctl.is_generating());
        let mut ended = false;
        while let Ok(event) = rx.try_recv() {
            if let ChatEvent::SessionEnd { outcome, .. } = event {
                assert_eq!(outcome, SendOutcome::Cancelled);
                ended = true;
            }
        }
        assert!(ended);
        assert_eq!(ctl.messages().pop().unwrap().content, "half");

        assert_eq!(ctl.send("retry").await, SendOutcome::Completed);
        assert_eq!(ctl.messages().pop().unwrap().content, "again");
        assert_eq!(transport.requests().len(), 2);
        assert!(ctl.clear());
    }

    #[tokio::test]
    async fn test_server_error_scenario() {
        let (ctl, _) = controller(vec![Script::Body(vec![
            delta("partial"),
            "data: {\"error\": \"rate limited\"}\n\n".to_string(),
        ])]);

        assert_eq!(
            ctl.send("hi").await,
            SendOutcome::Failed {
                message: "rate limited".into()
            }
        );
        let reply = ctl.messages().pop().unwrap();
        assert_eq!(reply.content, "rate limited");
        assert!(reply.error);
    }

    #[tokio::test]
    async fn test_empty_send_is_rejected() {
        let (ctl, transport) = controller(vec![]);
        let mut rx = ctl.subscribe();

        assert_eq!(
            ctl.send("").await,
            SendOutcome::Rejected {
                reason: RejectReason::EmptyInput
            }
        );
        assert_eq!(
            ctl.send("   \n").await,
            SendOutcome::Rejected {
                reason: RejectReason::EmptyInput
            }
        );
        assert!(ctl.messages().is_empty());
        assert!(transport.requests().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_image_only_send_is_accepted() {
        let (ctl, transport) = controller(vec![Script::Body(vec![delta("A chest X-ray."), done()])]);
        ctl.stage_image(image(b"xray"));

        assert_eq!(ctl.send("").await, SendOutcome::Completed);
        let msgs = ctl.messages();
        assert_eq!(msgs[0].images.len(), 1);

        let request = &transport.requests()[0];
        let WireContent::Parts(parts) = &request.messages[0].content else {
            panic!("expected parts");
        };
        assert_eq!(parts.len(), 1);
    }

    #[tokio::test]
    async fn test_staged_images_move_into_user_message() {
        let (ctl, transport) = controller(vec![Script::Body(vec![delta("ok"), done()])]);
        ctl.stage_image(image(b"one"));
        ctl.stage_image(image(b"two"));
        ctl.stage_image(image(b"three"));
        assert_eq!(ctl.unstage_image(1), Some(image(b"two")));
        assert_eq!(ctl.unstage_image(5), None);

        ctl.send("compare these").await;

        assert!(ctl.staged_images().is_empty());
        let user = &ctl.messages()[0];
        assert_eq!(user.images, vec![image(b"one"), image(b"three")]);

        let request = &transport.requests()[0];
        assert!(request.stream);
        assert_eq!(request.max_tokens, 1024);
        let WireContent::Parts(parts) = &request.messages[0].content else {
            panic!("expected parts");
        };
        assert_eq!(parts.len(), 3);
    }

    #[tokio::test]
    async fn test_explicit_images_replace_staged() {
        let (ctl, _) = controller(vec![Script::Body(vec![done()])]);
        ctl.stage_image(image(b"staged"));

        ctl.send_with_images("look", vec![image(b"explicit")]).await;

        assert_eq!(ctl.messages()[0].images, vec![image(b"explicit")]);
        assert!(ctl.staged_images().is_empty());
    }

    #[tokio::test]
    async fn test_request_carries_history_without_placeholder() {
        let (ctl, transport) = controller(vec![
            Script::Body(vec![delta("first answer"), done()]),
            Script::Body(vec![delta("second answer"), done()]),
        ]);

        ctl.send("first").await;
        ctl.send("second").await;

        let requests = transport.requests();
        assert_eq!(requests[0].messages.len(), 1);
        let roles: Vec<&str> = requests[1].messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["user", "assistant", "user"]);
        assert_eq!(
            requests[1].messages[1].content,
            WireContent::Text("first answer".into())
        );
        assert_eq!(ctl.messages().len(), 4);
    }

    #[tokio::test]
    async fn test_non_2xx_body_is_verbatim() {
        let (ctl, _) = controller(vec![Script::Fail(AiError::status(503, "Model not loaded"))]);

        let outcome = ctl.send("hi").await;
        assert_eq!(
            outcome,
            SendOutcome::Failed {
                message: "Model not loaded".into()
            }
        );
        let reply = ctl.messages().pop().unwrap();
        assert_eq!(reply.content, "Model not loaded");
        assert!(reply.error);
    }

    #[tokio::test]
    async fn test_non_2xx_empty_body_uses_status() {
        let (ctl, _) = controller(vec![Script::Fail(AiError::status(500, ""))]);
        ctl.send("hi").await;
        let reply = ctl.messages().pop().unwrap();
        assert_eq!(reply.content, "Request failed with status 500");
        assert!(reply.error);
    }

    #[tokio::test]
    async fn test_stream_end_without_done_is_completion() {
        let (ctl, _) = controller(vec![Script::Body(vec![delta("no sentinel")])]);
        assert_eq!(ctl.send("hi").await, SendOutcome::Completed);
        let reply = ctl.messages().pop().unwrap();
        assert_eq!(reply.content, "no sentinel");
        assert!(!reply.error);
    }

    #[tokio::test]
    async fn test_read_failure_sets_error() {
        let (ctl, _) = controller(vec![Script::BodyThenFail(
            vec![delta("part")],
            AiError::status(502, "connection reset"),
        )]);
        let outcome = ctl.send("hi").await;
        assert!(matches!(outcome, SendOutcome::Failed { .. }));
        let reply = ctl.messages().pop().unwrap();
        assert_eq!(reply.content, "connection reset");
        assert!(reply.error);
    }

    #[tokio::test]
    async fn test_stop_keeps_partial_content() {
        let (ctl, _) = controller(vec![Script::Hang(vec![delta("Partial "), delta("answer")])]);
        let mut rx = ctl.subscribe();

        let task = {
            let ctl = ctl.clone();
            tokio::spawn(async move { ctl.send("hi").await })
        };
        wait_for_content(&mut rx, "Partial answer").await;

        ctl.stop();
        assert_eq!(task.await.unwrap(), SendOutcome::Cancelled);

        let reply = ctl.messages().pop().unwrap();
        assert_eq!(reply.content, "Partial answer");
        assert!(!reply.error);
        assert!(!ctl.is_generating());

        // stop is idempotent and a no-op once idle
        ctl.stop();
        ctl.handle().stop();
    }

    #[tokio::test]
    async fn test_failure_after_stop_is_suppressed() {
        let (ctl, _) = controller(vec![Script::Hang(vec![delta("kept")])]);
        let mut rx = ctl.subscribe();
        let handle = ctl.handle();

        let task = {
            let ctl = ctl.clone();
            tokio::spawn(async move { ctl.send("hi").await })
        };
        wait_for_content(&mut rx, "kept").await;
        handle.stop();

        assert_eq!(task.await.unwrap(), SendOutcome::Cancelled);
        let reply = ctl.messages().pop().unwrap();
        assert_eq!(reply.content, "kept");
        assert!(!reply.error);
    }

    #[tokio::test]
    async fn test_second_send_while_active_is_rejected() {
        let (ctl, transport) = controller(vec![Script::Hang(vec![delta("busy")])]);
        let mut rx = ctl.subscribe();

        let task = {
            let ctl = ctl.clone();
            tokio::spawn(async move { ctl.send("first").await })
        };
        wait_for_content(&mut rx, "busy").await;

        assert_eq!(
            ctl.send("second").await,
            SendOutcome::Rejected {
                reason: RejectReason::Busy
            }
        );
        assert!(!ctl.clear());
        assert_eq!(ctl.messages().len(), 2);
        assert_eq!(transport.requests().len(), 1);

        ctl.stop();
        assert_eq!(task.await.unwrap(), SendOutcome::Cancelled);
        assert!(ctl.clear());
        assert!(ctl.messages().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_controller_rejects_send() {
        let (ctl, transport) = controller(vec![]);
        ctl.set_enabled(false);
        ctl.stage_image(image(b"keep me"));

        assert_eq!(
            ctl.send("hello").await,
            SendOutcome::Rejected {
                reason: RejectReason::Disabled
            }
        );
        assert!(ctl.messages().is_empty());
        assert_eq!(ctl.staged_images().len(), 1);
        assert!(transport.requests().is_empty());

        ctl.set_enabled(true);
        assert_eq!(ctl.send("hello").await, SendOutcome::Completed);
    }

    #[tokio::test]
    async fn test_updates_grow_monotonically() {
        let (ctl, _) = controller(vec![Script::Body(vec![
            delta("a"),
            delta("b"),
            delta("c"),
            done(),
        ])]);
        let mut rx = ctl.subscribe();

        ctl.send("go").await;

        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ChatEvent::MessageUpdate { message, .. } = event {
                seen.push(message.content);
            }
        }
        assert_eq!(seen, vec!["a", "ab", "abc", "abc"]);
        for pair in seen.windows(2) {
            assert!(pair[1].starts_with(&pair[0]));
        }
    }

    #[tokio::test]
    async fn test_session_events_bracket_updates() {
        let (ctl, _) = controller(vec![Script::Body(vec![delta("x"), done()])]);
        let mut rx = ctl.subscribe();

        ctl.send("go").await;

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(match event {
                ChatEvent::MessageAppended { .. } => "appended",
                ChatEvent::SessionStart { .. } => "start",
                ChatEvent::MessageUpdate { .. } => "update",
                ChatEvent::SessionEnd { .. } => "end",
                ChatEvent::StagedImagesChanged { .. } => "staged",
                ChatEvent::EnabledChanged { .. } => "enabled",
                ChatEvent::Cleared => "cleared",
            });
        }
        assert_eq!(
            kinds,
            vec!["staged", "appended", "appended", "start", "update", "update", "end"]
        );
    }
}
