use crate::config::AssistantConfig;
use crate::format;
use crate::mock::{self, MockResponder};
use crate::template;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

// --- Wire Types ---

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    Specialist,
}

/// One transcript entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
}

/// Payload sent to the external chat endpoint.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatApiRequest {
    pub session_id: Uuid,
    pub user_id: String,
    pub prompt: String,
}

/// Distinguishes free-typed input from a prompt built by an action form. The
/// two kinds fall back to different canned catalogs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptKind {
    Text,
    Action,
}

/// Anything that can answer a prompt over the network.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, request: &ChatApiRequest, kind: PromptKind) -> Result<Vec<String>>;
}

/// What one submission produced: the messages appended by this call (the
/// user's own message first), plus whether the one-time unconfigured-endpoint
/// notice is due. A superseded call reports no messages.
#[derive(Clone, Debug, Default)]
pub struct SubmitOutcome {
    pub messages: Vec<Message>,
    pub endpoint_warning: bool,
}

// --- Session ---

struct SessionState {
    session_id: Uuid,
    messages: Vec<Message>,
    is_loading: bool,
    mock_mode: bool,
    /// Bumped by every submission and by clear. A reply only lands when its
    /// sequence number is still the newest.
    seq: u64,
    endpoint_warned: bool,
}

/// One user's conversation. Routes prompts to the network responder or the
/// canned catalogs, owns the transcript, and drops replies that were
/// superseded by a later submission or a clear.
pub struct ChatSession {
    user_id: String,
    api_configured: bool,
    network: Arc<dyn Responder>,
    mock: MockResponder,
    state: RwLock<SessionState>,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("user_id", &self.user_id)
            .field("api_configured", &self.api_configured)
            .finish()
    }
}

impl ChatSession {
    pub fn new(
        user_id: &str,
        config: &AssistantConfig,
        network: Arc<dyn Responder>,
        mock: MockResponder,
    ) -> Self {
        let session_id = Uuid::new_v4();
        tracing::info!(
            user_id = %user_id,
            session_id = %session_id,
            api_configured = config.api_configured,
            "Chat session created"
        );
        Self {
            user_id: user_id.to_string(),
            api_configured: config.api_configured,
            network,
            mock,
            state: RwLock::new(SessionState {
                session_id,
                messages: Vec::new(),
                is_loading: false,
                // With no endpoint configured the session starts canned.
                mock_mode: !config.api_configured,
                seq: 0,
                endpoint_warned: false,
            }),
        }
    }

    /// Submits free-typed chat input. Blank input is a no-op.
    pub async fn submit_text(&self, input: &str) -> SubmitOutcome {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return SubmitOutcome::default();
        }
        self.submit(trimmed, PromptKind::Text).await
    }

    /// Submits a prompt rendered from an action form.
    pub async fn submit_action(&self, prompt: &str) -> SubmitOutcome {
        let leftover = template::placeholders(prompt);
        if !leftover.is_empty() {
            tracing::debug!(
                tokens = ?leftover,
                "Action prompt still carries unfilled tokens"
            );
        }
        self.submit(prompt, PromptKind::Action).await
    }

    async fn submit(&self, prompt: &str, kind: PromptKind) -> SubmitOutcome {
        let user_message = Message {
            id: Uuid::new_v4(),
            role: MessageRole::User,
            content: prompt.to_string(),
        };

        let (request, seq, use_mock, mut wants_warning) = {
            let mut state = self.state.write().await;
            state.messages.push(user_message.clone());
            state.is_loading = true;
            state.seq += 1;
            let request = ChatApiRequest {
                session_id: state.session_id,
                user_id: self.user_id.clone(),
                prompt: prompt.to_string(),
            };
            (
                request,
                state.seq,
                state.mock_mode || !self.api_configured,
                !state.mock_mode && !self.api_configured,
            )
        };

        let replies = if use_mock {
            self.mock.canned(prompt, kind).await
        } else {
            match self.network.respond(&request, kind).await {
                Ok(replies) => replies,
                Err(e) => {
                    tracing::warn!(
                        session_id = %request.session_id,
                        error = %e,
                        "Chat endpoint call failed, falling back to canned response"
                    );
                    wants_warning = true;
                    match kind {
                        PromptKind::Text => mock::chat_response(prompt),
                        PromptKind::Action => mock::default_action_response(),
                    }
                }
            }
        };

        let mut state = self.state.write().await;
        if state.seq != seq {
            // A later submission or a clear owns the session now.
            tracing::debug!(
                session_id = %request.session_id,
                "Discarding reply from a superseded request"
            );
            return SubmitOutcome::default();
        }

        let endpoint_warning = wants_warning && !state.endpoint_warned;
        if wants_warning {
            state.endpoint_warned = true;
        }

        let mut appended = vec![user_message];
        for content in replies {
            let message = Message {
                id: Uuid::new_v4(),
                role: MessageRole::Assistant,
                content: format::display_text(&content),
            };
            state.messages.push(message.clone());
            appended.push(message);
        }
        state.is_loading = false;

        SubmitOutcome {
            messages: appended,
            endpoint_warning,
        }
    }

    /// Wipes the transcript and rotates the session id, so in-flight replies
    /// and any server-side context are orphaned together. Returns the new id.
    pub async fn clear(&self) -> Uuid {
        let mut state = self.state.write().await;
        state.messages.clear();
        state.is_loading = false;
        state.seq += 1;
        state.endpoint_warned = false;
        state.session_id = Uuid::new_v4();
        tracing::info!(session_id = %state.session_id, "Chat session cleared");
        state.session_id
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.state.read().await.messages.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.is_loading
    }

    pub async fn session_id(&self) -> Uuid {
        self.state.read().await.session_id
    }

    pub async fn mock_mode(&self) -> bool {
        self.state.read().await.mock_mode
    }

    pub async fn set_mock_mode(&self, enabled: bool) {
        let mut state = self.state.write().await;
        state.mock_mode = enabled;
        tracing::info!(enabled, "Mock mode toggled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::time::sleep;

    struct StubResponder {
        replies: Vec<String>,
    }

    #[async_trait]
    impl Responder for StubResponder {
        async fn respond(&self, _: &ChatApiRequest, _: PromptKind) -> Result<Vec<String>> {
            Ok(self.replies.clone())
        }
    }

    struct FailingResponder;

    #[async_trait]
    impl Responder for FailingResponder {
        async fn respond(&self, _: &ChatApiRequest, _: PromptKind) -> Result<Vec<String>> {
            bail!("connection refused")
        }
    }

    struct SlowResponder {
        delay: Duration,
        replies: Vec<String>,
    }

    #[async_trait]
    impl Responder for SlowResponder {
        async fn respond(&self, _: &ChatApiRequest, _: PromptKind) -> Result<Vec<String>> {
            sleep(self.delay).await;
            Ok(self.replies.clone())
        }
    }

    struct CapturingResponder {
        seen: Mutex<Vec<ChatApiRequest>>,
        replies: Vec<String>,
    }

    #[async_trait]
    impl Responder for CapturingResponder {
        async fn respond(&self, request: &ChatApiRequest, _: PromptKind) -> Result<Vec<String>> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(self.replies.clone())
        }
    }

    fn mock_session(network: Arc<dyn Responder>) -> ChatSession {
        ChatSession::new(
            "tester@myapp.com",
            &AssistantConfig::default(),
            network,
            MockResponder::immediate(),
        )
    }

    fn configured_session(network: Arc<dyn Responder>) -> ChatSession {
        let config = AssistantConfig {
            api_configured: true,
            ..AssistantConfig::default()
        };
        ChatSession::new("tester@myapp.com", &config, network, MockResponder::immediate())
    }

    #[tokio::test]
    async fn test_hello_gets_canned_greeting() {
        let session = mock_session(Arc::new(FailingResponder));
        assert!(session.mock_mode().await, "unconfigured session starts canned");

        let outcome = session.submit_text("hello").await;
        assert_eq!(outcome.messages.len(), 2);
        assert_eq!(outcome.messages[0].role, MessageRole::User);
        assert_eq!(outcome.messages[0].content, "hello");
        assert_eq!(outcome.messages[1].role, MessageRole::Assistant);
        assert_eq!(
            outcome.messages[1].content,
            "Hello! How can I help you with VM management today?"
        );
        assert!(!outcome.endpoint_warning, "explicit mock mode never warns");
        assert_eq!(session.messages().await.len(), 2);
        assert!(!session.is_loading().await);
    }

    #[tokio::test]
    async fn test_blank_input_is_a_no_op() {
        let session = mock_session(Arc::new(FailingResponder));
        let outcome = session.submit_text("   ").await;
        assert!(outcome.messages.is_empty());
        assert!(session.messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_unmatched_text_gets_default_reply() {
        let session = mock_session(Arc::new(FailingResponder));
        let outcome = session.submit_text("resize my disk").await;
        assert_eq!(outcome.messages.len(), 2);
        assert!(
            outcome.messages[1]
                .content
                .starts_with("I understand you need help with VM management."),
            "got: {}",
            outcome.messages[1].content
        );
    }

    #[tokio::test]
    async fn test_action_prompt_matches_canned_catalog() {
        let session = mock_session(Arc::new(FailingResponder));

        let outcome = session.submit_action("Can you list all VMs?").await;
        assert_eq!(outcome.messages.len(), 2);
        assert!(outcome.messages[1].content.contains("VM-DEV-01 (Running)"));

        // A substituted prompt no longer matches a catalog key.
        let outcome = session
            .submit_action("Can you start VM web-01 in resource group prod-rg?")
            .await;
        assert_eq!(outcome.messages.len(), 3);
        assert_eq!(outcome.messages[2].content, "Operation completed successfully!");
    }

    #[tokio::test]
    async fn test_network_failure_falls_back_and_warns_once() {
        let session = configured_session(Arc::new(FailingResponder));
        assert!(!session.mock_mode().await);

        let outcome = session.submit_text("hello").await;
        assert!(outcome.endpoint_warning, "first failure raises the notice");
        assert_eq!(
            outcome.messages[1].content,
            "Hello! How can I help you with VM management today?",
            "text fallback keeps the keyed lookup"
        );

        let outcome = session.submit_text("hello").await;
        assert!(!outcome.endpoint_warning, "the notice is one-time");
    }

    #[tokio::test]
    async fn test_action_failure_falls_back_to_default_pair() {
        let session = configured_session(Arc::new(FailingResponder));
        let outcome = session.submit_action("Can you list all VMs?").await;
        assert!(outcome.endpoint_warning);
        assert_eq!(
            outcome.messages.len(),
            3,
            "action fallback is always the default pair, even for a catalog key"
        );
        assert_eq!(outcome.messages[2].content, "Operation completed successfully!");
    }

    #[tokio::test]
    async fn test_forced_live_mode_without_endpoint_warns_but_stays_canned() {
        let session = mock_session(Arc::new(FailingResponder));
        session.set_mock_mode(false).await;

        let outcome = session.submit_text("hello").await;
        assert!(outcome.endpoint_warning);
        assert_eq!(
            outcome.messages[1].content,
            "Hello! How can I help you with VM management today?"
        );
    }

    #[tokio::test]
    async fn test_network_reply_is_display_formatted() {
        let session = configured_session(Arc::new(StubResponder {
            replies: vec!["line1\\nline2  ".to_string()],
        }));
        let outcome = session.submit_text("status?").await;
        assert!(!outcome.endpoint_warning);
        assert_eq!(outcome.messages[1].content, "line1\nline2");
    }

    #[tokio::test]
    async fn test_request_payload_carries_identity_and_rotates_on_clear() {
        let responder = Arc::new(CapturingResponder {
            seen: Mutex::new(Vec::new()),
            replies: vec!["ok".to_string()],
        });
        let session = configured_session(responder.clone());
        let first_id = session.session_id().await;

        session.submit_text("one").await;
        let new_id = session.clear().await;
        assert_ne!(first_id, new_id);
        session.submit_text("two").await;

        let seen = responder.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].user_id, "tester@myapp.com");
        assert_eq!(seen[0].session_id, first_id);
        assert_eq!(seen[0].prompt, "one");
        assert_eq!(seen[1].session_id, new_id);
    }

    #[tokio::test]
    async fn test_clear_resets_transcript_and_warning_state() {
        let session = configured_session(Arc::new(FailingResponder));
        let outcome = session.submit_text("hello").await;
        assert!(outcome.endpoint_warning);

        session.clear().await;
        assert!(session.messages().await.is_empty());
        assert!(!session.is_loading().await);

        let outcome = session.submit_text("hello").await;
        assert!(
            outcome.endpoint_warning,
            "clearing re-arms the one-time notice"
        );
    }

    #[tokio::test]
    async fn test_clear_orphans_an_in_flight_reply() {
        let session = Arc::new(configured_session(Arc::new(SlowResponder {
            delay: Duration::from_millis(50),
            replies: vec!["late".to_string()],
        })));

        let submitting = session.clone();
        let handle = tokio::spawn(async move { submitting.submit_text("hello").await });
        sleep(Duration::from_millis(10)).await;
        session.clear().await;

        let outcome = handle.await.expect("submit task");
        assert!(outcome.messages.is_empty(), "superseded reply must not surface");
        assert!(session.messages().await.is_empty(), "transcript stays cleared");
        assert!(!session.is_loading().await);
    }

    #[tokio::test]
    async fn test_newer_submission_supersedes_older_one() {
        let session = Arc::new(configured_session(Arc::new(SlowResponder {
            delay: Duration::from_millis(50),
            replies: vec!["done".to_string()],
        })));

        let first = session.clone();
        let handle = tokio::spawn(async move { first.submit_text("first").await });
        sleep(Duration::from_millis(10)).await;
        let second = session.submit_text("second").await;

        assert_eq!(second.messages.len(), 2, "the newest submission lands");
        let first = handle.await.expect("submit task");
        assert!(first.messages.is_empty(), "the older reply is discarded");

        let transcript = session.messages().await;
        assert_eq!(transcript.len(), 3, "both user messages plus one reply");
        assert_eq!(transcript[0].content, "first");
        assert_eq!(transcript[1].content, "second");
        assert_eq!(transcript[2].content, "done");
        assert!(!session.is_loading().await);
    }
}
