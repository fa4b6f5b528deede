use std::sync::Arc;

use snafu::{ResultExt, Snafu, ensure};
use sous_llm::{CapabilityError, CapabilityResult, GenerateRequest, GenerationCapability};

use crate::message::{Conversation, Message};
use crate::prompt::{
    PROBE_FAILURE_TEXT, SEND_FAILURE_TEXT, WELCOME_TEXT, probe_request, question_request,
};
use crate::state::{RequestState, RequestTransition, TransitionRejection};

/// Why a draft submission was refused before any request went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejection {
    EmptyDraft,
    RequestInFlight,
}

/// Typed cause of a failed exchange.
///
/// The conversation always shows the same static text on failure; this type
/// exists so callers and tests can distinguish the underlying cause.
#[derive(Debug, Snafu)]
pub enum ReplyError {
    #[snafu(display("generation capability failed: {source}"))]
    Capability { source: CapabilityError },
    #[snafu(display("generation capability returned an empty reply"))]
    EmptyReply,
}

/// Terminal result of the mount-time connectivity probe.
#[derive(Debug)]
pub enum ProbeOutcome {
    Connected,
    Failed { cause: ReplyError },
}

/// Terminal result of one user-initiated exchange.
#[derive(Debug)]
pub enum ReplyOutcome {
    Answered,
    Failed { cause: ReplyError },
}

/// One accepted submission whose capability reply is still outstanding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingExchange {
    request: GenerateRequest,
}

impl PendingExchange {
    pub fn request(&self) -> GenerateRequest {
        self.request.clone()
    }
}

/// Conversation state plus the request pipeline for one widget instance.
///
/// The pipeline is split in two phases so a UI can repaint between the
/// optimistic user-message append and the awaited capability call:
/// [`ChatSession::begin_submit`] runs before the suspension point,
/// [`ChatSession::complete`] after it. [`ChatSession::send`] composes both
/// for headless use.
pub struct ChatSession {
    capability: Arc<dyn GenerationCapability>,
    conversation: Conversation,
    state: RequestState,
    probed: bool,
}

impl ChatSession {
    pub fn new(capability: Arc<dyn GenerationCapability>) -> Self {
        Self {
            capability,
            conversation: Conversation::new(),
            state: RequestState::Idle,
            probed: false,
        }
    }

    pub fn capability(&self) -> Arc<dyn GenerationCapability> {
        self.capability.clone()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn has_probed(&self) -> bool {
        self.probed
    }

    /// Starts the once-per-mount connectivity probe.
    ///
    /// Returns the probe request the first time, `None` on later calls.
    pub fn begin_probe(&mut self) -> Option<GenerateRequest> {
        if self.probed {
            return None;
        }

        self.probed = true;
        Some(probe_request())
    }

    /// Seeds the conversation from the probe reply: exactly one welcome
    /// message on success, exactly one connection-error message otherwise.
    pub fn complete_probe(&mut self, result: CapabilityResult<String>) -> ProbeOutcome {
        match normalize_reply(result) {
            Ok(_) => {
                self.conversation.push(Message::bot(WELCOME_TEXT));
                ProbeOutcome::Connected
            }
            Err(cause) => {
                tracing::error!(error = %cause, "connection probe failed");
                self.conversation.push(Message::bot(PROBE_FAILURE_TEXT));
                ProbeOutcome::Failed { cause }
            }
        }
    }

    /// Runs the probe end to end. `None` when the session already probed.
    pub async fn probe(&mut self) -> Option<ProbeOutcome> {
        let request = self.begin_probe()?;
        let result = self.capability.generate(request).await;
        Some(self.complete_probe(result))
    }

    /// Accepts or rejects one draft submission.
    ///
    /// On acceptance the user message is appended immediately (the append
    /// never fails) and the session enters `AwaitingResponse` before any
    /// suspension point. The appended text is the draft exactly as typed;
    /// trimming applies only to the emptiness gate.
    pub fn begin_submit(&mut self, draft: &str) -> Result<PendingExchange, SubmitRejection> {
        if draft.trim().is_empty() {
            return Err(SubmitRejection::EmptyDraft);
        }

        if self.apply_transition(RequestTransition::Submit).is_err() {
            return Err(SubmitRejection::RequestInFlight);
        }

        self.conversation.push(Message::user(draft));

        Ok(PendingExchange {
            request: question_request(draft),
        })
    }

    /// Finishes the pending exchange from the capability's result.
    ///
    /// Success appends the trimmed reply; any failure, including an empty
    /// reply, appends the fixed apology. The session returns to `Idle` on
    /// every path.
    pub fn complete(&mut self, result: CapabilityResult<String>) -> ReplyOutcome {
        let outcome = match normalize_reply(result) {
            Ok(reply) => {
                self.conversation.push(Message::bot(reply));
                ReplyOutcome::Answered
            }
            Err(cause) => {
                tracing::error!(error = %cause, "exchange failed; showing static apology");
                self.conversation.push(Message::bot(SEND_FAILURE_TEXT));
                ReplyOutcome::Failed { cause }
            }
        };

        // Both arms must leave AwaitingResponse; a stray completion while
        // idle leaves the state untouched.
        let transition = match outcome {
            ReplyOutcome::Answered => RequestTransition::ResponseReceived,
            ReplyOutcome::Failed { .. } => RequestTransition::ResponseFailed,
        };
        let _ = self.apply_transition(transition);

        outcome
    }

    /// Runs one exchange end to end.
    pub async fn send(&mut self, draft: &str) -> Result<ReplyOutcome, SubmitRejection> {
        let pending = self.begin_submit(draft)?;
        let result = self.capability.generate(pending.request()).await;
        Ok(self.complete(result))
    }

    fn apply_transition(
        &mut self,
        transition: RequestTransition,
    ) -> Result<RequestState, TransitionRejection> {
        let next_state = self.state.apply(transition)?;
        self.state = next_state;
        Ok(next_state)
    }
}

fn normalize_reply(result: CapabilityResult<String>) -> Result<String, ReplyError> {
    let reply = result.context(CapabilitySnafu)?;
    let trimmed = reply.trim();
    ensure!(!trimmed.is_empty(), EmptyReplySnafu);
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use sous_llm::BoxFuture;

    use super::*;
    use crate::message::Sender;
    use crate::prompt::PERSONA_INSTRUCTION;

    /// Capability double that plays back a scripted sequence of results.
    struct FakeCapability {
        replies: Mutex<VecDeque<CapabilityResult<String>>>,
    }

    impl FakeCapability {
        fn scripted(replies: Vec<CapabilityResult<String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
            })
        }

        fn failure() -> CapabilityResult<String> {
            Err(CapabilityError::runtime(
                "scripted-failure",
                "the recipe service is unreachable",
            ))
        }
    }

    impl GenerationCapability for FakeCapability {
        fn id(&self) -> &str {
            "fake"
        }

        fn model_id(&self) -> &str {
            "fake-model"
        }

        fn generate<'a>(
            &'a self,
            _request: GenerateRequest,
        ) -> BoxFuture<'a, CapabilityResult<String>> {
            Box::pin(async move {
                self.replies
                    .lock()
                    .expect("fake capability script lock")
                    .pop_front()
                    .unwrap_or_else(|| Ok(String::new()))
            })
        }
    }

    fn session_with(replies: Vec<CapabilityResult<String>>) -> ChatSession {
        ChatSession::new(FakeCapability::scripted(replies))
    }

    #[tokio::test]
    async fn probe_success_seeds_single_welcome_message() {
        let mut session = session_with(vec![Ok("Hello there!".to_string())]);

        let outcome = session.probe().await;

        assert!(matches!(outcome, Some(ProbeOutcome::Connected)));
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].sender, Sender::Bot);
        assert_eq!(session.messages()[0].text, WELCOME_TEXT);
    }

    #[tokio::test]
    async fn probe_failure_seeds_single_connection_error_message() {
        let mut session = session_with(vec![FakeCapability::failure()]);

        let outcome = session.probe().await;

        assert!(matches!(
            outcome,
            Some(ProbeOutcome::Failed {
                cause: ReplyError::Capability { .. }
            })
        ));
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].text, PROBE_FAILURE_TEXT);
    }

    #[tokio::test]
    async fn probe_runs_at_most_once_per_session() {
        let mut session = session_with(vec![
            Ok("Hello!".to_string()),
            Ok("A second greeting".to_string()),
        ]);

        assert!(session.probe().await.is_some());
        assert!(session.probe().await.is_none());
        assert_eq!(session.messages().len(), 1);
        assert!(session.has_probed());
    }

    #[tokio::test]
    async fn successful_send_appends_user_then_bot() {
        let mut session = session_with(vec![Ok(
            "Place eggs in boiling water for 8-10 minutes.".to_string()
        )]);

        let outcome = session
            .send("How do I boil an egg?")
            .await
            .expect("submission accepted");

        assert!(matches!(outcome, ReplyOutcome::Answered));
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[0].sender, Sender::User);
        assert_eq!(session.messages()[0].text, "How do I boil an egg?");
        assert_eq!(session.messages()[1].sender, Sender::Bot);
        assert_eq!(
            session.messages()[1].text,
            "Place eggs in boiling water for 8-10 minutes."
        );
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn every_successful_send_grows_conversation_by_two() {
        let mut session = session_with(vec![
            Ok("first answer".to_string()),
            Ok("second answer".to_string()),
        ]);

        session.send("first question").await.expect("accepted");
        assert_eq!(session.messages().len(), 2);

        session.send("second question").await.expect("accepted");
        assert_eq!(session.messages().len(), 4);
    }

    #[tokio::test]
    async fn reply_text_is_trimmed() {
        let mut session = session_with(vec![Ok("  Preheat to 220C.  \n".to_string())]);

        session.send("Roast potatoes?").await.expect("accepted");

        assert_eq!(session.messages()[1].text, "Preheat to 220C.");
    }

    #[test]
    fn empty_and_whitespace_drafts_are_rejected() {
        let mut session = session_with(vec![]);

        assert_eq!(
            session.begin_submit("").unwrap_err(),
            SubmitRejection::EmptyDraft
        );
        assert_eq!(
            session.begin_submit("   \n\t").unwrap_err(),
            SubmitRejection::EmptyDraft
        );
        assert!(session.messages().is_empty());
        assert!(!session.is_loading());
    }

    #[test]
    fn submit_while_awaiting_is_rejected() {
        let mut session = session_with(vec![]);

        session.begin_submit("first").expect("accepted");
        assert!(session.is_loading());

        assert_eq!(
            session.begin_submit("second").unwrap_err(),
            SubmitRejection::RequestInFlight
        );
        // The rejected draft must leave no trace.
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn loading_holds_strictly_between_submit_and_completion() {
        let mut session = session_with(vec![]);
        assert!(!session.is_loading());

        session.begin_submit("question").expect("accepted");
        assert!(session.is_loading());

        session.complete(Ok("answer".to_string()));
        assert!(!session.is_loading());
    }

    #[test]
    fn capability_failure_appends_apology_and_returns_to_idle() {
        let mut session = session_with(vec![]);
        session.begin_submit("question").expect("accepted");

        let outcome = session.complete(FakeCapability::failure());

        assert!(matches!(
            outcome,
            ReplyOutcome::Failed {
                cause: ReplyError::Capability { .. }
            }
        ));
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[1].text, SEND_FAILURE_TEXT);
        assert!(!session.is_loading());
    }

    #[test]
    fn empty_reply_counts_as_failure() {
        let mut session = session_with(vec![]);
        session.begin_submit("question").expect("accepted");

        let outcome = session.complete(Ok("   \n".to_string()));

        assert!(matches!(
            outcome,
            ReplyOutcome::Failed {
                cause: ReplyError::EmptyReply
            }
        ));
        assert_eq!(session.messages()[1].text, SEND_FAILURE_TEXT);
        assert!(!session.is_loading());
    }

    #[test]
    fn pending_exchange_carries_persona_and_raw_draft_only() {
        let mut session = session_with(vec![]);

        let pending = session.begin_submit("  How long to rest steak?  ").expect("accepted");
        let request = pending.request();

        assert_eq!(request.preamble.as_deref(), Some(PERSONA_INSTRUCTION));
        // Raw draft as typed; no prior turns are folded in.
        assert_eq!(request.text, "  How long to rest steak?  ");
        assert_eq!(session.messages()[0].text, "  How long to rest steak?  ");
    }
}
