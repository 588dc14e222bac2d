use super::types::{ChatJob, ChatMessage, MessageRole};
use crate::config::PollingConfig;
use crate::error::ChatError;
use crate::remote::traits::{ConversationService, RunState};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// A chat session scoped to one generated document.
///
/// The first question opens a remote conversation; follow-ups reuse it so the
/// remote side keeps the context. Each question is an async run polled to a
/// terminal state, and every exchange ends with exactly one assistant message
/// in the transcript, either a real answer or a cause-specific error line. `ask`
/// takes `&mut self`, so a second question cannot start while one is in
/// flight.
pub struct ChatSession {
    document_id: String,
    conversation: Arc<dyn ConversationService>,
    poll_interval: Duration,
    max_polls: u32,
    conversation_id: Option<String>,
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(
        document_id: impl Into<String>,
        conversation: Arc<dyn ConversationService>,
        polling: &PollingConfig,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            conversation,
            poll_interval: Duration::from_secs(polling.chat_poll_interval_secs),
            max_polls: polling.chat_max_polls,
            conversation_id: None,
            messages: Vec::new(),
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Ask a question and block until the exchange reaches a terminal state.
    /// Returns the assistant message appended to the transcript.
    pub async fn ask(&mut self, question: &str) -> &ChatMessage {
        self.push(MessageRole::User, question);

        let content = match self.run_exchange(question).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!("Chat exchange failed: {e}");
                terminal_message(&e).to_string()
            }
        };

        self.push(MessageRole::Assistant, content)
    }

    async fn run_exchange(&mut self, question: &str) -> Result<String, ChatError> {
        let job = match &self.conversation_id {
            None => {
                let start = self
                    .conversation
                    .start(&self.document_id, question)
                    .await
                    .map_err(|e| ChatError::Start(e.to_string()))?;
                self.conversation_id = Some(start.conversation_id.clone());
                ChatJob {
                    conversation_id: Some(start.conversation_id),
                    run_id: start.run_id,
                    started_at: Utc::now(),
                }
            }
            Some(conversation_id) => {
                let run_id = self
                    .conversation
                    .continue_conversation(conversation_id, question)
                    .await
                    .map_err(|e| ChatError::Start(e.to_string()))?;
                ChatJob {
                    conversation_id: Some(conversation_id.clone()),
                    run_id,
                    started_at: Utc::now(),
                }
            }
        };

        self.poll_run(&job).await
    }

    /// Poll the run on a fixed cadence until it succeeds, fails, or the
    /// attempt budget runs out. A poll request erroring is swallowed unless
    /// it lands on the final attempt.
    async fn poll_run(&self, job: &ChatJob) -> Result<String, ChatError> {
        for attempt in 1..=self.max_polls {
            tokio::time::sleep(self.poll_interval).await;

            match self.conversation.run_status(&job.run_id).await {
                Ok(status) => match status.state {
                    RunState::Succeeded => {
                        tracing::debug!(
                            "Run {} in conversation {} resolved after {}ms",
                            job.run_id,
                            job.conversation_id.as_deref().unwrap_or("-"),
                            (Utc::now() - job.started_at).num_milliseconds()
                        );
                        return Ok(extract_answer(status.result.as_ref()));
                    }
                    RunState::Failed => {
                        return Err(ChatError::RunFailed {
                            run_id: job.run_id.clone(),
                        })
                    }
                    RunState::Pending => {}
                },
                Err(e) => {
                    tracing::warn!("Status check {attempt} for run {} failed: {e}", job.run_id);
                    if attempt == self.max_polls {
                        return Err(ChatError::StatusCheck {
                            run_id: job.run_id.clone(),
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        Err(ChatError::Timeout {
            run_id: job.run_id.clone(),
            attempts: self.max_polls,
        })
    }

    fn push(&mut self, role: MessageRole, content: impl Into<String>) -> &ChatMessage {
        self.messages.push(ChatMessage::new(role, content));
        &self.messages[self.messages.len() - 1]
    }
}

/// User-facing transcript line for each failure cause.
fn terminal_message(error: &ChatError) -> &'static str {
    match error {
        ChatError::Start(_) => "Sorry, there was an error processing your question.",
        ChatError::RunFailed { .. } => "Sorry, there was an error generating the response.",
        ChatError::Timeout { .. } => "Request timed out. Please try again.",
        ChatError::StatusCheck { .. } => "Error checking response status.",
    }
}

/// Pull the answer text out of a run's result payload.
///
/// The payload shape varies by interaction version, so known locations are
/// tried in order: the payload itself as a string, then the `answer`,
/// `output`, and `response` fields. Anything else is shown serialized rather
/// than dropped; an absent payload gets a neutral acknowledgement.
fn extract_answer(result: Option<&Value>) -> String {
    let Some(value) = result else {
        return "Response received.".to_string();
    };

    if let Value::String(text) = value {
        return text.clone();
    }

    for key in ["answer", "output", "response"] {
        if let Some(text) = value.get(key).and_then(Value::as_str) {
            return text.to_string();
        }
    }

    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::traits::{ConversationStart, RunStatus};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Conversation service whose run statuses follow a script (the last
    /// entry repeats once the script runs out).
    struct ScriptedConversation {
        statuses: Mutex<VecDeque<anyhow::Result<RunStatus>>>,
        starts: AtomicUsize,
        continues: AtomicUsize,
        status_calls: AtomicUsize,
    }

    impl ScriptedConversation {
        fn new(statuses: Vec<anyhow::Result<RunStatus>>) -> Self {
            Self {
                statuses: Mutex::new(statuses.into()),
                starts: AtomicUsize::new(0),
                continues: AtomicUsize::new(0),
                status_calls: AtomicUsize::new(0),
            }
        }

        fn pending() -> anyhow::Result<RunStatus> {
            Ok(RunStatus {
                state: RunState::Pending,
                result: None,
            })
        }

        fn succeeded(result: Value) -> anyhow::Result<RunStatus> {
            Ok(RunStatus {
                state: RunState::Succeeded,
                result: Some(result),
            })
        }
    }

    #[async_trait]
    impl ConversationService for ScriptedConversation {
        async fn start(
            &self,
            _document_id: &str,
            _question: &str,
        ) -> anyhow::Result<ConversationStart> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(ConversationStart {
                conversation_id: "conv-1".to_string(),
                run_id: "run-1".to_string(),
            })
        }

        async fn continue_conversation(
            &self,
            _conversation_id: &str,
            _question: &str,
        ) -> anyhow::Result<String> {
            self.continues.fetch_add(1, Ordering::SeqCst);
            Ok("run-2".to_string())
        }

        async fn run_status(&self, _run_id: &str) -> anyhow::Result<RunStatus> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.len() > 1 {
                statuses.pop_front().unwrap()
            } else {
                match statuses.front() {
                    Some(Ok(status)) => Ok(status.clone()),
                    Some(Err(e)) => Err(anyhow::anyhow!("{e}")),
                    None => Self::pending(),
                }
            }
        }
    }

    fn fast_polling() -> PollingConfig {
        PollingConfig {
            chat_poll_interval_secs: 2,
            chat_max_polls: 5,
            ..PollingConfig::default()
        }
    }

    fn session(conversation: Arc<ScriptedConversation>) -> ChatSession {
        ChatSession::new("doc-1", conversation, &fast_polling())
    }

    #[tokio::test(start_paused = true)]
    async fn pending_then_success_yields_the_answer() {
        let conversation = Arc::new(ScriptedConversation::new(vec![
            ScriptedConversation::pending(),
            ScriptedConversation::pending(),
            ScriptedConversation::succeeded(json!({ "answer": "It is 42." })),
        ]));
        let mut session = session(Arc::clone(&conversation));

        let reply = session.ask("What is the answer?").await;
        assert_eq!(reply.role, MessageRole::Assistant);
        assert_eq!(reply.content, "It is 42.");

        assert_eq!(conversation.status_calls.load(Ordering::SeqCst), 3);
        // Transcript holds the question and exactly one reply.
        assert_eq!(session.messages().len(), 2);
        assert_eq!(session.messages()[0].role, MessageRole::User);
    }

    #[tokio::test(start_paused = true)]
    async fn follow_up_reuses_the_conversation() {
        let conversation = Arc::new(ScriptedConversation::new(vec![
            ScriptedConversation::succeeded(json!("first")),
        ]));
        let mut session = session(Arc::clone(&conversation));

        session.ask("first question").await;
        session.ask("second question").await;

        assert_eq!(conversation.starts.load(Ordering::SeqCst), 1);
        assert_eq!(conversation.continues.load(Ordering::SeqCst), 1);
        assert_eq!(session.messages().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn budget_exhaustion_produces_one_timeout_message() {
        let conversation = Arc::new(ScriptedConversation::new(vec![
            ScriptedConversation::pending(),
        ]));
        let mut session = session(Arc::clone(&conversation));

        let reply = session.ask("anyone home?").await;
        assert_eq!(reply.content, "Request timed out. Please try again.");

        // Exactly the budget, never a 6th attempt.
        assert_eq!(conversation.status_calls.load(Ordering::SeqCst), 5);
        let replies = session
            .messages()
            .iter()
            .filter(|m| m.role == MessageRole::Assistant)
            .count();
        assert_eq!(replies, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_run_gets_its_own_message() {
        let conversation = Arc::new(ScriptedConversation::new(vec![Ok(RunStatus {
            state: RunState::Failed,
            result: None,
        })]));
        let mut session = session(conversation);

        let reply = session.ask("doomed").await;
        assert_eq!(
            reply.content,
            "Sorry, there was an error generating the response."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn poll_errors_are_tolerated_until_the_final_attempt() {
        let conversation = Arc::new(ScriptedConversation::new(vec![Err(anyhow::anyhow!(
            "connection reset"
        ))]));
        let mut session = session(Arc::clone(&conversation));

        let reply = session.ask("flaky network").await;
        assert_eq!(reply.content, "Error checking response status.");
        // Errors before the last attempt are retried, not terminal.
        assert_eq!(conversation.status_calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn start_failure_never_polls() {
        struct RefusingConversation;

        #[async_trait]
        impl ConversationService for RefusingConversation {
            async fn start(
                &self,
                _document_id: &str,
                _question: &str,
            ) -> anyhow::Result<ConversationStart> {
                anyhow::bail!("500 from conversations endpoint")
            }

            async fn continue_conversation(
                &self,
                _conversation_id: &str,
                _question: &str,
            ) -> anyhow::Result<String> {
                unreachable!("no conversation was started")
            }

            async fn run_status(&self, _run_id: &str) -> anyhow::Result<RunStatus> {
                unreachable!("no run was started")
            }
        }

        let mut session = ChatSession::new("doc-1", Arc::new(RefusingConversation), &fast_polling());

        let reply = session.ask("hello?").await;
        assert_eq!(
            reply.content,
            "Sorry, there was an error processing your question."
        );
        // A failed start leaves the session fresh for a retry.
        assert!(session.conversation_id.is_none());
    }

    #[test]
    fn answer_extraction_tries_known_shapes_in_order() {
        assert_eq!(extract_answer(None), "Response received.");
        assert_eq!(extract_answer(Some(&json!("plain text"))), "plain text");
        assert_eq!(extract_answer(Some(&json!({ "answer": "a" }))), "a");
        assert_eq!(extract_answer(Some(&json!({ "output": "o" }))), "o");
        assert_eq!(extract_answer(Some(&json!({ "response": "r" }))), "r");
        // answer wins over the rest when several are present
        assert_eq!(
            extract_answer(Some(&json!({ "output": "o", "answer": "a" }))),
            "a"
        );
        // unknown shapes are surfaced serialized, not discarded
        assert_eq!(
            extract_answer(Some(&json!({ "unexpected": 1 }))),
            "{\"unexpected\":1}"
        );
    }
}
