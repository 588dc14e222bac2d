use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry in the remote document library.
///
/// The job tracker only ever looks at the count and creation timestamps;
/// everything else is carried for presentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: String,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Terminal/non-terminal state of a conversation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Pending,
    Succeeded,
    Failed,
}

/// Status snapshot for one run, with its result payload once available.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStatus {
    pub state: RunState,
    pub result: Option<Value>,
}

/// First exchange of a conversation: the thread id plus the run to poll.
#[derive(Debug, Clone)]
pub struct ConversationStart {
    pub conversation_id: String,
    pub run_id: String,
}

/// The library of generated research documents.
///
/// Research-job completion is inferred from this collaborator: there is no
/// job-status query, only "has the library grown".
#[async_trait]
pub trait DocumentLibrary: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<DocumentSummary>>;
    async fn delete(&self, id: &str) -> anyhow::Result<()>;
}

/// The remote AI execution service research tasks are submitted to.
#[async_trait]
pub trait ExecutionService: Send + Sync {
    /// Submit a research task; returns the remote job id. The id is recorded
    /// but never queried; the service exposes no status interface we use.
    async fn submit(&self, task: &str) -> anyhow::Result<String>;
}

/// Multi-turn Q&A about one generated document.
#[async_trait]
pub trait ConversationService: Send + Sync {
    /// Open a conversation about a document with an initial question.
    async fn start(&self, document_id: &str, question: &str)
        -> anyhow::Result<ConversationStart>;

    /// Ask a follow-up on an existing conversation; returns the new run id.
    async fn continue_conversation(
        &self,
        conversation_id: &str,
        question: &str,
    ) -> anyhow::Result<String>;

    /// Poll a run for its current state and (when finished) result payload.
    async fn run_status(&self, run_id: &str) -> anyhow::Result<RunStatus>;
}
