use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `deepresearch`.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; internal code continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum ResearchError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Research job lifecycle ──────────────────────────────────────────
    #[error("job: {0}")]
    Job(#[from] JobError),

    // ── Document chat ───────────────────────────────────────────────────
    #[error("chat: {0}")]
    Chat(#[from] ChatError),

    // ── Persisted job slot ──────────────────────────────────────────────
    #[error("store: {0}")]
    Store(#[from] StoreError),

    // ── Remote collaborators ────────────────────────────────────────────
    #[error("remote: {0}")]
    Remote(#[from] RemoteError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("validation failed: {0}")]
    Validation(String),
}

// ─── Research job errors ────────────────────────────────────────────────────
//
// Terminal job outcomes only. Individual poll failures are not represented
// here: they are logged and retried on the next scheduled tick, and surface
// only when they land on the final attempt of a budget.

#[derive(Debug, Error)]
pub enum JobError {
    /// Submission itself failed. Nothing was persisted; the user must
    /// re-submit.
    #[error("failed to start research job: {0}")]
    Start(String),

    /// A research job is already being tracked by this session.
    #[error("a research job is already in progress")]
    AlreadyRunning,
}

// ─── Chat errors ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("failed to send question: {0}")]
    Start(String),

    /// The run reported a failure status.
    #[error("run {run_id} failed")]
    RunFailed { run_id: String },

    /// Attempt budget exhausted without a terminal status.
    #[error("run {run_id} timed out after {attempts} status checks")]
    Timeout { run_id: String, attempts: u32 },

    /// The status check itself errored on the final attempt.
    #[error("could not check status of run {run_id}: {message}")]
    StatusCheck { run_id: String, message: String },
}

// ─── Store errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("slot read failed: {0}")]
    Read(String),

    #[error("slot write failed: {0}")]
    Write(String),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

// ─── Remote collaborator errors ─────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request to {endpoint} failed: {message}")]
    Request { endpoint: String, message: String },

    #[error("authentication failed (check api_key in config)")]
    Auth,

    #[error("unexpected response shape from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, ResearchError>;
