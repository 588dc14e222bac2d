//! Remote collaborators: the trait seams the trackers poll through, and the
//! HTTP client that implements them against the research platform.

pub mod http;
pub mod traits;

pub use http::HttpApiClient;
pub use traits::{
    ConversationService, ConversationStart, DocumentLibrary, DocumentSummary, ExecutionService,
    RunState, RunStatus,
};
