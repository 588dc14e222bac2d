//! Document-scoped Q&A: one conversation per document, one polled run per
//! question.

pub mod session;
pub mod types;

pub use session::ChatSession;
pub use types::{ChatJob, ChatMessage, MessageRole};
