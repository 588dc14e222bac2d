//! Research job tracking: submission, the phased polling schedule, persisted
//! resumption, and cancellation.

pub mod manager;
pub mod schedule;
pub mod scheduler;
pub mod store;
pub mod types;

pub use manager::{JobManager, JobManagerDeps};
pub use schedule::{ResumedPhase, Schedule};
pub use store::{JobStateStore, MemorySlotStore, SlotStore, SqliteSlotStore};
pub use types::{JobDescriptor, Modifiers, PollPhase, RequestParameters};
