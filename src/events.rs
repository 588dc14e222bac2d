use crate::job::types::PollPhase;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events emitted by the job trackers for the presentation layer.
///
/// The core never touches presentation state directly; whatever surface is
/// attached (CLI renderer, web UI, tests) subscribes to this bus and decides
/// how to show each event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResearchEvent {
    /// A research job was accepted by the execution service.
    Started { framework: String },
    /// Per-second countdown feedback. Display only; phase transitions are
    /// derived from elapsed time, never from these ticks.
    CountdownTick { remaining_secs: u64 },
    PhaseChanged { phase: PollPhase },
    /// Fired once, 10s after entering the slow phase with no interaction.
    AutoMinimize,
    /// The document library grew; the job is considered complete.
    CompletionDetected,
    /// Terminal: the completion hold elapsed, state is cleared.
    Finished,
    /// Terminal: user cancellation tore the job down.
    Cancelled,
    /// Terminal: submission failed, nothing was persisted.
    Failed { message: String },
}

pub type EventSender = broadcast::Sender<ResearchEvent>;
pub type EventReceiver = broadcast::Receiver<ResearchEvent>;

/// Create a broadcast event bus with the given capacity.
pub fn event_bus(capacity: usize) -> (EventSender, EventReceiver) {
    broadcast::channel(capacity)
}
