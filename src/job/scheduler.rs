use super::schedule::{ResumedPhase, Schedule};
use super::store::JobStateStore;
use super::types::{JobDescriptor, PollPhase};
use crate::events::{EventSender, ResearchEvent};
use crate::remote::traits::DocumentLibrary;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, Instant, MissedTickBehavior};

/// Everything the research polling loop needs besides the job itself.
pub struct SchedulerDeps {
    pub documents: Arc<dyn DocumentLibrary>,
    pub store: Arc<JobStateStore>,
    pub schedule: Schedule,
    pub minimize_after: Duration,
    pub completion_hold: Duration,
}

/// Drive one research job from its current position in the schedule to a
/// terminal state.
///
/// A single 1s tick recomputes "current phase from elapsed time" each pass
/// (the same pure function resumption uses), so there are no independently
/// drifting one-shot timers, and a loop entered mid-schedule behaves exactly
/// like one that ran from the start. `initial_elapsed` is zero for a fresh
/// submission and the persisted age for a resumed one.
///
/// Polls are awaited inline within the tick, so a slow response can never
/// overlap the next poll; a shutdown during a poll simply drops the in-flight
/// response without acting on it.
pub async fn run_research_loop(
    deps: SchedulerDeps,
    descriptor: JobDescriptor,
    initial_elapsed: Duration,
    events: EventSender,
    mut shutdown: watch::Receiver<bool>,
) {
    let loop_started = Instant::now();
    let schedule = deps.schedule;

    // Baseline for completion inference: the library size before the job's
    // document can have appeared. A failed read leaves the baseline to the
    // first successful poll.
    let mut last_observed = match deps.documents.list().await {
        Ok(documents) => Some(documents.len()),
        Err(e) => {
            tracing::warn!("Failed to load baseline document count: {e}");
            None
        }
    };

    // Poll counters start from what a continuous run would already have
    // issued, so resumption neither replays nor skips attempts.
    let mut aggressive_issued = schedule.aggressive_polls_elapsed(initial_elapsed);
    let mut slow_issued = schedule.slow_polls_due(initial_elapsed);
    let mut previous_phase: Option<PollPhase> = None;
    let mut minimize_at: Option<Instant> = None;

    let mut ticker = interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let elapsed = initial_elapsed + loop_started.elapsed();
                let phase = schedule.phase_at(elapsed);
                let kind = phase.kind();

                if previous_phase != Some(kind) {
                    tracing::info!(
                        "Research job for {} entered {kind} phase at {}s",
                        descriptor.parameters.framework,
                        elapsed.as_secs()
                    );
                    let _ = events.send(ResearchEvent::PhaseChanged { phase: kind });
                    if kind == PollPhase::Slow {
                        minimize_at = Some(Instant::now() + deps.minimize_after);
                    }
                    previous_phase = Some(kind);
                }

                let mut poll_now = false;
                match phase {
                    ResumedPhase::Countdown { remaining } => {
                        // Display feedback only; the transition above is
                        // anchored to elapsed time, not to these ticks.
                        let _ = events.send(ResearchEvent::CountdownTick {
                            remaining_secs: remaining.as_secs(),
                        });
                    }
                    ResumedPhase::Aggressive { .. } => {
                        if aggressive_issued < schedule.aggressive_polls_due(elapsed) {
                            aggressive_issued += 1;
                            poll_now = true;
                        }
                    }
                    ResumedPhase::Slow => {
                        if slow_issued < schedule.slow_polls_due(elapsed) {
                            slow_issued += 1;
                            poll_now = true;
                        }
                    }
                }

                if poll_now && library_grew(&deps, &mut last_observed).await {
                    let _ = events.send(ResearchEvent::CompletionDetected);
                    hold_then_finish(&deps, &events, &mut shutdown).await;
                    return;
                }

                if let Some(at) = minimize_at {
                    if Instant::now() >= at {
                        let _ = events.send(ResearchEvent::AutoMinimize);
                        minimize_at = None;
                    }
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    tracing::debug!(
                        "Research loop for {} shut down",
                        descriptor.parameters.framework
                    );
                    return;
                }
            }
        }
    }
}

/// One completion poll: has the document library grown past the last
/// observed count? A failed request is swallowed and the question is asked
/// again at the next scheduled attempt.
async fn library_grew(deps: &SchedulerDeps, last_observed: &mut Option<usize>) -> bool {
    match deps.documents.list().await {
        Ok(documents) => {
            let count = documents.len();
            let grew = last_observed.is_some_and(|previous| count > previous);
            if grew {
                tracing::info!("Document library grew to {count}, research complete");
            }
            *last_observed = Some(count);
            grew
        }
        Err(e) => {
            tracing::warn!("Document poll failed, retrying at next tick: {e}");
            false
        }
    }
}

/// Show the complete state for the hold window, then clear persisted state
/// and report the terminal event. A cancellation during the hold wins.
async fn hold_then_finish(
    deps: &SchedulerDeps,
    events: &EventSender,
    shutdown: &mut watch::Receiver<bool>,
) {
    tokio::select! {
        () = tokio::time::sleep(deps.completion_hold) => {
            deps.store.clear();
            let _ = events.send(ResearchEvent::Finished);
        }
        _ = shutdown.changed() => {}
    }
}
