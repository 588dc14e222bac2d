use super::schedule::Schedule;
use super::scheduler::{run_research_loop, SchedulerDeps};
use super::store::JobStateStore;
use super::types::{JobDescriptor, PollPhase, RequestParameters};
use crate::config::PollingConfig;
use crate::error::{JobError, Result};
use crate::events::{EventSender, ResearchEvent};
use crate::prompt::build_research_prompt;
use crate::remote::traits::{DocumentLibrary, ExecutionService};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Collaborators the manager hands to each polling loop it spawns.
pub struct JobManagerDeps {
    pub execution: Arc<dyn ExecutionService>,
    pub documents: Arc<dyn DocumentLibrary>,
    pub store: Arc<JobStateStore>,
}

struct ActiveJob {
    descriptor: JobDescriptor,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Owns the lifecycle of the single tracked research job: submission,
/// resumption after a restart, cancellation, and status.
///
/// One job at a time. The fire-and-forget submission model means a second
/// request while one is tracked is refused rather than queued.
pub struct JobManager {
    deps: JobManagerDeps,
    polling: PollingConfig,
    events: EventSender,
    active: Option<ActiveJob>,
}

impl JobManager {
    pub fn new(deps: JobManagerDeps, polling: PollingConfig, events: EventSender) -> Self {
        Self {
            deps,
            polling,
            events,
            active: None,
        }
    }

    /// Submit a research request and start tracking it from t=0.
    ///
    /// On submission failure nothing is persisted and no loop starts; the
    /// caller sees the error and a single `Failed` event carries the
    /// user-facing message.
    pub async fn submit(&mut self, parameters: RequestParameters) -> Result<()> {
        if self.is_tracking() {
            return Err(JobError::AlreadyRunning.into());
        }

        let task = build_research_prompt(&parameters);
        let job_id = match self.deps.execution.submit(&task).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!("Research submission failed: {e}");
                let _ = self.events.send(ResearchEvent::Failed {
                    message: "Failed to start research generation. Please try again.".to_string(),
                });
                self.deps.store.clear();
                return Err(JobError::Start(e.to_string()).into());
            }
        };

        tracing::info!("Research job {job_id} accepted for {}", parameters.framework);
        let descriptor = JobDescriptor::new(parameters);
        self.deps.store.save(&descriptor);
        let _ = self.events.send(ResearchEvent::Started {
            framework: descriptor.parameters.framework.clone(),
        });
        self.spawn(descriptor, Duration::ZERO);
        Ok(())
    }

    /// Rejoin the persisted job, if one survives the expiry check. Returns
    /// the phase it resumed into.
    pub fn resume(&mut self) -> Option<PollPhase> {
        if self.is_tracking() {
            return self.status();
        }
        let (descriptor, elapsed) = self.deps.store.load()?;
        let phase = Schedule::new(&self.polling).phase_at(elapsed).kind();
        tracing::info!(
            "Resuming research job for {} in {phase} phase ({}s elapsed)",
            descriptor.parameters.framework,
            elapsed.as_secs()
        );
        self.spawn(descriptor, elapsed);
        Some(phase)
    }

    /// Stop the tracked job and clear its persisted state. Emits `Cancelled`
    /// only when a loop was actually running; repeated calls are no-ops that
    /// leave the (already empty) slot empty.
    pub async fn cancel(&mut self) {
        if let Some(active) = self.active.take() {
            let was_running = !active.handle.is_finished();
            let _ = active.shutdown.send(true);
            let _ = active.handle.await;
            if was_running {
                tracing::info!(
                    "Cancelled research job for {}",
                    active.descriptor.parameters.framework
                );
                let _ = self.events.send(ResearchEvent::Cancelled);
            }
        }
        self.deps.store.clear();
    }

    /// Phase of the tracked job, or `None` when idle.
    pub fn status(&self) -> Option<PollPhase> {
        let active = self.active.as_ref()?;
        if active.handle.is_finished() {
            return None;
        }
        let elapsed = active.descriptor.age();
        Some(Schedule::new(&self.polling).phase_at(elapsed).kind())
    }

    fn is_tracking(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.handle.is_finished())
    }

    fn spawn(&mut self, descriptor: JobDescriptor, initial_elapsed: Duration) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let scheduler_deps = SchedulerDeps {
            documents: Arc::clone(&self.deps.documents),
            store: Arc::clone(&self.deps.store),
            schedule: Schedule::new(&self.polling),
            minimize_after: Duration::from_secs(self.polling.minimize_after_secs),
            completion_hold: Duration::from_secs(self.polling.completion_hold_secs),
        };
        let events = self.events.clone();
        let loop_descriptor = descriptor.clone();
        let handle = tokio::spawn(run_research_loop(
            scheduler_deps,
            loop_descriptor,
            initial_elapsed,
            events,
            shutdown_rx,
        ));
        self.active = Some(ActiveJob {
            descriptor,
            shutdown: shutdown_tx,
            handle,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResearchError;
    use crate::events::event_bus;
    use crate::job::store::MemorySlotStore;
    use crate::job::types::Modifiers;
    use crate::remote::traits::DocumentSummary;
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct StubExecution {
        fail: AtomicBool,
        submissions: AtomicUsize,
    }

    impl StubExecution {
        fn accepting() -> Self {
            Self {
                fail: AtomicBool::new(false),
                submissions: AtomicUsize::new(0),
            }
        }

        fn refusing() -> Self {
            Self {
                fail: AtomicBool::new(true),
                submissions: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ExecutionService for StubExecution {
        async fn submit(&self, _task: &str) -> anyhow::Result<String> {
            self.submissions.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("503 from execution endpoint");
            }
            Ok("job-123".to_string())
        }
    }

    struct EmptyLibrary;

    #[async_trait]
    impl DocumentLibrary for EmptyLibrary {
        async fn list(&self) -> anyhow::Result<Vec<DocumentSummary>> {
            Ok(Vec::new())
        }

        async fn delete(&self, _id: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn parameters() -> RequestParameters {
        RequestParameters {
            capability: "Traditional Analysis".into(),
            framework: "DCF Valuation".into(),
            context: "NVDA".into(),
            modifiers: Modifiers {
                scope: "Assets".into(),
                depth: "Comprehensive".into(),
                rigor: "Exhaustive Research".into(),
                perspective: "Investment".into(),
            },
        }
    }

    fn manager(execution: Arc<StubExecution>) -> (JobManager, crate::events::EventReceiver) {
        let polling = PollingConfig::default();
        let store = Arc::new(JobStateStore::new(
            Arc::new(MemorySlotStore::new()),
            Duration::from_secs(polling.resume_expiry_secs),
        ));
        let (events, rx) = event_bus(256);
        let deps = JobManagerDeps {
            execution,
            documents: Arc::new(EmptyLibrary),
            store,
        };
        (JobManager::new(deps, polling, events), rx)
    }

    fn drain(rx: &mut crate::events::EventReceiver) -> Vec<ResearchEvent> {
        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            seen.push(event);
        }
        seen
    }

    #[tokio::test(start_paused = true)]
    async fn submit_persists_state_and_starts_tracking() {
        let (mut manager, mut rx) = manager(Arc::new(StubExecution::accepting()));

        manager.submit(parameters()).await.unwrap();

        assert_eq!(manager.status(), Some(PollPhase::Countdown));
        assert!(manager.deps.store.load().is_some());
        let seen = drain(&mut rx);
        assert!(seen.iter().any(|e| matches!(
            e,
            ResearchEvent::Started { framework } if framework == "DCF Valuation"
        )));

        manager.cancel().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_submission_persists_nothing() {
        let (mut manager, mut rx) = manager(Arc::new(StubExecution::refusing()));

        let err = manager.submit(parameters()).await.unwrap_err();
        assert!(matches!(
            err,
            ResearchError::Job(JobError::Start(_))
        ));

        assert_eq!(manager.status(), None);
        assert!(manager.deps.store.load().is_none());
        let seen = drain(&mut rx);
        assert!(seen
            .iter()
            .any(|e| matches!(e, ResearchEvent::Failed { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn second_submission_while_tracking_is_refused() {
        let execution = Arc::new(StubExecution::accepting());
        let (mut manager, _rx) = manager(Arc::clone(&execution));

        manager.submit(parameters()).await.unwrap();
        let err = manager.submit(parameters()).await.unwrap_err();

        assert!(matches!(
            err,
            ResearchError::Job(JobError::AlreadyRunning)
        ));
        assert_eq!(execution.submissions.load(Ordering::SeqCst), 1);

        manager.cancel().await;
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_idempotent_and_reports_once() {
        let (mut manager, mut rx) = manager(Arc::new(StubExecution::accepting()));

        manager.submit(parameters()).await.unwrap();
        manager.cancel().await;
        manager.cancel().await;

        let seen = drain(&mut rx);
        let cancellations = seen
            .iter()
            .filter(|e| matches!(e, ResearchEvent::Cancelled))
            .count();
        assert_eq!(cancellations, 1);
        assert_eq!(manager.status(), None);
        assert!(manager.deps.store.load().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn resume_lands_in_the_phase_elapsed_time_dictates() {
        let (mut manager, _rx) = manager(Arc::new(StubExecution::accepting()));

        let mut descriptor = JobDescriptor::new(parameters());
        descriptor.started_at = Utc::now() - ChronoDuration::seconds(340);
        manager.deps.store.save(&descriptor);

        assert_eq!(manager.resume(), Some(PollPhase::Aggressive));

        manager.cancel().await;
    }

    #[tokio::test(start_paused = true)]
    async fn resume_with_empty_slot_does_nothing() {
        let (mut manager, _rx) = manager(Arc::new(StubExecution::accepting()));
        assert_eq!(manager.resume(), None);
        assert_eq!(manager.status(), None);
    }
}
