use super::types::PollPhase;
use crate::config::PollingConfig;
use std::time::Duration;

/// Phase a job is (re)joining, with whatever budget is left of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumedPhase {
    Countdown { remaining: Duration },
    Aggressive { polls_remaining: u32 },
    Slow,
}

impl ResumedPhase {
    pub fn kind(&self) -> PollPhase {
        match self {
            Self::Countdown { .. } => PollPhase::Countdown,
            Self::Aggressive { .. } => PollPhase::Aggressive,
            Self::Slow => PollPhase::Slow,
        }
    }
}

/// Pure phase arithmetic for the research polling schedule.
///
/// This is the single source of truth for "which phase is active after
/// elapsed time e": the scheduler re-evaluates it every tick, and resumption
/// after a restart evaluates it once with the persisted start time. Both
/// paths run the same computation, so a resumed job lands exactly where a
/// continuously running one would be.
///
/// Poll firings are likewise anchored to elapsed time, not to "now":
/// aggressive poll k is due at `estimate + k * interval` (k in 0..max_polls),
/// slow poll k at `window_end + (k + 1) * slow_interval`.
#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    estimate: Duration,
    aggressive_interval: Duration,
    aggressive_max_polls: u32,
    slow_interval: Duration,
}

impl Schedule {
    pub fn new(config: &PollingConfig) -> Self {
        // The due-index math divides by the intervals; a zero from a
        // hand-edited config is treated as 1s.
        Self {
            estimate: Duration::from_secs(config.estimate_secs),
            aggressive_interval: Duration::from_secs(config.aggressive_interval_secs.max(1)),
            aggressive_max_polls: config.aggressive_max_polls,
            slow_interval: Duration::from_secs(config.slow_interval_secs.max(1)),
        }
    }

    /// End of the aggressive window: estimate + max_polls * interval.
    pub fn aggressive_window_end(&self) -> Duration {
        self.estimate + self.aggressive_interval * self.aggressive_max_polls
    }

    /// Map elapsed time to the phase continuous execution would be in.
    ///
    /// Pure and deterministic: identical inputs always yield identical phase
    /// and remaining-budget outputs, independent of when it is invoked.
    pub fn phase_at(&self, elapsed: Duration) -> ResumedPhase {
        if elapsed < self.estimate {
            ResumedPhase::Countdown {
                remaining: self.estimate - elapsed,
            }
        } else if elapsed < self.aggressive_window_end() {
            ResumedPhase::Aggressive {
                polls_remaining: self.aggressive_max_polls
                    - self.aggressive_polls_elapsed(elapsed),
            }
        } else {
            ResumedPhase::Slow
        }
    }

    /// Aggressive polls a continuous run would already have issued by
    /// `elapsed`. Clamped to the attempt budget.
    pub fn aggressive_polls_elapsed(&self, elapsed: Duration) -> u32 {
        if elapsed < self.estimate {
            return 0;
        }
        let into_window = elapsed - self.estimate;
        let index = (into_window.as_secs() / self.aggressive_interval.as_secs())
            .min(u64::from(self.aggressive_max_polls));
        u32::try_from(index).unwrap_or(self.aggressive_max_polls)
    }

    /// Aggressive polls due by `elapsed`: poll k fires at estimate + k*interval,
    /// so the poll at the window start counts as due immediately.
    pub fn aggressive_polls_due(&self, elapsed: Duration) -> u32 {
        if elapsed < self.estimate {
            return 0;
        }
        (self.aggressive_polls_elapsed(elapsed) + 1).min(self.aggressive_max_polls)
    }

    /// Slow polls due by `elapsed`; the first fires one slow interval after
    /// the aggressive window closes, then every interval, indefinitely.
    pub fn slow_polls_due(&self, elapsed: Duration) -> u64 {
        let window_end = self.aggressive_window_end();
        if elapsed < window_end {
            return 0;
        }
        (elapsed - window_end).as_secs() / self.slow_interval.as_secs()
    }
}
