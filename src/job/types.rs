use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The four named modifiers that shape a research request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub scope: String,
    pub depth: String,
    pub rigor: String,
    pub perspective: String,
}

/// Everything the user chose on the submission form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestParameters {
    pub capability: String,
    pub framework: String,
    /// Free-text context the prompt is built around.
    pub context: String,
    pub modifiers: Modifiers,
}

/// The single persisted research-job descriptor.
///
/// At most one exists at a time; a new submission overwrites it wholesale.
/// The start time is the only temporal anchor: every phase decision is
/// derived from `now - started_at`, so a descriptor plus a clock is enough to
/// rejoin the schedule after a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub parameters: RequestParameters,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,
}

impl JobDescriptor {
    pub fn new(parameters: RequestParameters) -> Self {
        // Truncate to millisecond precision up front: the slot stores the
        // start time as epoch millis, and a loaded descriptor must compare
        // equal to the one that was saved.
        let now = Utc::now();
        let started_at = DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now);
        Self {
            parameters,
            started_at,
        }
    }

    /// Wall-clock time since the job started. A start time in the future
    /// (clock skew across restarts) clamps to zero rather than erroring.
    pub fn age(&self) -> Duration {
        (Utc::now() - self.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

/// Stage of the polling schedule. Derived from elapsed time, never stored.
///
/// Transitions are monotonic: Countdown → Aggressive → Slow → Idle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "lowercase")]
pub enum PollPhase {
    Countdown,
    Aggressive,
    Slow,
    Idle,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn parameters() -> RequestParameters {
        RequestParameters {
            capability: "Traditional Analysis".into(),
            framework: "SWOT Analysis".into(),
            context: "NVIDIA".into(),
            modifiers: Modifiers {
                scope: "Assets".into(),
                depth: "Comprehensive".into(),
                rigor: "Detailed Analysis".into(),
                perspective: "Investment".into(),
            },
        }
    }

    #[test]
    fn descriptor_round_trips_through_json() {
        let descriptor = JobDescriptor {
            parameters: parameters(),
            started_at: Utc.timestamp_millis_opt(1_700_000_000_123).unwrap(),
        };

        let json = serde_json::to_string(&descriptor).unwrap();
        let back: JobDescriptor = serde_json::from_str(&json).unwrap();

        assert_eq!(back, descriptor);
    }

    #[test]
    fn start_time_serializes_as_epoch_millis() {
        let descriptor = JobDescriptor {
            parameters: parameters(),
            started_at: Utc.timestamp_millis_opt(1_700_000_000_123).unwrap(),
        };

        let value: serde_json::Value = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(value["started_at"], 1_700_000_000_123i64);
    }

    #[test]
    fn fresh_descriptor_survives_millisecond_serialization_exactly() {
        let descriptor = JobDescriptor::new(parameters());

        let json = serde_json::to_string(&descriptor).unwrap();
        let back: JobDescriptor = serde_json::from_str(&json).unwrap();

        // No sub-millisecond remainder may be lost on the way through the
        // epoch-millis encoding.
        assert_eq!(back.started_at, descriptor.started_at);
        assert_eq!(back, descriptor);
    }

    #[test]
    fn phase_displays_lowercase() {
        assert_eq!(PollPhase::Aggressive.to_string(), "aggressive");
        assert_eq!(PollPhase::Idle.to_string(), "idle");
    }
}
