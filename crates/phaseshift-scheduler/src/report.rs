//! Per-participant outcomes of one executed batch.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

use phaseshift_core::{GroupId, ParticipantId};

/// Final state of one move task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MoveOutcome {
    Moved { attempts: u32 },
    FailedAfterRetries { attempts: u32, last_error: String },
    CancelledByDeadline { attempts: u32 },
}

impl MoveOutcome {
    pub fn is_moved(&self) -> bool {
        matches!(self, MoveOutcome::Moved { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            MoveOutcome::Moved { attempts }
            | MoveOutcome::FailedAfterRetries { attempts, .. }
            | MoveOutcome::CancelledByDeadline { attempts } => *attempts,
        }
    }
}

impl fmt::Display for MoveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveOutcome::Moved { attempts } => write!(f, "moved after {attempts} attempt(s)"),
            MoveOutcome::FailedAfterRetries {
                attempts,
                last_error,
            } => write!(f, "failed after {attempts} attempt(s): {last_error}"),
            MoveOutcome::CancelledByDeadline { attempts } => {
                write!(f, "cancelled by deadline after {attempts} attempt(s)")
            }
        }
    }
}

/// Aggregate result of executing one relocation plan.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    group: GroupId,
    outcomes: BTreeMap<ParticipantId, MoveOutcome>,
    elapsed_ms: u64,
}

impl BatchReport {
    pub fn new(group: GroupId) -> Self {
        Self {
            group,
            outcomes: BTreeMap::new(),
            elapsed_ms: 0,
        }
    }

    /// Record an outcome. The first outcome for a participant wins.
    pub fn record(&mut self, participant: ParticipantId, outcome: MoveOutcome) {
        self.outcomes.entry(participant).or_insert(outcome);
    }

    pub fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
    }

    pub fn group(&self) -> &GroupId {
        &self.group
    }

    pub fn outcome(&self, participant: &ParticipantId) -> Option<&MoveOutcome> {
        self.outcomes.get(participant)
    }

    pub fn outcomes(&self) -> &BTreeMap<ParticipantId, MoveOutcome> {
        &self.outcomes
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn moved(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_moved()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, MoveOutcome::FailedAfterRetries { .. }))
            .count()
    }

    pub fn cancelled(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, MoveOutcome::CancelledByDeadline { .. }))
            .count()
    }

    /// True when every task ended in [`MoveOutcome::Moved`].
    pub fn is_success(&self) -> bool {
        self.outcomes.values().all(MoveOutcome::is_moved)
    }
}
