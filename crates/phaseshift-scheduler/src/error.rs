//! Scheduler error types.

use thiserror::Error;

use phaseshift_core::{GroupId, ParticipantId};
use phaseshift_placement::PlanError;
use phaseshift_topology::TopologyError;

use crate::report::BatchReport;

/// Construction errors for a [`Rotator`](crate::rotator::Rotator).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RotatorError {
    #[error("rotator requires at least one resource")]
    Empty,
}

/// Errors that can occur while planning, admitting, or executing a batch.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("topology error: {0}")]
    Topology(#[from] TopologyError),

    #[error("planning error: {0}")]
    Plan(#[from] PlanError),

    #[error("existing player movement has not finished yet, please wait")]
    Busy,

    #[error("batch consumer is not running")]
    GateClosed,

    #[error("participant {participant} may not change the phase of group {group}")]
    Unauthorized {
        group: GroupId,
        participant: ParticipantId,
    },

    #[error(
        "batch for group {group} incomplete: {moved} of {total} moved, \
         {failed} failed, {cancelled} cancelled by deadline"
    )]
    Incomplete {
        group: GroupId,
        moved: usize,
        failed: usize,
        cancelled: usize,
        total: usize,
        report: Box<BatchReport>,
    },

    #[error("rotator error: {0}")]
    Rotator(#[from] RotatorError),
}

impl SchedulerError {
    /// True for rejections the caller should simply retry later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SchedulerError::Busy)
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
