//! Batch admission gate and the background plan consumer.
//!
//! The gate has exactly one slot. A submitted plan holds it from acceptance
//! until the consumer has finished executing it, so a second submission in
//! that window is rejected with [`SchedulerError::Busy`] instead of queueing.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError, mpsc, watch};
use tokio::time::Instant;
use tracing::{error, info, warn};

use phaseshift_placement::RelocationPlan;

use crate::error::{SchedulerError, SchedulerResult};
use crate::executor::PlanExecutor;
use crate::report::BatchReport;

/// An accepted plan together with the gate slot it occupies.
struct Submission {
    plan: RelocationPlan,
    permit: OwnedSemaphorePermit,
}

/// Non-blocking, single-slot handoff to the plan consumer.
#[derive(Clone)]
pub struct AdmissionGate {
    slot: Arc<Semaphore>,
    sender: mpsc::Sender<Submission>,
}

/// Receiving half of an [`AdmissionGate`], owned by a [`PlanConsumer`].
pub struct PlanReceiver {
    receiver: mpsc::Receiver<Submission>,
}

impl AdmissionGate {
    pub fn channel() -> (Self, PlanReceiver) {
        let (sender, receiver) = mpsc::channel(1);
        (
            Self {
                slot: Arc::new(Semaphore::new(1)),
                sender,
            },
            PlanReceiver { receiver },
        )
    }

    /// Hand `plan` to the consumer, or fail immediately.
    pub fn submit(&self, plan: RelocationPlan) -> SchedulerResult<()> {
        if self.sender.is_closed() {
            return Err(SchedulerError::GateClosed);
        }

        let permit = Arc::clone(&self.slot)
            .try_acquire_owned()
            .map_err(|e| match e {
                TryAcquireError::NoPermits => {
                    warn!(
                        group = %plan.group(),
                        moves = plan.len(),
                        "batch in progress, plan rejected"
                    );
                    SchedulerError::Busy
                }
                TryAcquireError::Closed => SchedulerError::GateClosed,
            })?;

        let group = plan.group().clone();
        let moves = plan.len();
        self.sender
            .try_send(Submission { plan, permit })
            .map_err(|e| match e {
                TrySendError::Full(_) => SchedulerError::Busy,
                TrySendError::Closed(_) => SchedulerError::GateClosed,
            })?;

        info!(%group, moves, "plan accepted");
        Ok(())
    }

    /// True while an accepted plan is queued or executing.
    pub fn is_busy(&self) -> bool {
        self.slot.available_permits() == 0
    }
}

/// What the consumer has done so far.
#[derive(Debug, Clone, Default)]
pub struct BatchStatus {
    pub completed: u64,
    pub last: Option<Arc<BatchReport>>,
}

/// Drains accepted plans one at a time for the life of the process.
pub struct PlanConsumer {
    plans: PlanReceiver,
    executor: PlanExecutor,
    deadline: Duration,
    status: watch::Sender<BatchStatus>,
}

impl PlanConsumer {
    /// `deadline` is applied fresh to every batch.
    pub fn new(plans: PlanReceiver, executor: PlanExecutor, deadline: Duration) -> Self {
        let (status, _) = watch::channel(BatchStatus::default());
        Self {
            plans,
            executor,
            deadline,
            status,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<BatchStatus> {
        self.status.subscribe()
    }

    /// Run until shutdown is signalled or until every gate handle is dropped.
    ///
    /// Dropping the shutdown sender is not a shutdown signal: the consumer
    /// keeps draining plans until the gate goes away. A batch already in
    /// hand is always finished before stopping.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            deadline_secs = self.deadline.as_secs_f64(),
            sessions = self.executor.sessions(),
            "plan consumer started"
        );

        let mut watching = true;
        loop {
            tokio::select! {
                submission = self.plans.receiver.recv() => {
                    let Some(submission) = submission else {
                        info!("admission gate dropped, plan consumer stopping");
                        break;
                    };
                    self.process(submission).await;
                }
                changed = shutdown.changed(), if watching => {
                    if changed.is_err() {
                        warn!("shutdown sender dropped, consumer runs until the gate closes");
                        watching = false;
                        continue;
                    }
                    info!("plan consumer shutting down");
                    break;
                }
            }
        }
    }

    async fn process(&self, submission: Submission) {
        let Submission { plan, permit } = submission;
        let deadline = Instant::now() + self.deadline;

        let report = match self.executor.execute(&plan, deadline).await {
            Ok(report) => report,
            Err(SchedulerError::Incomplete { report, .. }) => {
                warn!(
                    group = %report.group(),
                    moved = report.moved(),
                    failed = report.failed(),
                    cancelled = report.cancelled(),
                    total = report.total(),
                    "batch finished incomplete"
                );
                *report
            }
            Err(e) => {
                error!(group = %plan.group(), error = %e, "batch execution failed");
                return;
            }
        };

        // Free the slot before announcing completion so observers of the
        // status can submit again straight away.
        drop(permit);
        self.status.send_modify(|status| {
            status.completed += 1;
            status.last = Some(Arc::new(report));
        });
    }
}
