//! Plan executor: applies a [`RelocationPlan`] through the platform.
//!
//! Every move becomes a task on a shared queue drained by a small pool of
//! workers. Each attempt picks the next credentialed session from the
//! rotator, so load spreads evenly across sessions regardless of which
//! worker runs the task.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use phaseshift_core::config::ExecutionConfig;
use phaseshift_core::{GroupId, MemberMover, ParticipantId, PlatformError, RoomId};
use phaseshift_placement::RelocationPlan;

use crate::error::{RotatorError, SchedulerError, SchedulerResult};
use crate::report::{BatchReport, MoveOutcome};
use crate::rotator::Rotator;

/// Worker pool and retry settings.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Upper bound on concurrent workers; never more than the plan size.
    pub workers: usize,
    /// Attempts per task, including the first.
    pub max_attempts: u32,
    /// Pause between a failed attempt and the next one.
    pub retry_backoff: Duration,
    /// Total jitter budget, divided by the plan size to get the per-task
    /// ceiling.
    pub jitter_window: Duration,
}

impl ExecutorConfig {
    pub fn from_execution(config: &ExecutionConfig) -> Self {
        Self {
            workers: config.workers,
            max_attempts: config.max_attempts,
            retry_backoff: config.retry_backoff(),
            jitter_window: config.jitter_window(),
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::from_execution(&ExecutionConfig::default())
    }
}

#[derive(Debug)]
struct MoveTask {
    participant: ParticipantId,
    room: RoomId,
}

/// Executes relocation plans against a rotating set of [`MemberMover`]s.
#[derive(Clone)]
pub struct PlanExecutor {
    movers: Arc<Rotator<Arc<dyn MemberMover>>>,
    config: ExecutorConfig,
}

impl PlanExecutor {
    pub fn new(
        movers: Vec<Arc<dyn MemberMover>>,
        config: ExecutorConfig,
    ) -> Result<Self, RotatorError> {
        Ok(Self {
            movers: Arc::new(Rotator::new(movers)?),
            config,
        })
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Number of credentialed sessions in rotation.
    pub fn sessions(&self) -> usize {
        self.movers.len()
    }

    /// Execute `plan`, failing with [`SchedulerError::Incomplete`] unless
    /// every participant was moved.
    pub async fn execute(
        &self,
        plan: &RelocationPlan,
        deadline: Instant,
    ) -> SchedulerResult<BatchReport> {
        let report = self.run(plan, deadline).await;
        if report.is_success() {
            return Ok(report);
        }

        Err(SchedulerError::Incomplete {
            group: report.group().clone(),
            moved: report.moved(),
            failed: report.failed(),
            cancelled: report.cancelled(),
            total: report.total(),
            report: Box::new(report),
        })
    }

    /// Execute `plan` and return one outcome per entry.
    ///
    /// Never short-circuits: every task is driven to a final outcome before
    /// this returns, whatever happens to its neighbours.
    pub async fn run(&self, plan: &RelocationPlan, deadline: Instant) -> BatchReport {
        let started = Instant::now();
        let total = plan.len();
        let mut report = BatchReport::new(plan.group().clone());

        if total == 0 {
            info!(group = %plan.group(), "empty plan, nothing to move");
            return report;
        }

        let queue: VecDeque<MoveTask> = plan
            .iter()
            .map(|(participant, room)| MoveTask {
                participant: participant.clone(),
                room: room.clone(),
            })
            .collect();
        let queue = Arc::new(Mutex::new(queue));
        let (results_tx, mut results_rx) = mpsc::channel(total);

        let workers = self.config.workers.max(1).min(total);
        let jitter_ceiling = self.config.jitter_window.div_f64(total as f64);

        info!(
            group = %plan.group(),
            moves = total,
            workers,
            sessions = self.movers.len(),
            "executing relocation plan"
        );

        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let ctx = WorkerContext {
                worker,
                group: plan.group().clone(),
                movers: Arc::clone(&self.movers),
                queue: Arc::clone(&queue),
                results: results_tx.clone(),
                max_attempts: self.config.max_attempts.max(1),
                retry_backoff: self.config.retry_backoff,
                jitter_ceiling,
                deadline,
            };
            handles.push(tokio::spawn(ctx.run()));
        }
        drop(results_tx);

        while let Some((participant, outcome)) = results_rx.recv().await {
            report.record(participant, outcome);
        }

        for handle in handles {
            if let Err(e) = handle.await {
                error!(group = %plan.group(), error = %e, "move worker exited abnormally");
            }
        }

        for (participant, _) in plan.iter() {
            if report.outcome(participant).is_none() {
                error!(group = %plan.group(), %participant, "no outcome reported for move");
                report.record(
                    participant.clone(),
                    MoveOutcome::FailedAfterRetries {
                        attempts: 0,
                        last_error: "worker exited before reporting".to_string(),
                    },
                );
            }
        }

        report.set_elapsed(started.elapsed());

        info!(
            group = %plan.group(),
            moved = report.moved(),
            failed = report.failed(),
            cancelled = report.cancelled(),
            total = report.total(),
            elapsed_ms = report.elapsed().as_millis() as u64,
            "relocation plan finished"
        );

        report
    }
}

/// Everything one worker needs, owned so it can move into a spawned task.
struct WorkerContext {
    worker: usize,
    group: GroupId,
    movers: Arc<Rotator<Arc<dyn MemberMover>>>,
    queue: Arc<Mutex<VecDeque<MoveTask>>>,
    results: mpsc::Sender<(ParticipantId, MoveOutcome)>,
    max_attempts: u32,
    retry_backoff: Duration,
    jitter_ceiling: Duration,
    deadline: Instant,
}

impl WorkerContext {
    async fn run(self) {
        let mut handled = 0usize;
        loop {
            let task = self.queue.lock().await.pop_front();
            let Some(task) = task else { break };

            let outcome = self.drive(&task).await;
            handled += 1;
            if self.results.send((task.participant, outcome)).await.is_err() {
                warn!(worker = self.worker, "result channel closed, worker stopping");
                break;
            }
        }
        debug!(worker = self.worker, handled, "move worker drained");
    }

    async fn drive(&self, task: &MoveTask) -> MoveOutcome {
        let delay = jitter(self.jitter_ceiling);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut last_error = String::new();
        for attempt in 1..=self.max_attempts {
            if Instant::now() >= self.deadline {
                warn!(
                    worker = self.worker,
                    participant = %task.participant,
                    attempt,
                    "deadline passed before move attempt"
                );
                return MoveOutcome::CancelledByDeadline {
                    attempts: attempt - 1,
                };
            }

            let mover = self.movers.next();
            match mover
                .move_member(&self.group, &task.participant, &task.room, self.deadline)
                .await
            {
                Ok(()) => {
                    debug!(
                        worker = self.worker,
                        session = mover.label(),
                        participant = %task.participant,
                        room = %task.room,
                        attempt,
                        "participant moved"
                    );
                    return MoveOutcome::Moved { attempts: attempt };
                }
                Err(PlatformError::DeadlineExceeded) => {
                    warn!(
                        worker = self.worker,
                        session = mover.label(),
                        participant = %task.participant,
                        attempt,
                        "move abandoned at deadline"
                    );
                    return MoveOutcome::CancelledByDeadline { attempts: attempt };
                }
                Err(e) => {
                    warn!(
                        worker = self.worker,
                        session = mover.label(),
                        participant = %task.participant,
                        room = %task.room,
                        attempt,
                        error = %e,
                        "move attempt failed"
                    );
                    last_error = e.to_string();
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_backoff).await;
                    }
                }
            }
        }

        MoveOutcome::FailedAfterRetries {
            attempts: self.max_attempts,
            last_error,
        }
    }
}

/// Uniform delay in `[0, ceiling]`.
fn jitter(ceiling: Duration) -> Duration {
    if ceiling.is_zero() {
        return Duration::ZERO;
    }
    ceiling.mul_f64(rand::thread_rng().gen_range(0.0..=1.0))
}
