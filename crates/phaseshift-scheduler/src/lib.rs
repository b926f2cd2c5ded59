//! phaseshift-scheduler: rotation, execution, and admission of relocation plans.
//!
//! Turns a [`RelocationPlan`](phaseshift_placement::RelocationPlan) into
//! platform moves. The pieces:
//!
//! - Spreads moves across credentialed sessions in strict rotation
//! - Drives each move through a bounded worker pool with retries and jitter
//! - Admits at most one batch at a time, rejecting the rest as busy
//! - Exposes the day and night entry points that tie it all together
//!
//! # Architecture
//!
//! ```text
//! Coordinator
//!   ├── SnapshotBuilder (read rooms, roster, occupancy)
//!   ├── planner (plan_day / plan_night)
//!   └── AdmissionGate (single slot)
//!         └── PlanConsumer (background task)
//!               └── PlanExecutor
//!                     ├── worker pool (shared task queue)
//!                     └── Rotator<MemberMover> (one per credential)
//! ```

pub mod coordinator;
pub mod error;
pub mod executor;
pub mod gate;
pub mod report;
pub mod rotator;

pub use coordinator::{Accepted, Coordinator};
pub use error::{RotatorError, SchedulerError, SchedulerResult};
pub use executor::{ExecutorConfig, PlanExecutor};
pub use gate::{AdmissionGate, BatchStatus, PlanConsumer, PlanReceiver};
pub use report::{BatchReport, MoveOutcome};
pub use rotator::Rotator;
