//! phaseshift assignment planner: turns a topology snapshot into moves.
//!
//! Planning is pure: no I/O, no clock, no randomness. The same snapshot
//! and requester always produce the same plan.
//!
//! # Components
//!
//! - **`day`**: collapse every connected participant into the shared room
//! - **`night`**: fan participants out into private rooms, keeping
//!   facilitators together
//! - **`plan`**: the resulting participant → room mapping

pub mod day;
pub mod error;
pub mod night;
pub mod plan;

#[cfg(test)]
mod fixtures;

pub use day::plan_day;
pub use error::{PlanError, PlanResult};
pub use night::plan_night;
pub use plan::RelocationPlan;

use phaseshift_core::{ParticipantId, Phase};
use phaseshift_topology::TopologySnapshot;

/// Plan a transition into `phase`.
///
/// `requester` only matters at night, where it anchors the facilitator room.
pub fn plan_for_phase(
    snapshot: &TopologySnapshot,
    phase: Phase,
    requester: &ParticipantId,
) -> PlanResult<RelocationPlan> {
    match phase {
        Phase::Day => Ok(plan_day(snapshot)),
        Phase::Night => plan_night(snapshot, requester),
    }
}
