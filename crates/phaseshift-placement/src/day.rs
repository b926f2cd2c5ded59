//! Day collapse: everyone connected goes back to the shared room.

use std::collections::BTreeMap;

use tracing::info;

use phaseshift_topology::TopologySnapshot;

use crate::plan::RelocationPlan;

/// Compute the day-phase plan for `snapshot`.
///
/// Disconnected participants and those already in the shared room are left
/// out. Never fails: an empty plan is a valid outcome.
pub fn plan_day(snapshot: &TopologySnapshot) -> RelocationPlan {
    let shared = &snapshot.shared_room().id;

    let moves: BTreeMap<_, _> = snapshot
        .connected()
        .filter(|p| p.current_room.as_ref() != Some(shared))
        .map(|p| (p.id.clone(), shared.clone()))
        .collect();

    info!(
        group = %snapshot.group(),
        moves = moves.len(),
        shared_room = %shared,
        "day plan computed"
    );

    RelocationPlan::new(snapshot.group().clone(), moves)
}
