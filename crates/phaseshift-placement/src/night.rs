//! Night fanout: give every connected participant a private room.
//!
//! Participants already in a private room stay put and their room counts as
//! occupied. Everybody else takes the next free private room in position
//! order, except facilitators: once a facilitator room is known, every
//! facilitator still needing placement is routed there so that the
//! facilitators stay together across repeated night transitions.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, error, info};

use phaseshift_core::{Participant, ParticipantId, RoomId};
use phaseshift_topology::TopologySnapshot;

use crate::error::{PlanError, PlanResult};
use crate::plan::RelocationPlan;

/// Compute the night-phase plan for `snapshot`.
///
/// `requester` is the participant who asked for the transition; if they are
/// a facilitator already sitting in a private room, that room becomes the
/// facilitator room. A requester without the facilitator role anchors nothing.
/// Otherwise the first facilitator (roster order) already in a private room
/// establishes it, and failing that the first facilitator placed by this pass.
pub fn plan_night(
    snapshot: &TopologySnapshot,
    requester: &ParticipantId,
) -> PlanResult<RelocationPlan> {
    let private: HashSet<&RoomId> = snapshot.private_rooms().iter().map(|r| &r.id).collect();

    let mut occupied: HashSet<&RoomId> = HashSet::new();
    let mut requester_room: Option<&RoomId> = None;
    let mut facilitator_room: Option<&RoomId> = None;
    let mut needs_move: Vec<&Participant> = Vec::new();

    for participant in snapshot.connected() {
        let Some(room) = participant.current_room.as_ref() else {
            continue;
        };
        if private.contains(room) {
            occupied.insert(room);
            if participant.facilitator && &participant.id == requester {
                requester_room = Some(room);
            } else if participant.facilitator && facilitator_room.is_none() {
                facilitator_room = Some(room);
            }
        } else {
            needs_move.push(participant);
        }
    }

    let mut facilitator_room = requester_room.or(facilitator_room);
    let available = private.len().saturating_sub(occupied.len());

    if needs_move.len() > available {
        return Err(PlanError::InsufficientCapacity {
            needed: needs_move.len(),
            available,
        });
    }

    let mut free_rooms = snapshot
        .private_rooms()
        .iter()
        .map(|r| &r.id)
        .filter(|id| !occupied.contains(id));
    let mut moves: BTreeMap<ParticipantId, RoomId> = BTreeMap::new();

    for participant in &needs_move {
        if participant.facilitator {
            if let Some(room) = facilitator_room {
                debug!(participant = %participant.id, %room, "facilitator joins facilitator room");
                moves.insert(participant.id.clone(), room.clone());
                continue;
            }
        }

        let Some(room) = free_rooms.next() else {
            break;
        };
        if participant.facilitator {
            facilitator_room = Some(room);
        }
        debug!(participant = %participant.id, %room, "assigned private room");
        moves.insert(participant.id.clone(), room.clone());
    }

    if moves.len() != needs_move.len() {
        error!(
            planned = moves.len(),
            needed = needs_move.len(),
            "night plan does not cover every participant"
        );
        return Err(PlanError::Inconsistent {
            planned: moves.len(),
            needed: needs_move.len(),
        });
    }

    info!(
        group = %snapshot.group(),
        moves = moves.len(),
        occupied = occupied.len(),
        private_rooms = private.len(),
        "night plan computed"
    );

    Ok(RelocationPlan::new(snapshot.group().clone(), moves))
}
