//! Point-in-time view of a group's rooms and participants.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use phaseshift_core::{GroupId, Participant, ParticipantId, Room, RoomId};

use crate::error::{TopologyError, TopologyResult};

/// Immutable snapshot of everything the planners need.
///
/// Built fresh for every planning request; occupancy changes between calls
/// so snapshots are never reused.
#[derive(Debug, Clone, Serialize)]
pub struct TopologySnapshot {
    group: GroupId,
    day_category: Room,
    night_category: Room,
    shared_room: Room,
    /// Ascending by position. Assignment priority follows this order.
    private_rooms: Vec<Room>,
    occupancy: HashMap<ParticipantId, RoomId>,
    roster: Vec<Participant>,
}

/// The structural pieces of a snapshot, before validation.
#[derive(Debug, Clone)]
pub struct SnapshotParts {
    pub group: GroupId,
    pub day_category: Room,
    pub night_category: Room,
    pub shared_room: Room,
    pub private_rooms: Vec<Room>,
    pub roster: Vec<Participant>,
}

impl TopologySnapshot {
    /// Validate the parts and assemble a snapshot.
    ///
    /// Private rooms are stably sorted by position; the occupancy map is
    /// derived from the roster.
    pub fn new(parts: SnapshotParts) -> TopologyResult<Self> {
        let SnapshotParts {
            group,
            day_category,
            night_category,
            shared_room,
            mut private_rooms,
            roster,
        } = parts;

        if !shared_room.is_child_of(&day_category) {
            return Err(TopologyError::SharedRoomMisplaced {
                room: shared_room.name.clone(),
                category: day_category.name.clone(),
            });
        }
        if let Some(room) = private_rooms.iter().find(|r| !r.is_child_of(&night_category)) {
            return Err(TopologyError::PrivateRoomMisplaced(room.id.clone()));
        }

        let mut seen = HashSet::with_capacity(roster.len());
        for p in &roster {
            if !seen.insert(&p.id) {
                return Err(TopologyError::DuplicateParticipant(p.id.clone()));
            }
        }

        private_rooms.sort_by_key(|r| r.position);

        let occupancy = roster
            .iter()
            .filter_map(|p| p.current_room.clone().map(|room| (p.id.clone(), room)))
            .collect();

        Ok(Self {
            group,
            day_category,
            night_category,
            shared_room,
            private_rooms,
            occupancy,
            roster,
        })
    }

    pub fn group(&self) -> &GroupId {
        &self.group
    }

    pub fn day_category(&self) -> &Room {
        &self.day_category
    }

    pub fn night_category(&self) -> &Room {
        &self.night_category
    }

    pub fn shared_room(&self) -> &Room {
        &self.shared_room
    }

    pub fn private_rooms(&self) -> &[Room] {
        &self.private_rooms
    }

    pub fn roster(&self) -> &[Participant] {
        &self.roster
    }

    pub fn current_room(&self, participant: &ParticipantId) -> Option<&RoomId> {
        self.occupancy.get(participant)
    }

    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.roster.iter().find(|p| &p.id == id)
    }

    /// Roster members currently connected to some room, in roster order.
    pub fn connected(&self) -> impl Iterator<Item = &Participant> {
        self.roster.iter().filter(|p| p.is_connected())
    }
}
