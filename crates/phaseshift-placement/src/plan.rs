//! Relocation plan: the participant → destination mapping for one transition.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use phaseshift_core::{GroupId, ParticipantId, RoomId};

/// An immutable set of moves for one group.
///
/// Entries iterate in participant-id order. An empty plan is valid and
/// executes as a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelocationPlan {
    group: GroupId,
    moves: BTreeMap<ParticipantId, RoomId>,
}

impl RelocationPlan {
    pub fn new(group: GroupId, moves: BTreeMap<ParticipantId, RoomId>) -> Self {
        Self { group, moves }
    }

    pub fn empty(group: GroupId) -> Self {
        Self::new(group, BTreeMap::new())
    }

    pub fn group(&self) -> &GroupId {
        &self.group
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn destination(&self, participant: &ParticipantId) -> Option<&RoomId> {
        self.moves.get(participant)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantId, &RoomId)> {
        self.moves.iter()
    }

    pub fn moves(&self) -> &BTreeMap<ParticipantId, RoomId> {
        &self.moves
    }
}

impl fmt::Display for RelocationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.moves.is_empty() {
            return write!(f, "No movements required for group {}", self.group);
        }

        write!(f, "Moving members of group {}: ", self.group)?;
        for (i, (participant, room)) in self.moves.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "[Move participant {participant} to room {room}]")?;
        }
        Ok(())
    }
}
