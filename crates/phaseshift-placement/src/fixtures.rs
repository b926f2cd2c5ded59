use std::collections::BTreeSet;

use phaseshift_core::{Participant, Room, RoomId, RoomKind};
use phaseshift_topology::{SnapshotParts, TopologySnapshot};

/// Town layout used by the planner tests: a day category holding `square`,
/// `inn` and `barber`, and a night category holding `cottage1..=N`.
pub(crate) struct SnapshotFixture {
    private_rooms: usize,
    roster: Vec<Participant>,
}

fn voice(id: &str, parent: &str, position: i32) -> Room {
    Room {
        id: id.into(),
        name: id.to_string(),
        kind: RoomKind::Voice,
        parent: Some(RoomId::new(parent)),
        position,
    }
}

fn category(id: &str, position: i32) -> Room {
    Room {
        id: id.into(),
        name: id.to_string(),
        kind: RoomKind::Category,
        parent: None,
        position,
    }
}

impl SnapshotFixture {
    pub(crate) fn new(private_rooms: usize) -> Self {
        Self {
            private_rooms,
            roster: Vec::new(),
        }
    }

    pub(crate) fn player(self, id: &str, room: Option<&str>) -> Self {
        self.push(id, room, false)
    }

    pub(crate) fn facilitator(self, id: &str, room: Option<&str>) -> Self {
        self.push(id, room, true)
    }

    fn push(mut self, id: &str, room: Option<&str>, facilitator: bool) -> Self {
        self.roster.push(Participant {
            id: id.into(),
            display_name: id.to_string(),
            roles: BTreeSet::new(),
            current_room: room.map(RoomId::new),
            facilitator,
        });
        self
    }

    pub(crate) fn build(self) -> TopologySnapshot {
        // Listed highest position first so the snapshot has to sort them.
        let private_rooms = (1..=self.private_rooms)
            .rev()
            .map(|i| voice(&format!("cottage{i}"), "night", i as i32))
            .collect();

        TopologySnapshot::new(SnapshotParts {
            group: "town".into(),
            day_category: category("day", 0),
            night_category: category("night", 1),
            shared_room: voice("square", "day", 0),
            private_rooms,
            roster: self.roster,
        })
        .unwrap()
    }
}
