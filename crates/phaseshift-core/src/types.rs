//! Shared types used across phaseshift crates.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

id_type!(
    /// Identity of a group (the top-level community holding rooms and members).
    GroupId
);
id_type!(
    /// Identity of a room or category.
    RoomId
);
id_type!(
    /// Identity of a participant.
    ParticipantId
);
id_type!(
    /// Identity of a role.
    RoleId
);

/// Platform-level kind of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomKind {
    /// A grouping of rooms.
    Category,
    /// A room participants can occupy.
    Voice,
    /// Anything else (text channels, announcements, ...).
    Other,
}

/// A room as listed by the platform. Never mutated by phaseshift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub kind: RoomKind,
    /// Parent category, if any.
    #[serde(default)]
    pub parent: Option<RoomId>,
    /// Explicit ordering position within the parent.
    #[serde(default)]
    pub position: i32,
}

impl Room {
    pub fn is_child_of(&self, category: &Room) -> bool {
        self.parent.as_ref() == Some(&category.id)
    }
}

/// A named role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
}

/// A member of a group as listed by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: ParticipantId,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub roles: BTreeSet<RoleId>,
}

/// Room occupancy of a single participant.
///
/// `room` is `None` when the participant is not connected to any room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupancy {
    pub participant: ParticipantId,
    pub room: Option<RoomId>,
}

/// A roster member enriched with occupancy and the facilitator flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
    pub roles: BTreeSet<RoleId>,
    pub current_room: Option<RoomId>,
    pub facilitator: bool,
}

impl Participant {
    pub fn is_connected(&self) -> bool {
        self.current_room.is_some()
    }
}

/// The two group configurations phaseshift moves between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Everyone in the shared room.
    Day,
    /// Everyone in their own private room.
    Night,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Day => f.write_str("day"),
            Phase::Night => f.write_str("night"),
        }
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Phase::Day),
            "night" => Ok(Phase::Night),
            other => Err(format!("unknown phase {other:?} (expected day or night)")),
        }
    }
}
