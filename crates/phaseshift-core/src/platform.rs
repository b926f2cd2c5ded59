//! Outbound interface to the chat platform.
//!
//! The platform client itself (authentication, sockets, event delivery)
//! lives outside phaseshift. These traits describe the capabilities the
//! planner and executor need from it:
//!
//! - **`RoomDirectory`**: read-only queries used to build a topology snapshot
//! - **`MemberMover`**: the single state-changing call, one implementation per
//!   credential so that moves can be spread across sessions

use async_trait::async_trait;
use thiserror::Error;
use tokio::time::Instant;

use crate::types::{GroupId, Member, Occupancy, ParticipantId, Role, Room, RoomId};

/// Errors reported by a platform client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    #[error("unknown group: {0}")]
    UnknownGroup(GroupId),

    #[error("unknown participant: {0}")]
    UnknownParticipant(ParticipantId),

    #[error("unknown room: {0}")]
    UnknownRoom(RoomId),

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("request failed: {0}")]
    Request(String),
}

pub type PlatformResult<T> = Result<T, PlatformError>;

/// Read-only view of a group's rooms, members, and roles.
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    /// Every room and category in the group.
    async fn list_rooms(&self, group: &GroupId) -> PlatformResult<Vec<Room>>;

    /// Current room occupancy of every connected participant.
    async fn occupancy(&self, group: &GroupId) -> PlatformResult<Vec<Occupancy>>;

    /// One page of members, ordered by id, starting strictly after `after`.
    async fn list_members(
        &self,
        group: &GroupId,
        after: Option<&ParticipantId>,
        limit: usize,
    ) -> PlatformResult<Vec<Member>>;

    /// Every role defined in the group.
    async fn list_roles(&self, group: &GroupId) -> PlatformResult<Vec<Role>>;
}

/// Moves a participant into a room using one credentialed session.
#[async_trait]
pub trait MemberMover: Send + Sync {
    /// Human-readable name of the session, used in logs.
    fn label(&self) -> &str;

    /// Move `participant` into `room`.
    ///
    /// `deadline` is the batch deadline; implementations should give up on
    /// the request once it passes.
    async fn move_member(
        &self,
        group: &GroupId,
        participant: &ParticipantId,
        room: &RoomId,
        deadline: Instant,
    ) -> PlatformResult<()>;
}
