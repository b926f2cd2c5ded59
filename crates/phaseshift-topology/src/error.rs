//! Error types for topology snapshots.

use std::time::Duration;

use phaseshift_core::{ParticipantId, PlatformError, RoomId};
use thiserror::Error;

/// Result type alias for topology operations.
pub type TopologyResult<T> = Result<T, TopologyError>;

/// Errors that prevent a usable snapshot from being built.
///
/// All of these are fatal to the request and are shown to the requester
/// as-is.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("cannot find day category {0:?}")]
    DayCategoryNotFound(String),

    #[error("cannot find night category {0:?}")]
    NightCategoryNotFound(String),

    #[error("cannot find shared room {0:?}")]
    SharedRoomNotFound(String),

    #[error("shared room {room:?} is not under the day category {category:?}")]
    SharedRoomMisplaced { room: String, category: String },

    #[error("private room {0} is not under the night category")]
    PrivateRoomMisplaced(RoomId),

    #[error("participant {0} appears more than once in the roster")]
    DuplicateParticipant(ParticipantId),

    #[error("cannot find facilitator role {0:?}")]
    FacilitatorRoleNotFound(String),

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("cannot {operation}: {source}")]
    Platform {
        operation: &'static str,
        #[source]
        source: PlatformError,
    },
}
