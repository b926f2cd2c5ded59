//! phaseshift-topology: point-in-time room topology snapshots.
//!
//! A [`TopologySnapshot`] captures the day category, night category, shared
//! room, the position-ordered private rooms, and every roster member with
//! their current room. Snapshots are built fresh for each planning request
//! by [`SnapshotBuilder`] and never mutated afterwards.
//!
//! # Components
//!
//! - **`snapshot`**: The immutable snapshot and its structural invariants
//! - **`builder`**: Platform queries, paging, timeouts, and room resolution
//! - **`error`**: Topology error taxonomy

pub mod builder;
pub mod error;
pub mod snapshot;

pub use builder::SnapshotBuilder;
pub use error::{TopologyError, TopologyResult};
pub use snapshot::{SnapshotParts, TopologySnapshot};
