//! phaseshift-core: shared types, configuration, and the platform interface.

pub mod config;
pub mod memory;
pub mod platform;
pub mod types;

pub use config::{ConfigError, Credential, MoverConfig};
pub use memory::{GroupFixture, InMemoryPlatform, MoveRecord};
pub use platform::{MemberMover, PlatformError, PlatformResult, RoomDirectory};
pub use types::*;
