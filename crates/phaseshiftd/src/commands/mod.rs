pub mod check;
pub mod plan;
pub mod simulate;

use std::path::Path;

use anyhow::Context;

use phaseshift_core::{GroupFixture, MoverConfig, ParticipantId};

/// Load a configuration file and reject invalid settings.
pub fn load_config(path: &Path) -> anyhow::Result<MoverConfig> {
    let config = MoverConfig::from_file(path)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

pub fn load_fixture(path: &Path) -> anyhow::Result<GroupFixture> {
    GroupFixture::from_file(path)
        .with_context(|| format!("failed to load fixture {}", path.display()))
}

/// Night changes are anchored on whoever asked for them.
pub fn night_requester(requester: Option<&str>) -> anyhow::Result<ParticipantId> {
    requester
        .map(ParticipantId::new)
        .context("--requester is required for the night phase")
}
