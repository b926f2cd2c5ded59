use std::path::Path;

use phaseshift_core::{InMemoryPlatform, Phase};
use phaseshift_placement::{RelocationPlan, plan_day, plan_night};
use phaseshift_topology::SnapshotBuilder;

use super::{load_config, load_fixture, night_requester};

pub async fn plan(
    config: &Path,
    fixture: &Path,
    phase: Phase,
    requester: Option<&str>,
    format: &str,
) -> anyhow::Result<()> {
    let plan = build_plan(config, fixture, phase, requester).await?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&plan)?),
        _ => println!("{plan}"),
    }

    Ok(())
}

async fn build_plan(
    config: &Path,
    fixture: &Path,
    phase: Phase,
    requester: Option<&str>,
) -> anyhow::Result<RelocationPlan> {
    let config = load_config(config)?;
    let fixture = load_fixture(fixture)?;
    let group = fixture.group.clone();
    let platform = InMemoryPlatform::from_fixture(fixture);

    let snapshot = SnapshotBuilder::from_config(&config)
        .build(&platform, &group)
        .await?;

    let plan = match phase {
        Phase::Day => plan_day(&snapshot),
        Phase::Night => plan_night(&snapshot, &night_requester(requester)?)?,
    };
    Ok(plan)
}
