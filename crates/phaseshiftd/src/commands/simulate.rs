//! End-to-end phase change against the in-memory platform.
//!
//! Wires the same pieces a live deployment would: one mover per configured
//! credential, the admission gate, a background consumer and the
//! coordinator. Waits for the batch, then prints the report and the
//! resulting occupancy as JSON.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use phaseshift_core::{
    GroupId, InMemoryPlatform, MemberMover, MoverConfig, ParticipantId, Phase, RoomDirectory,
    RoomId,
};
use phaseshift_scheduler::{
    Accepted, AdmissionGate, BatchReport, Coordinator, ExecutorConfig, PlanConsumer, PlanExecutor,
};
use phaseshift_topology::SnapshotBuilder;

use super::{load_config, load_fixture, night_requester};

/// Slack on top of the batch deadline before giving up on the consumer.
const COMPLETION_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct SimulateOptions {
    pub phase: Phase,
    pub requester: Option<String>,
    pub fail_first: usize,
    pub move_latency: Duration,
}

#[derive(Debug, Serialize)]
pub struct SimulationOutput {
    pub accepted: Accepted,
    pub report: BatchReport,
    pub occupancy: BTreeMap<ParticipantId, RoomId>,
}

pub async fn run(config: &Path, fixture: &Path, options: SimulateOptions) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let fixture = load_fixture(fixture)?;
    let group = fixture.group.clone();
    let platform = InMemoryPlatform::from_fixture(fixture);

    let output = simulate(&config, &platform, &group, options).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    if !output.report.is_success() {
        anyhow::bail!(
            "batch incomplete: {} of {} moved, {} failed, {} cancelled by deadline",
            output.report.moved(),
            output.report.total(),
            output.report.failed(),
            output.report.cancelled()
        );
    }
    Ok(())
}

pub async fn simulate(
    config: &MoverConfig,
    platform: &InMemoryPlatform,
    group: &GroupId,
    options: SimulateOptions,
) -> anyhow::Result<SimulationOutput> {
    if options.fail_first > 0 {
        // Leave every participant at least one attempt that can succeed.
        let per_participant = config.execution.max_attempts.saturating_sub(1);
        platform.inject_move_failures(options.fail_first, per_participant);
        info!(
            failures = options.fail_first,
            per_participant, "transient move failures injected"
        );
    }
    platform.set_move_latency(options.move_latency);

    // ── Execution side ─────────────────────────────────────────

    let movers: Vec<Arc<dyn MemberMover>> = (0..config.credentials.tokens.len())
        .map(|i| Arc::new(platform.handle(format!("credential-{i}"))) as Arc<dyn MemberMover>)
        .collect();
    let executor = PlanExecutor::new(movers, ExecutorConfig::from_execution(&config.execution))?;

    let (gate, plans) = AdmissionGate::channel();
    let consumer = PlanConsumer::new(plans, executor, config.execution.deadline());
    let mut status = consumer.subscribe();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer_handle = tokio::spawn(consumer.run(shutdown_rx));

    // ── Request side ───────────────────────────────────────────

    let directory: Arc<dyn RoomDirectory> = Arc::new(platform.clone());
    let coordinator = Coordinator::new(SnapshotBuilder::from_config(config), directory, gate);

    let accepted = match options.phase {
        Phase::Day => {
            if let Some(requester) = options.requester.as_deref() {
                coordinator.authorize(group, &ParticipantId::new(requester)).await?;
            }
            coordinator.plan_and_submit_day(group).await?
        }
        Phase::Night => {
            let requester = night_requester(options.requester.as_deref())?;
            coordinator.authorize(group, &requester).await?;
            coordinator.plan_and_submit_night(group, &requester).await?
        }
    };
    info!(%group, phase = %accepted.phase, moves = accepted.moves, "waiting for batch");

    let wait = config.execution.deadline() + COMPLETION_GRACE;
    tokio::time::timeout(wait, status.changed())
        .await
        .context("batch did not finish in time")?
        .context("plan consumer stopped unexpectedly")?;

    let report = status
        .borrow()
        .last
        .as_deref()
        .cloned()
        .context("consumer finished without a report")?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = consumer_handle.await {
        warn!(error = %e, "plan consumer exited abnormally");
    }

    Ok(SimulationOutput {
        accepted,
        report,
        occupancy: platform.occupancy_map(),
    })
}
