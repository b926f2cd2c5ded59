//! Coordinator: the inbound entry points for phase changes.
//!
//! Each request builds a fresh topology snapshot, plans the transition and
//! hands the plan to the admission gate. The call returns as soon as the
//! plan is accepted; execution happens on the consumer.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use phaseshift_core::{GroupId, ParticipantId, Phase, RoomDirectory};
use phaseshift_placement::{RelocationPlan, plan_day, plan_for_phase, plan_night};
use phaseshift_topology::SnapshotBuilder;

use crate::error::{SchedulerError, SchedulerResult};
use crate::gate::AdmissionGate;

/// Acknowledgement for a plan the gate accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Accepted {
    pub group: GroupId,
    pub phase: Phase,
    pub moves: usize,
}

/// Plans phase transitions and submits them for execution.
pub struct Coordinator {
    builder: SnapshotBuilder,
    directory: Arc<dyn RoomDirectory>,
    gate: AdmissionGate,
}

impl Coordinator {
    pub fn new(
        builder: SnapshotBuilder,
        directory: Arc<dyn RoomDirectory>,
        gate: AdmissionGate,
    ) -> Self {
        Self {
            builder,
            directory,
            gate,
        }
    }

    /// Collapse every connected participant into the shared room.
    pub async fn plan_and_submit_day(&self, group: &GroupId) -> SchedulerResult<Accepted> {
        self.ensure_idle(group, Phase::Day)?;
        let snapshot = self.builder.build(self.directory.as_ref(), group).await?;
        self.submit(group, Phase::Day, plan_day(&snapshot))
    }

    /// Fan participants out into private rooms, anchoring the facilitator
    /// room on `requester` when they are a facilitator already sitting in
    /// one. Access control is separate: see [`Coordinator::authorize`].
    pub async fn plan_and_submit_night(
        &self,
        group: &GroupId,
        requester: &ParticipantId,
    ) -> SchedulerResult<Accepted> {
        self.ensure_idle(group, Phase::Night)?;
        let snapshot = self.builder.build(self.directory.as_ref(), group).await?;
        let plan = plan_night(&snapshot, requester)?;
        self.submit(group, Phase::Night, plan)
    }

    /// Compute the plan for `phase` without submitting it.
    pub async fn preview(
        &self,
        group: &GroupId,
        phase: Phase,
        requester: &ParticipantId,
    ) -> SchedulerResult<RelocationPlan> {
        let snapshot = self.builder.build(self.directory.as_ref(), group).await?;
        Ok(plan_for_phase(&snapshot, phase, requester)?)
    }

    /// Check that `requester` is in the roster and holds the facilitator role.
    pub async fn authorize(
        &self,
        group: &GroupId,
        requester: &ParticipantId,
    ) -> SchedulerResult<()> {
        let snapshot = self.builder.build(self.directory.as_ref(), group).await?;
        match snapshot.participant(requester) {
            Some(p) if p.facilitator => {
                debug!(%group, %requester, "requester authorized");
                Ok(())
            }
            _ => {
                warn!(
                    %group,
                    %requester,
                    role = self.builder.facilitator_role(),
                    "requester lacks facilitator role"
                );
                Err(SchedulerError::Unauthorized {
                    group: group.clone(),
                    participant: requester.clone(),
                })
            }
        }
    }

    /// Skip the snapshot entirely when a batch is already running.
    fn ensure_idle(&self, group: &GroupId, phase: Phase) -> SchedulerResult<()> {
        if self.gate.is_busy() {
            warn!(%group, %phase, "batch in progress, not planning");
            return Err(SchedulerError::Busy);
        }
        Ok(())
    }

    fn submit(
        &self,
        group: &GroupId,
        phase: Phase,
        plan: RelocationPlan,
    ) -> SchedulerResult<Accepted> {
        let moves = plan.len();
        debug!(%group, %phase, "{plan}");

        self.gate.submit(plan)?;
        info!(%group, %phase, moves, "phase change submitted");

        Ok(Accepted {
            group: group.clone(),
            phase,
            moves,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use phaseshift_core::{GroupFixture, InMemoryPlatform, MemberMover, RoomId};
    use phaseshift_placement::PlanError;
    use phaseshift_topology::TopologyError;
    use tokio::sync::watch;

    use super::*;
    use crate::executor::{ExecutorConfig, PlanExecutor};
    use crate::gate::{PlanConsumer, PlanReceiver};

    fn fixture() -> GroupFixture {
        GroupFixture::new("town")
            .category("day", "Day Phase", 0)
            .voice_room("square", "Town Square", "day", 0)
            .category("night", "Night Phase", 1)
            .voice_room("cottage1", "Cottage 1", "night", 0)
            .voice_room("cottage2", "Cottage 2", "night", 1)
            .voice_room("cottage3", "Cottage 3", "night", 2)
            .role("st", "Storyteller")
            .member("alice", &["st"], Some("square"))
            .member("bob", &[], Some("square"))
            .member("carol", &[], Some("cottage2"))
            .member("dave", &[], None)
    }

    fn builder() -> SnapshotBuilder {
        SnapshotBuilder::new("Day Phase", "Night Phase", "Town Square", "Storyteller")
    }

    fn coordinator(platform: &InMemoryPlatform) -> (Coordinator, PlanReceiver) {
        let (gate, plans) = AdmissionGate::channel();
        let directory: Arc<dyn RoomDirectory> = Arc::new(platform.clone());
        (Coordinator::new(builder(), directory, gate), plans)
    }

    fn spawn_consumer(
        platform: &InMemoryPlatform,
        plans: PlanReceiver,
    ) -> watch::Receiver<crate::BatchStatus> {
        let movers: Vec<Arc<dyn MemberMover>> = vec![Arc::new(platform.handle("credential-0"))];
        let executor = PlanExecutor::new(movers, ExecutorConfig::default()).unwrap();
        let consumer = PlanConsumer::new(plans, executor, Duration::from_secs(15));
        let status = consumer.subscribe();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            consumer.run(shutdown_rx).await;
            drop(shutdown_tx);
        });
        status
    }

    #[tokio::test(start_paused = true)]
    async fn night_then_day() {
        let platform = InMemoryPlatform::from_fixture(fixture());
        let (coordinator, plans) = coordinator(&platform);
        let mut status = spawn_consumer(&platform, plans);
        let group = GroupId::new("town");

        let accepted = coordinator
            .plan_and_submit_night(&group, &"alice".into())
            .await
            .unwrap();
        assert_eq!(accepted.phase, Phase::Night);
        assert_eq!(accepted.moves, 2);
        status.changed().await.unwrap();

        assert_eq!(platform.room_of(&"alice".into()), Some(RoomId::new("cottage1")));
        assert_eq!(platform.room_of(&"bob".into()), Some(RoomId::new("cottage3")));
        assert_eq!(platform.room_of(&"carol".into()), Some(RoomId::new("cottage2")));
        assert_eq!(platform.room_of(&"dave".into()), None);

        let accepted = coordinator.plan_and_submit_day(&group).await.unwrap();
        assert_eq!(accepted.moves, 3);
        status.changed().await.unwrap();

        for id in ["alice", "bob", "carol"] {
            assert_eq!(platform.room_of(&id.into()), Some(RoomId::new("square")));
        }
    }

    #[tokio::test]
    async fn busy_while_batch_pending() {
        let platform = InMemoryPlatform::from_fixture(fixture());
        let (coordinator, _plans) = coordinator(&platform);
        let group = GroupId::new("town");

        coordinator.plan_and_submit_day(&group).await.unwrap();
        let err = coordinator.plan_and_submit_day(&group).await.unwrap_err();
        assert!(matches!(err, SchedulerError::Busy));
    }

    #[tokio::test]
    async fn capacity_error_surfaces_without_submitting() {
        let platform = InMemoryPlatform::from_fixture(
            fixture()
                .member("erin", &[], Some("square"))
                .member("frank", &[], Some("square")),
        );
        let (coordinator, _plans) = coordinator(&platform);

        let err = coordinator
            .plan_and_submit_night(&"town".into(), &"alice".into())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::Plan(PlanError::InsufficientCapacity {
                needed: 4,
                available: 2
            })
        ));
        assert!(!coordinator.gate.is_busy());
    }

    #[tokio::test]
    async fn topology_error_surfaces() {
        let platform = InMemoryPlatform::from_fixture(fixture());
        let (gate, _plans) = AdmissionGate::channel();
        let coordinator = Coordinator::new(
            SnapshotBuilder::new("Daytime", "Night Phase", "Town Square", "Storyteller"),
            Arc::new(platform),
            gate,
        );

        let err = coordinator.plan_and_submit_day(&"town".into()).await.unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::Topology(TopologyError::DayCategoryNotFound(name)) if name == "Daytime"
        ));
    }

    #[tokio::test]
    async fn authorize_requires_facilitator_role() {
        let platform = InMemoryPlatform::from_fixture(fixture());
        let (coordinator, _plans) = coordinator(&platform);
        let group = GroupId::new("town");

        coordinator.authorize(&group, &"alice".into()).await.unwrap();

        let err = coordinator.authorize(&group, &"bob".into()).await.unwrap_err();
        assert!(matches!(err, SchedulerError::Unauthorized { .. }));

        let err = coordinator.authorize(&group, &"mallory".into()).await.unwrap_err();
        assert!(matches!(err, SchedulerError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn preview_does_not_occupy_gate() {
        let platform = InMemoryPlatform::from_fixture(fixture());
        let (coordinator, _plans) = coordinator(&platform);

        let plan = coordinator
            .preview(&"town".into(), Phase::Day, &"alice".into())
            .await
            .unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.destination(&"carol".into()), Some(&RoomId::new("square")));
        assert!(!coordinator.gate.is_busy());
        assert_eq!(platform.move_attempts(), 0);
    }
}
