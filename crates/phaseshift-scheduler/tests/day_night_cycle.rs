//! End-to-end phase changes against the in-memory platform.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::watch;

use phaseshift_core::{
    GroupFixture, GroupId, InMemoryPlatform, MemberMover, MoverConfig, ParticipantId, RoomDirectory,
    RoomId,
};
use phaseshift_scheduler::{
    AdmissionGate, BatchStatus, Coordinator, ExecutorConfig, PlanConsumer, PlanExecutor,
    SchedulerError,
};
use phaseshift_topology::SnapshotBuilder;

struct Town {
    platform: InMemoryPlatform,
    coordinator: Coordinator,
    status: watch::Receiver<BatchStatus>,
    _shutdown: watch::Sender<bool>,
}

fn fixture(players: usize, cottages: usize) -> GroupFixture {
    let mut fixture = GroupFixture::new("town")
        .category("day", "Day Phase", 0)
        .voice_room("square", "Town Square", "day", 0)
        .voice_room("tavern", "Tavern", "day", 1)
        .text_room("chat", "town-chat", "day", 2)
        .category("night", "Night Phase", 1)
        .role("st", "Storyteller")
        .member("st-main", &["st"], Some("square"))
        .member("st-helper", &["st"], Some("tavern"));
    for i in 0..cottages {
        // Listed in reverse so ordering has to come from the position.
        let n = cottages - i;
        let (id, name) = (format!("cottage{n:02}"), format!("Cottage {n}"));
        fixture = fixture.voice_room(&id, &name, "night", n as i32);
    }
    for i in 0..players {
        let room = if i % 2 == 0 { "square" } else { "tavern" };
        fixture = fixture.member(&format!("player{i:02}"), &[], Some(room));
    }
    fixture
}

fn start(fixture: GroupFixture) -> Town {
    let config = MoverConfig::scaffold(&["token-a", "token-b", "token-c"]);
    let platform = InMemoryPlatform::from_fixture(fixture);

    let movers: Vec<Arc<dyn MemberMover>> = (0..config.credentials.tokens.len())
        .map(|i| Arc::new(platform.handle(format!("credential-{i}"))) as Arc<dyn MemberMover>)
        .collect();
    let executor = PlanExecutor::new(movers, ExecutorConfig::from_execution(&config.execution))
        .expect("credentials configured");

    let (gate, plans) = AdmissionGate::channel();
    let consumer = PlanConsumer::new(plans, executor, config.execution.deadline());
    let status = consumer.subscribe();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(consumer.run(shutdown_rx));

    let directory: Arc<dyn RoomDirectory> = Arc::new(platform.clone());
    let coordinator = Coordinator::new(SnapshotBuilder::from_config(&config), directory, gate);

    Town {
        platform,
        coordinator,
        status,
        _shutdown: shutdown_tx,
    }
}

fn group() -> GroupId {
    GroupId::new("town")
}

fn storyteller() -> ParticipantId {
    ParticipantId::new("st-main")
}

async fn wait_for_batch(town: &mut Town) -> BatchStatus {
    town.status.changed().await.expect("consumer alive");
    town.status.borrow().clone()
}

#[tokio::test(start_paused = true)]
async fn full_cycle_keeps_storytellers_together() {
    let mut town = start(fixture(8, 12));

    town.coordinator
        .authorize(&group(), &storyteller())
        .await
        .unwrap();

    let accepted = town
        .coordinator
        .plan_and_submit_night(&group(), &storyteller())
        .await
        .unwrap();
    assert_eq!(accepted.moves, 10);
    let status = wait_for_batch(&mut town).await;
    assert!(status.last.as_ref().is_some_and(|r| r.is_success()));

    let occupancy = town.platform.occupancy_map();
    let storyteller_room = occupancy[&storyteller()].clone();
    assert_eq!(occupancy[&ParticipantId::new("st-helper")], storyteller_room);

    let player_rooms: Vec<&RoomId> = occupancy
        .iter()
        .filter(|(p, _)| p.as_str().starts_with("player"))
        .map(|(_, r)| r)
        .collect();
    let distinct: HashSet<&&RoomId> = player_rooms.iter().collect();
    assert_eq!(player_rooms.len(), 8);
    assert_eq!(distinct.len(), 8);
    assert!(!player_rooms.contains(&&storyteller_room));
    assert!(occupancy.values().all(|r| r.as_str().starts_with("cottage")));

    // A second night request finds everyone already placed.
    let accepted = town
        .coordinator
        .plan_and_submit_night(&group(), &storyteller())
        .await
        .unwrap();
    assert_eq!(accepted.moves, 0);
    wait_for_batch(&mut town).await;
    assert_eq!(town.platform.occupancy_map(), occupancy);

    let accepted = town.coordinator.plan_and_submit_day(&group()).await.unwrap();
    assert_eq!(accepted.moves, 10);
    let status = wait_for_batch(&mut town).await;
    assert_eq!(status.completed, 3);
    assert!(
        town.platform
            .occupancy_map()
            .values()
            .all(|r| r.as_str() == "square")
    );

    let mut per_session: HashMap<String, usize> = HashMap::new();
    for record in town.platform.move_log() {
        *per_session.entry(record.session).or_default() += 1;
    }
    assert_eq!(per_session.len(), 3);
    assert!(per_session.values().all(|&n| n >= 6));
}

#[tokio::test(start_paused = true)]
async fn night_after_day_reuses_storyteller_cottage() {
    let mut town = start(fixture(3, 5));
    town.platform
        .set_room(&storyteller(), Some(&RoomId::new("cottage04")));

    town.coordinator
        .plan_and_submit_night(&group(), &storyteller())
        .await
        .unwrap();
    wait_for_batch(&mut town).await;

    assert_eq!(
        town.platform.room_of(&"st-helper".into()),
        Some(RoomId::new("cottage04"))
    );
    assert_eq!(
        town.platform.room_of(&"player00".into()),
        Some(RoomId::new("cottage01"))
    );
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried() {
    let mut town = start(fixture(6, 8));
    town.platform.inject_move_failures(4, 1);

    town.coordinator
        .plan_and_submit_night(&group(), &storyteller())
        .await
        .unwrap();
    let status = wait_for_batch(&mut town).await;

    let report = status.last.expect("report published");
    assert!(report.is_success());
    assert_eq!(report.moved(), 8);
    assert_eq!(town.platform.move_attempts(), 12);
}

#[tokio::test(start_paused = true)]
async fn too_few_cottages_is_rejected_up_front() {
    let town = start(fixture(6, 4));

    let err = town
        .coordinator
        .plan_and_submit_night(&group(), &storyteller())
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "planning error: not enough private rooms available, \
         need 8 participant moves but only have 4 empty rooms"
    );
    assert_eq!(town.platform.move_attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn overlapping_requests_are_shed() {
    let mut town = start(fixture(4, 6));
    town.platform
        .set_move_latency(std::time::Duration::from_millis(200));

    town.coordinator
        .plan_and_submit_night(&group(), &storyteller())
        .await
        .unwrap();
    let err = town
        .coordinator
        .plan_and_submit_day(&group())
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulerError::Busy));

    wait_for_batch(&mut town).await;
    town.coordinator.plan_and_submit_day(&group()).await.unwrap();
}
