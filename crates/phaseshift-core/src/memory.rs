//! In-memory platform: a shared group model implementing both platform traits.
//!
//! Every handle created with [`InMemoryPlatform::handle`] shares the same
//! group state but carries its own label, so a set of handles behaves like
//! several credentialed sessions against one group. Moves are recorded in a
//! log together with the label of the session that performed them.
//!
//! Used by tests across the workspace and by `phaseshiftd simulate`.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use crate::platform::{MemberMover, PlatformError, PlatformResult, RoomDirectory};
use crate::types::{
    GroupId, Member, Occupancy, ParticipantId, Role, RoleId, Room, RoomId, RoomKind,
};

/// Serializable description of a group, loadable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupFixture {
    pub group: GroupId,
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub members: Vec<FixtureMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureMember {
    pub id: ParticipantId,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub roles: BTreeSet<RoleId>,
    /// Room the member is connected to, if any.
    #[serde(default)]
    pub room: Option<RoomId>,
}

impl GroupFixture {
    pub fn new(group: &str) -> Self {
        Self {
            group: group.into(),
            rooms: Vec::new(),
            roles: Vec::new(),
            members: Vec::new(),
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn category(mut self, id: &str, name: &str, position: i32) -> Self {
        self.rooms.push(Room {
            id: id.into(),
            name: name.to_string(),
            kind: RoomKind::Category,
            parent: None,
            position,
        });
        self
    }

    pub fn voice_room(mut self, id: &str, name: &str, parent: &str, position: i32) -> Self {
        self.rooms.push(Room {
            id: id.into(),
            name: name.to_string(),
            kind: RoomKind::Voice,
            parent: Some(parent.into()),
            position,
        });
        self
    }

    pub fn text_room(mut self, id: &str, name: &str, parent: &str, position: i32) -> Self {
        self.rooms.push(Room {
            id: id.into(),
            name: name.to_string(),
            kind: RoomKind::Other,
            parent: Some(parent.into()),
            position,
        });
        self
    }

    pub fn role(mut self, id: &str, name: &str) -> Self {
        self.roles.push(Role {
            id: id.into(),
            name: name.to_string(),
        });
        self
    }

    pub fn member(mut self, id: &str, roles: &[&str], room: Option<&str>) -> Self {
        self.members.push(FixtureMember {
            id: id.into(),
            display_name: id.to_string(),
            roles: roles.iter().map(|r| RoleId::new(*r)).collect(),
            room: room.map(RoomId::new),
        });
        self
    }
}

/// A move performed by one of the handles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveRecord {
    pub session: String,
    pub participant: ParticipantId,
    pub room: RoomId,
}

#[derive(Debug, Default)]
struct FailureInjection {
    /// Failures still to be handed out across all participants.
    remaining: usize,
    /// Maximum injected failures for any single participant.
    per_participant: u32,
    counts: HashMap<ParticipantId, u32>,
}

impl FailureInjection {
    fn should_fail(&mut self, participant: &ParticipantId) -> bool {
        if self.remaining == 0 {
            return false;
        }
        let count = self.counts.entry(participant.clone()).or_insert(0);
        if *count >= self.per_participant {
            return false;
        }
        *count += 1;
        self.remaining -= 1;
        true
    }
}

#[derive(Debug)]
struct GroupState {
    group: GroupId,
    rooms: Vec<Room>,
    roles: Vec<Role>,
    members: BTreeMap<ParticipantId, Member>,
    occupancy: BTreeMap<ParticipantId, RoomId>,
    failures: FailureInjection,
    move_log: Vec<MoveRecord>,
    move_attempts: usize,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<GroupState>,
    move_latency: Mutex<Duration>,
}

/// Mutex-guarded in-memory group. Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct InMemoryPlatform {
    label: String,
    shared: Arc<Shared>,
}

impl InMemoryPlatform {
    pub fn from_fixture(fixture: GroupFixture) -> Self {
        let mut members = BTreeMap::new();
        let mut occupancy = BTreeMap::new();
        for m in fixture.members {
            if let Some(room) = m.room {
                occupancy.insert(m.id.clone(), room);
            }
            members.insert(
                m.id.clone(),
                Member {
                    id: m.id,
                    display_name: m.display_name,
                    roles: m.roles,
                },
            );
        }

        debug!(group = %fixture.group, members = members.len(), "in-memory platform opened");

        Self {
            label: "primary".to_string(),
            shared: Arc::new(Shared {
                state: Mutex::new(GroupState {
                    group: fixture.group,
                    rooms: fixture.rooms,
                    roles: fixture.roles,
                    members,
                    occupancy,
                    failures: FailureInjection::default(),
                    move_log: Vec::new(),
                    move_attempts: 0,
                }),
                move_latency: Mutex::new(Duration::ZERO),
            }),
        }
    }

    /// Another session against the same group.
    pub fn handle(&self, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            shared: Arc::clone(&self.shared),
        }
    }

    /// Fail the next `total` move attempts, at most `per_participant` times
    /// for any one participant.
    pub fn inject_move_failures(&self, total: usize, per_participant: u32) {
        let mut state = self.state();
        state.failures = FailureInjection {
            remaining: total,
            per_participant,
            counts: HashMap::new(),
        };
    }

    /// Delay applied to every move call before it takes effect.
    pub fn set_move_latency(&self, latency: Duration) {
        *self
            .shared
            .move_latency
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = latency;
    }

    /// Connect or disconnect a participant.
    pub fn set_room(&self, participant: &ParticipantId, room: Option<&RoomId>) {
        let mut state = self.state();
        match room {
            Some(room) => {
                state.occupancy.insert(participant.clone(), room.clone());
            }
            None => {
                state.occupancy.remove(participant);
            }
        }
    }

    pub fn room_of(&self, participant: &ParticipantId) -> Option<RoomId> {
        self.state().occupancy.get(participant).cloned()
    }

    pub fn occupancy_map(&self) -> BTreeMap<ParticipantId, RoomId> {
        self.state().occupancy.clone()
    }

    pub fn move_log(&self) -> Vec<MoveRecord> {
        self.state().move_log.clone()
    }

    /// Every move call, successful or not.
    pub fn move_attempts(&self) -> usize {
        self.state().move_attempts
    }

    fn state(&self) -> MutexGuard<'_, GroupState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn latency(&self) -> Duration {
        *self
            .shared
            .move_latency
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn checked_state(&self, group: &GroupId) -> PlatformResult<MutexGuard<'_, GroupState>> {
        let state = self.state();
        if &state.group != group {
            return Err(PlatformError::UnknownGroup(group.clone()));
        }
        Ok(state)
    }
}

#[async_trait]
impl RoomDirectory for InMemoryPlatform {
    async fn list_rooms(&self, group: &GroupId) -> PlatformResult<Vec<Room>> {
        Ok(self.checked_state(group)?.rooms.clone())
    }

    async fn occupancy(&self, group: &GroupId) -> PlatformResult<Vec<Occupancy>> {
        let state = self.checked_state(group)?;
        Ok(state
            .occupancy
            .iter()
            .map(|(participant, room)| Occupancy {
                participant: participant.clone(),
                room: Some(room.clone()),
            })
            .collect())
    }

    async fn list_members(
        &self,
        group: &GroupId,
        after: Option<&ParticipantId>,
        limit: usize,
    ) -> PlatformResult<Vec<Member>> {
        let state = self.checked_state(group)?;
        Ok(state
            .members
            .values()
            .filter(|m| after.is_none_or(|a| &m.id > a))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_roles(&self, group: &GroupId) -> PlatformResult<Vec<Role>> {
        Ok(self.checked_state(group)?.roles.clone())
    }
}

#[async_trait]
impl MemberMover for InMemoryPlatform {
    fn label(&self) -> &str {
        &self.label
    }

    async fn move_member(
        &self,
        group: &GroupId,
        participant: &ParticipantId,
        room: &RoomId,
        deadline: Instant,
    ) -> PlatformResult<()> {
        let latency = self.latency();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if Instant::now() >= deadline {
            return Err(PlatformError::DeadlineExceeded);
        }

        let mut state = self.checked_state(group)?;
        state.move_attempts += 1;

        if !state.members.contains_key(participant) {
            return Err(PlatformError::UnknownParticipant(participant.clone()));
        }
        if !state
            .rooms
            .iter()
            .any(|r| &r.id == room && r.kind == RoomKind::Voice)
        {
            return Err(PlatformError::UnknownRoom(room.clone()));
        }
        if state.failures.should_fail(participant) {
            return Err(PlatformError::Request("injected transient failure".to_string()));
        }

        state.occupancy.insert(participant.clone(), room.clone());
        state.move_log.push(MoveRecord {
            session: self.label.clone(),
            participant: participant.clone(),
            room: room.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> GroupFixture {
        GroupFixture::new("guild")
            .category("day", "Day Phase", 0)
            .voice_room("square", "Town Square", "day", 0)
            .category("night", "Night Phase", 1)
            .voice_room("cottage-1", "Cottage 1", "night", 0)
            .role("st", "Storyteller")
            .member("alice", &["st"], Some("square"))
            .member("bob", &[], None)
            .member("carol", &[], Some("square"))
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    #[tokio::test]
    async fn lists_members_in_pages() {
        let platform = InMemoryPlatform::from_fixture(fixture());
        let group = GroupId::new("guild");

        let first = platform.list_members(&group, None, 2).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].id.as_str(), "alice");

        let rest = platform
            .list_members(&group, Some(&first[1].id), 2)
            .await
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id.as_str(), "carol");
    }

    #[tokio::test]
    async fn occupancy_omits_disconnected() {
        let platform = InMemoryPlatform::from_fixture(fixture());
        let occ = platform.occupancy(&GroupId::new("guild")).await.unwrap();
        assert_eq!(occ.len(), 2);
        assert!(occ.iter().all(|o| o.participant.as_str() != "bob"));
    }

    #[tokio::test]
    async fn unknown_group_is_rejected() {
        let platform = InMemoryPlatform::from_fixture(fixture());
        let err = platform.list_rooms(&GroupId::new("other")).await.unwrap_err();
        assert_eq!(err, PlatformError::UnknownGroup(GroupId::new("other")));
    }

    #[tokio::test]
    async fn move_updates_shared_state_and_log() {
        let platform = InMemoryPlatform::from_fixture(fixture());
        let second = platform.handle("session-2");
        let group = GroupId::new("guild");

        second
            .move_member(&group, &"alice".into(), &"cottage-1".into(), far_deadline())
            .await
            .unwrap();

        assert_eq!(platform.room_of(&"alice".into()), Some(RoomId::new("cottage-1")));
        let log = platform.move_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].session, "session-2");
    }

    #[tokio::test]
    async fn move_into_category_is_rejected() {
        let platform = InMemoryPlatform::from_fixture(fixture());
        let err = platform
            .move_member(&"guild".into(), &"alice".into(), &"night".into(), far_deadline())
            .await
            .unwrap_err();
        assert_eq!(err, PlatformError::UnknownRoom(RoomId::new("night")));
    }

    #[tokio::test]
    async fn injected_failures_respect_per_participant_cap() {
        let platform = InMemoryPlatform::from_fixture(fixture());
        platform.inject_move_failures(10, 1);
        let group = GroupId::new("guild");
        let alice = ParticipantId::new("alice");
        let room = RoomId::new("cottage-1");

        assert!(platform.move_member(&group, &alice, &room, far_deadline()).await.is_err());
        assert!(platform.move_member(&group, &alice, &room, far_deadline()).await.is_ok());
        assert_eq!(platform.move_attempts(), 2);
    }

    #[tokio::test]
    async fn expired_deadline_is_reported() {
        let platform = InMemoryPlatform::from_fixture(fixture());
        let err = platform
            .move_member(&"guild".into(), &"alice".into(), &"cottage-1".into(), Instant::now())
            .await
            .unwrap_err();
        assert_eq!(err, PlatformError::DeadlineExceeded);
        assert_eq!(platform.move_attempts(), 0);
    }

    #[test]
    fn fixture_parses_from_toml() {
        let toml_str = r#"
group = "guild"

[[rooms]]
id = "day"
name = "Day Phase"
kind = "category"

[[rooms]]
id = "square"
name = "Town Square"
kind = "voice"
parent = "day"

[[roles]]
id = "st"
name = "Storyteller"

[[members]]
id = "alice"
roles = ["st"]
room = "square"

[[members]]
id = "bob"
"#;
        let fixture = GroupFixture::from_toml_str(toml_str).unwrap();
        assert_eq!(fixture.rooms.len(), 2);
        assert_eq!(fixture.rooms[1].parent, Some(RoomId::new("day")));
        assert_eq!(fixture.members[1].room, None);

        let platform = InMemoryPlatform::from_fixture(fixture);
        assert_eq!(platform.occupancy_map().len(), 1);
    }

    #[test]
    fn new_fixture_starts_empty() {
        let fixture = GroupFixture::new("guild");
        assert_eq!(fixture.group.as_str(), "guild");
        assert!(fixture.rooms.is_empty());
        assert!(fixture.roles.is_empty());
        assert!(fixture.members.is_empty());

        let parsed = GroupFixture::from_toml_str("group = \"guild\"").unwrap();
        assert_eq!(parsed.group, fixture.group);
        assert!(parsed.members.is_empty());
    }
}
