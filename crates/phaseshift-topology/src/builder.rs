//! Snapshot builder: queries the platform and assembles a validated snapshot.
//!
//! Steps, each of which can fail the request:
//! 1. List rooms and locate the day category, night category, and shared room
//! 2. Check the shared room sits under the day category
//! 3. Collect the night category's voice rooms, ordered by position
//! 4. Resolve the facilitator role, fetch occupancy and the (paged) roster

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use phaseshift_core::config::{MoverConfig, RequestsConfig};
use phaseshift_core::{
    GroupId, Member, Participant, ParticipantId, PlatformResult, RoleId, Room, RoomDirectory,
    RoomId, RoomKind,
};

use crate::error::{TopologyError, TopologyResult};
use crate::snapshot::{SnapshotParts, TopologySnapshot};

/// Builds [`TopologySnapshot`]s from configured room and role names.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    day_category: String,
    night_category: String,
    shared_room: String,
    facilitator_role: String,
    request_timeout: Duration,
    page_size: usize,
    roster_limit: usize,
}

impl SnapshotBuilder {
    pub fn new(
        day_category: impl Into<String>,
        night_category: impl Into<String>,
        shared_room: impl Into<String>,
        facilitator_role: impl Into<String>,
    ) -> Self {
        let requests = RequestsConfig::default();
        Self {
            day_category: day_category.into(),
            night_category: night_category.into(),
            shared_room: shared_room.into(),
            facilitator_role: facilitator_role.into(),
            request_timeout: requests.per_request_timeout(),
            page_size: requests.member_page_size,
            roster_limit: requests.roster_limit,
        }
    }

    pub fn from_config(config: &MoverConfig) -> Self {
        Self::new(
            &config.rooms.day_category,
            &config.rooms.night_category,
            &config.rooms.shared_room,
            &config.roles.facilitator,
        )
        .with_request_timeout(config.requests.per_request_timeout())
        .with_paging(config.requests.member_page_size, config.requests.roster_limit)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Page size for member listing and the overall roster cap.
    pub fn with_paging(mut self, page_size: usize, roster_limit: usize) -> Self {
        self.page_size = page_size.max(1);
        self.roster_limit = roster_limit.max(1);
        self
    }

    pub fn facilitator_role(&self) -> &str {
        &self.facilitator_role
    }

    /// Query the platform and build a validated snapshot for `group`.
    pub async fn build(
        &self,
        directory: &dyn RoomDirectory,
        group: &GroupId,
    ) -> TopologyResult<TopologySnapshot> {
        let rooms = self
            .bounded("list group rooms", directory.list_rooms(group))
            .await?;

        let day_category = find_room(&rooms, &self.day_category, RoomKind::Category)
            .ok_or_else(|| TopologyError::DayCategoryNotFound(self.day_category.clone()))?;
        let night_category = find_room(&rooms, &self.night_category, RoomKind::Category)
            .ok_or_else(|| TopologyError::NightCategoryNotFound(self.night_category.clone()))?;
        let shared_room = find_room(&rooms, &self.shared_room, RoomKind::Voice)
            .ok_or_else(|| TopologyError::SharedRoomNotFound(self.shared_room.clone()))?;

        if !shared_room.is_child_of(day_category) {
            return Err(TopologyError::SharedRoomMisplaced {
                room: shared_room.name.clone(),
                category: day_category.name.clone(),
            });
        }

        let private_rooms: Vec<Room> = rooms
            .iter()
            .filter(|r| r.kind == RoomKind::Voice && r.is_child_of(night_category))
            .cloned()
            .collect();

        debug!(
            %group,
            private_rooms = private_rooms.len(),
            "located day/night rooms"
        );

        let facilitator = self.resolve_facilitator_role(directory, group).await?;

        let occupancy: HashMap<ParticipantId, RoomId> = self
            .bounded("fetch room occupancy", directory.occupancy(group))
            .await?
            .into_iter()
            .filter_map(|o| o.room.map(|room| (o.participant, room)))
            .collect();

        let members = self.fetch_roster(directory, group).await?;

        let roster: Vec<Participant> = members
            .into_iter()
            .map(|m| Participant {
                current_room: occupancy.get(&m.id).cloned(),
                facilitator: m.roles.contains(&facilitator),
                id: m.id,
                display_name: m.display_name,
                roles: m.roles,
            })
            .collect();

        let snapshot = TopologySnapshot::new(SnapshotParts {
            group: group.clone(),
            day_category: day_category.clone(),
            night_category: night_category.clone(),
            shared_room: shared_room.clone(),
            private_rooms,
            roster,
        })?;

        info!(
            %group,
            private_rooms = snapshot.private_rooms().len(),
            roster = snapshot.roster().len(),
            connected = snapshot.connected().count(),
            "topology snapshot built"
        );

        Ok(snapshot)
    }

    /// Every page of members up to the roster limit, first occurrence wins.
    async fn fetch_roster(
        &self,
        directory: &dyn RoomDirectory,
        group: &GroupId,
    ) -> TopologyResult<Vec<Member>> {
        let mut members: Vec<Member> = Vec::new();
        let mut seen: HashSet<ParticipantId> = HashSet::new();
        let mut after: Option<ParticipantId> = None;

        while members.len() < self.roster_limit {
            let limit = self.page_size.min(self.roster_limit - members.len());
            let page = self
                .bounded(
                    "list group members",
                    directory.list_members(group, after.as_ref(), limit),
                )
                .await?;

            let page_len = page.len();
            let Some(last) = page.last() else { break };
            after = Some(last.id.clone());

            let before = members.len();
            for member in page {
                if seen.insert(member.id.clone()) {
                    members.push(member);
                }
            }

            if members.len() == before {
                warn!(%group, "member page contained no new members, stopping");
                break;
            }
            if page_len < limit {
                break;
            }
        }

        if members.len() >= self.roster_limit {
            debug!(%group, limit = self.roster_limit, "roster limit reached");
        }

        Ok(members)
    }

    async fn resolve_facilitator_role(
        &self,
        directory: &dyn RoomDirectory,
        group: &GroupId,
    ) -> TopologyResult<RoleId> {
        self.bounded("list group roles", directory.list_roles(group))
            .await?
            .into_iter()
            .find(|role| role.name == self.facilitator_role)
            .map(|role| role.id)
            .ok_or_else(|| TopologyError::FacilitatorRoleNotFound(self.facilitator_role.clone()))
    }

    /// Apply the per-request timeout and attach the operation name to errors.
    async fn bounded<T>(
        &self,
        operation: &'static str,
        request: impl Future<Output = PlatformResult<T>>,
    ) -> TopologyResult<T> {
        match tokio::time::timeout(self.request_timeout, request).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(TopologyError::Platform { operation, source }),
            Err(_) => Err(TopologyError::Timeout {
                operation,
                timeout: self.request_timeout,
            }),
        }
    }
}

fn find_room<'a>(rooms: &'a [Room], name: &str, kind: RoomKind) -> Option<&'a Room> {
    rooms.iter().find(|r| r.kind == kind && r.name == name)
}
