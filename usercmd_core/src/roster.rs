//! Frame-start snapshot of the players, used for every cross-entity read.
//!
//! Movement results are staged during the frame and only committed after every player
//! has simulated, so anything that needs to look at *other* players (lag compensation,
//! spectator target validation) reads the [`PlayerRoster`] instead of the live components.
use alloc::vec::Vec;
use core::time::Duration;

use bevy_ecs::entity::EntityHashMap;
use bevy_ecs::prelude::*;
use bevy_math::Vec3;
use bevy_reflect::Reflect;
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use tracing::trace;

/// Index of the player in the server's player list.
///
/// Slots index the transmit bit-vectors and define the order in which spectator
/// targets are cycled through.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect)]
pub struct PlayerSlot(pub usize);

#[derive(
    Component, Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize,
)]
pub struct Team(pub u8);

impl Team {
    pub const UNASSIGNED: Team = Team(0);
    pub const SPECTATOR: Team = Team(1);

    /// True for teams that take part in the game (not unassigned, not spectators)
    pub fn is_playing(&self) -> bool {
        self.0 > Self::SPECTATOR.0
    }
}

#[derive(Component, Clone, Copy, Debug, Default, PartialEq, Reflect)]
pub enum LifeState {
    #[default]
    Alive,
    /// The player died at the given elapsed time and is playing its death animation
    Dying { since: Duration },
    Dead,
}

impl LifeState {
    pub fn is_alive(&self) -> bool {
        matches!(self, LifeState::Alive)
    }
}

/// Committed movement state of a player
#[derive(Component, Clone, Copy, Debug, Default, PartialEq, Reflect, Serialize, Deserialize)]
pub struct MoveState {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Pitch, yaw, roll in degrees
    pub view_angles: Vec3,
}

/// Marker inserted on players that are currently spectating
#[derive(Component, Clone, Copy, Debug, Default, PartialEq, Eq, Reflect)]
pub struct Observing;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RosterEntry {
    pub entity: Entity,
    pub slot: PlayerSlot,
    pub team: Team,
    pub life: LifeState,
    pub position: Vec3,
    /// Pitch, yaw, roll in degrees
    pub view_angles: Vec3,
    pub observing: bool,
}

impl RosterEntry {
    pub fn new(entity: Entity, slot: usize) -> Self {
        Self {
            entity,
            slot: PlayerSlot(slot),
            team: Team::UNASSIGNED,
            life: LifeState::Alive,
            position: Vec3::ZERO,
            view_angles: Vec3::ZERO,
            observing: false,
        }
    }

    pub fn with_team(mut self, team: Team) -> Self {
        self.team = team;
        self
    }

    pub fn with_life(mut self, life: LifeState) -> Self {
        self.life = life;
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_view_angles(mut self, view_angles: Vec3) -> Self {
        self.view_angles = view_angles;
        self
    }

    pub fn with_observing(mut self, observing: bool) -> Self {
        self.observing = observing;
        self
    }
}

/// Snapshot of every connected player, indexed by [`PlayerSlot`].
///
/// An [`Entity`] that is not in the roster (disconnected, despawned, or spawned after the
/// snapshot) resolves to `None`: holders of a weak reference must re-check it on every access.
#[derive(Resource, Debug, Default, Clone)]
pub struct PlayerRoster {
    slots: Vec<Option<RosterEntry>>,
    by_entity: EntityHashMap<usize>,
}

impl PlayerRoster {
    pub fn insert(&mut self, entry: RosterEntry) {
        let slot = entry.slot.0;
        if let Some(old_slot) = self.by_entity.remove(&entry.entity) {
            self.slots[old_slot] = None;
        }
        if slot >= self.slots.len() {
            self.slots.resize(slot + 1, None);
        }
        if let Some(previous) = self.slots[slot].replace(entry) {
            self.by_entity.remove(&previous.entity);
        }
        self.by_entity.insert(entry.entity, slot);
    }

    pub fn remove(&mut self, entity: Entity) -> Option<RosterEntry> {
        let slot = self.by_entity.remove(&entity)?;
        self.slots[slot].take()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.by_entity.clear();
    }

    /// Resolve a weak entity reference
    pub fn get(&self, entity: Entity) -> Option<&RosterEntry> {
        self.by_entity
            .get(&entity)
            .and_then(|slot| self.slots[*slot].as_ref())
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.by_entity.contains_key(&entity)
    }

    pub fn by_slot(&self, slot: usize) -> Option<&RosterEntry> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Number of slots (occupied or not)
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of players in the roster
    pub fn len(&self) -> usize {
        self.by_entity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_entity.is_empty()
    }

    /// Occupied slots in slot order
    pub fn iter(&self) -> impl Iterator<Item = &RosterEntry> {
        self.slots.iter().filter_map(Option::as_ref)
    }
}

/// Rebuild the [`PlayerRoster`] from the committed player state at the start of the frame
pub(crate) fn snapshot_roster(
    mut roster: ResMut<PlayerRoster>,
    players: Query<(
        Entity,
        &PlayerSlot,
        Option<&Team>,
        Option<&LifeState>,
        Option<&MoveState>,
        Has<Observing>,
    )>,
) {
    roster.clear();
    for (entity, slot, team, life, state, observing) in players.iter() {
        roster.insert(RosterEntry {
            entity,
            slot: *slot,
            team: team.copied().unwrap_or_default(),
            life: life.copied().unwrap_or_default(),
            position: state.map(|s| s.position).unwrap_or_default(),
            view_angles: state.map(|s| s.view_angles).unwrap_or_default(),
            observing,
        });
    }
    trace!(players = roster.len(), "took roster snapshot");
}
