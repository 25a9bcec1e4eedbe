//! The [`ObserverState`] state machine
use core::time::Duration;

use bevy_ecs::prelude::*;
use bevy_reflect::Reflect;
#[allow(unused_imports)]
use tracing::{debug, trace};

use usercmd_core::config::SimulationConfig;
use usercmd_core::roster::{LifeState, PlayerRoster, RosterEntry};

use crate::mode::ObserverMode;
use crate::policy::{CameraRestriction, ObserverPolicy};

/// Everything the state machine needs to validate targets.
///
/// Targets are weak references resolved through the roster: a player that left resolves to
/// nothing and is never a valid target.
pub struct ObserverContext<'a> {
    /// The spectating player
    pub observer: Entity,
    pub roster: &'a PlayerRoster,
    pub policy: &'a dyn ObserverPolicy,
    pub config: &'a SimulationConfig,
    /// Elapsed time, on the same clock as the `since` of [`LifeState::Dying`]
    pub now: Duration,
}

impl ObserverContext<'_> {
    /// True if `target` can be watched in `mode`
    pub fn is_valid_target(&self, target: Entity, mode: ObserverMode) -> bool {
        let Some(entry) = self.roster.get(target) else {
            return false;
        };
        self.is_valid_entry(entry, mode)
    }

    fn is_valid_entry(&self, entry: &RosterEntry, mode: ObserverMode) -> bool {
        if entry.entity == self.observer || entry.observing || !entry.team.is_playing() {
            return false;
        }
        match entry.life {
            LifeState::Alive => {}
            // the death animation can still be watched from outside the body
            LifeState::Dying { since } if mode != ObserverMode::FirstPerson => {
                if self.now.saturating_sub(since) > self.config.death_linger {
                    return false;
                }
            }
            _ => return false,
        }
        if self.config.allow_cheats {
            return true;
        }
        let Some(observer) = self.roster.get(self.observer) else {
            return true;
        };
        // spectators that are not on a playing team see everything
        if !observer.team.is_playing() {
            return true;
        }
        match self.policy.camera_restriction() {
            CameraRestriction::AllowAll => true,
            CameraRestriction::AllowTeam => entry.team == observer.team,
            CameraRestriction::AllowNone => false,
        }
    }
}

/// Spectator state of a player.
///
/// `forced` is set when the current mode was imposed because the chosen mode had no valid
/// target; `last_mode` then remembers the chosen mode, which is restored as soon as a valid
/// target shows up again.
#[derive(Component, Debug, Clone, Default, PartialEq, Reflect)]
pub struct ObserverState {
    mode: ObserverMode,
    target: Option<Entity>,
    forced: bool,
    last_mode: ObserverMode,
    /// Slot from which the next target search starts
    search_cursor: Option<usize>,
    /// Incremented on every transition
    revision: u32,
    pub(crate) notified_revision: u32,
}

impl ObserverState {
    pub fn mode(&self) -> ObserverMode {
        self.mode
    }

    /// The target, as last set. Check it with [`ObserverContext::is_valid_target`] before use.
    pub fn target(&self) -> Option<Entity> {
        self.target
    }

    pub fn is_forced(&self) -> bool {
        self.forced
    }

    pub fn last_mode(&self) -> ObserverMode {
        self.last_mode
    }

    pub fn is_observing(&self) -> bool {
        self.mode != ObserverMode::None
    }

    pub fn revision(&self) -> u32 {
        self.revision
    }

    /// Start spectating. Only possible when not spectating already.
    ///
    /// If `mode` needs a target and none is available, the machine starts in the fallback mode
    /// of the policy, remembering `mode`.
    pub fn start(&mut self, mode: ObserverMode, ctx: &ObserverContext) -> bool {
        if self.is_observing() || mode == ObserverMode::None {
            return false;
        }
        self.search_cursor = None;
        self.forced = false;
        self.last_mode = mode;
        if mode.requires_target() {
            match self.find_next_target_for(mode, false, ctx) {
                Some(target) => self.target = Some(target),
                None => {
                    self.target = None;
                    self.mode = ctx.policy.fallback_mode();
                    self.forced = true;
                    self.bump();
                    debug!(observer = ?ctx.observer, ?mode, fallback = ?self.mode, "started observing without target");
                    return true;
                }
            }
        }
        self.mode = mode;
        self.bump();
        debug!(observer = ?ctx.observer, ?mode, target = ?self.target, "started observing");
        true
    }

    /// Switch to a mode chosen by the player
    pub fn set_mode(&mut self, mode: ObserverMode, ctx: &ObserverContext) -> bool {
        if !self.is_observing() || mode == ObserverMode::None {
            return false;
        }
        if mode == self.mode && !self.forced {
            return true;
        }
        let mut target = self.target;
        if mode.requires_target() && !target.is_some_and(|t| ctx.is_valid_target(t, mode)) {
            target = self.find_next_target_for(mode, false, ctx);
            if target.is_none() {
                return false;
            }
        }
        self.mode = mode;
        self.target = target;
        self.forced = false;
        self.last_mode = mode;
        self.bump();
        debug!(observer = ?ctx.observer, ?mode, ?target, "changed observer mode");
        true
    }

    pub fn set_target(&mut self, target: Entity, ctx: &ObserverContext) -> bool {
        if !ctx.is_valid_target(target, self.target_mode()) {
            return false;
        }
        if self.target != Some(target) {
            self.target = Some(target);
            self.search_cursor = ctx.roster.get(target).map(|e| e.slot.0);
            self.bump();
            trace!(observer = ?ctx.observer, ?target, "changed observer target");
        }
        true
    }

    /// Find the next valid target, scanning the player slots circularly.
    ///
    /// The scan starts right after the slot of the last target found (or the current target,
    /// or the observer itself), so consecutive calls rotate through the players. The current
    /// target is left unchanged.
    pub fn find_next_target(&mut self, reverse: bool, ctx: &ObserverContext) -> Option<Entity> {
        self.find_next_target_for(self.target_mode(), reverse, ctx)
    }

    /// Select the next (or previous) valid target
    pub fn cycle_target(&mut self, reverse: bool, ctx: &ObserverContext) -> bool {
        match self.find_next_target(reverse, ctx) {
            Some(target) => self.set_target(target, ctx),
            None => false,
        }
    }

    /// Switch to the next mode of the cycle that can be used right now
    pub fn cycle_mode(&mut self, ctx: &ObserverContext) -> bool {
        let mut mode = self.mode.next_in_cycle();
        for _ in 0..3 {
            if self.set_mode(mode, ctx) {
                return true;
            }
            mode = mode.next_in_cycle();
        }
        false
    }

    /// Called every frame: replace an invalid target, or restore the mode chosen by the player
    /// once a forced override is no longer needed
    pub fn check_settings(&mut self, ctx: &ObserverContext) {
        if !self.is_observing() {
            return;
        }
        if self.forced && self.try_restore(ctx) {
            return;
        }
        if !self.mode.requires_target() {
            return;
        }
        if self.target.is_some_and(|t| ctx.is_valid_target(t, self.mode)) {
            return;
        }
        // a dying target can't be watched in first person, but can still be chased
        if self.mode == ObserverMode::FirstPerson
            && self
                .target
                .is_some_and(|t| ctx.is_valid_target(t, ObserverMode::Chase))
        {
            self.force_mode(ObserverMode::Chase);
            return;
        }
        match self.find_next_target(false, ctx) {
            Some(target) => {
                self.target = Some(target);
                self.bump();
                debug!(observer = ?ctx.observer, ?target, "observer target became invalid, switched target");
            }
            None => {
                self.target = None;
                self.force_mode(ctx.policy.fallback_mode());
                debug!(observer = ?ctx.observer, mode = ?self.mode, "no valid observer target, forced mode");
            }
        }
    }

    /// Impose `mode` temporarily, remembering the mode chosen by the player
    pub fn force_mode(&mut self, mode: ObserverMode) {
        if mode == self.mode || mode == ObserverMode::None {
            return;
        }
        if !self.forced {
            self.last_mode = self.mode;
        }
        self.forced = true;
        self.mode = mode;
        self.bump();
    }

    /// Stop spectating
    pub fn stop(&mut self) {
        if !self.is_observing() && self.target.is_none() && !self.forced {
            return;
        }
        self.mode = ObserverMode::None;
        self.target = None;
        self.forced = false;
        self.search_cursor = None;
        self.bump();
    }

    fn try_restore(&mut self, ctx: &ObserverContext) -> bool {
        let wanted = self.last_mode;
        if wanted == ObserverMode::None {
            return false;
        }
        let target = if wanted.requires_target() {
            let current = self.target.filter(|t| ctx.is_valid_target(*t, wanted));
            match current.or_else(|| self.find_next_target_for(wanted, false, ctx)) {
                Some(target) => Some(target),
                None => return false,
            }
        } else {
            self.target
        };
        self.mode = wanted;
        self.target = target;
        self.forced = false;
        self.bump();
        debug!(observer = ?ctx.observer, mode = ?wanted, ?target, "restored observer mode");
        true
    }

    /// Mode used to validate targets: modes without a target accept any chase target
    fn target_mode(&self) -> ObserverMode {
        if self.mode.requires_target() {
            self.mode
        } else {
            ObserverMode::Chase
        }
    }

    fn search_start(&self, reverse: bool, ctx: &ObserverContext) -> usize {
        let slots = ctx.roster.slot_count();
        let base = self
            .search_cursor
            .or_else(|| self.target.and_then(|t| ctx.roster.get(t)).map(|e| e.slot.0))
            .or_else(|| ctx.roster.get(ctx.observer).map(|e| e.slot.0));
        match (base, reverse) {
            (Some(base), false) => (base + 1) % slots,
            (Some(base), true) => (base + slots - 1) % slots,
            (None, false) => 0,
            (None, true) => slots - 1,
        }
    }

    fn find_next_target_for(
        &mut self,
        mode: ObserverMode,
        reverse: bool,
        ctx: &ObserverContext,
    ) -> Option<Entity> {
        let slots = ctx.roster.slot_count();
        if slots == 0 {
            return None;
        }
        let start = self.search_start(reverse, ctx) % slots;
        for i in 0..slots {
            let slot = if reverse {
                (start + slots - i) % slots
            } else {
                (start + i) % slots
            };
            let Some(entry) = ctx.roster.by_slot(slot) else {
                continue;
            };
            if ctx.is_valid_entry(entry, mode) {
                self.search_cursor = Some(slot);
                return Some(entry.entity);
            }
        }
        None
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}
