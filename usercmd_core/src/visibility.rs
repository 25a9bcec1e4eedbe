//! Transmit visibility bit-vectors supplied by the network layer.
use bevy_ecs::prelude::*;
use fixedbitset::FixedBitSet;

use crate::roster::PlayerSlot;

/// Which player slots are transmit-visible to the player holding this component.
///
/// `current` is the set written by the network layer for the coming tick, `recent` is the
/// set of the previous tick. The bits are rolled at the end of every tick (see
/// [`SimulationSet::Commit`](crate::plugin::SimulationSet::Commit)), so the network layer
/// writes `current` between two ticks.
#[derive(Component, Debug, Clone, Default, PartialEq, Eq)]
pub struct TransmitBits {
    current: FixedBitSet,
    recent: FixedBitSet,
}

impl TransmitBits {
    pub fn with_capacity(slots: usize) -> Self {
        Self {
            current: FixedBitSet::with_capacity(slots),
            recent: FixedBitSet::with_capacity(slots),
        }
    }

    /// Build the bits from the list of visible slots
    pub fn from_visible(slots: impl IntoIterator<Item = usize>) -> Self {
        let mut bits = Self::default();
        for slot in slots {
            bits.set_visible(PlayerSlot(slot), true);
        }
        bits
    }

    pub fn set_visible(&mut self, slot: PlayerSlot, visible: bool) {
        if slot.0 >= self.current.len() {
            if !visible {
                return;
            }
            self.current.grow(slot.0 + 1);
        }
        self.current.set(slot.0, visible);
    }

    pub fn is_visible(&self, slot: PlayerSlot) -> bool {
        self.current.contains(slot.0)
    }

    pub fn was_recently_visible(&self, slot: PlayerSlot) -> bool {
        self.recent.contains(slot.0)
    }

    pub fn is_visible_or_recent(&self, slot: PlayerSlot) -> bool {
        self.is_visible(slot) || self.was_recently_visible(slot)
    }

    /// Start a new frame: the current set becomes the recent set, and the current set is cleared
    pub fn roll(&mut self) {
        core::mem::swap(&mut self.current, &mut self.recent);
        self.current.clear();
    }

    pub fn visible_slots(&self) -> impl Iterator<Item = PlayerSlot> + '_ {
        self.current.ones().map(PlayerSlot)
    }
}

/// End of the tick: the bits written for this tick become the recently visible set
pub(crate) fn roll_transmit_bits(mut query: Query<&mut TransmitBits>) {
    for mut bits in query.iter_mut() {
        bits.roll();
    }
}
