//! Bounded history of the committed positions of a player
use alloc::collections::VecDeque;

use bevy_ecs::prelude::*;
use bevy_math::Vec3;
use bevy_reflect::Reflect;

use usercmd_core::plugin::ServerTick;
use usercmd_core::roster::MoveState;
use usercmd_core::tick::Tick;

/// Positions of a player at the end of the last ticks, oldest at the front.
///
/// Callers that got a positive answer from the gate use it to rewind the candidate to
/// the tick at which the shooter's command was generated.
#[derive(Component, Debug, Clone, PartialEq, Reflect)]
#[reflect(Component)]
pub struct LagCompensationHistory {
    buffer: VecDeque<(Tick, Vec3)>,
    max_ticks: u32,
}

impl Default for LagCompensationHistory {
    fn default() -> Self {
        Self::new(64)
    }
}

impl LagCompensationHistory {
    pub fn new(max_ticks: u32) -> Self {
        Self {
            buffer: VecDeque::new(),
            max_ticks: max_ticks.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Record the position at `tick`. Ticks must be recorded in increasing order; recording
    /// the same tick twice replaces the previous value.
    pub fn record(&mut self, tick: Tick, position: Vec3) {
        if let Some((last_tick, _)) = self.buffer.back() {
            if *last_tick == tick {
                self.buffer.pop_back();
            } else if *last_tick > tick {
                return;
            }
        }
        self.buffer.push_back((tick, position));
        while self
            .buffer
            .front()
            .is_some_and(|(oldest, _)| tick - *oldest >= self.max_ticks as i32)
        {
            self.buffer.pop_front();
        }
    }

    /// Position at `tick`: the latest recorded position at or before `tick`.
    ///
    /// Ticks older than the history return `None`, ticks more recent than the history return
    /// the most recent position.
    pub fn position_at(&self, tick: Tick) -> Option<Vec3> {
        let partition = self.buffer.partition_point(|(t, _)| *t <= tick);
        if partition == 0 {
            return None;
        }
        self.buffer.get(partition - 1).map(|(_, p)| *p)
    }

    pub fn oldest(&self) -> Option<Tick> {
        self.buffer.front().map(|(t, _)| *t)
    }

    pub fn most_recent(&self) -> Option<Tick> {
        self.buffer.back().map(|(t, _)| *t)
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Record the committed position of every lag compensated player
pub(crate) fn record_history(
    server_tick: Res<ServerTick>,
    mut query: Query<(&MoveState, &mut LagCompensationHistory)>,
) {
    for (state, mut history) in query.iter_mut() {
        history.record(server_tick.0, state.position);
    }
}
