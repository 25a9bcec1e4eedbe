//! The per-player [`TickClock`]
use bevy_ecs::component::Component;
use bevy_reflect::Reflect;
#[allow(unused_imports)]
use tracing::{debug, trace};

use usercmd_core::config::SimulationConfig;
use usercmd_core::diagnostics::{Anomaly, AnomalySink};
use usercmd_core::tick::Tick;

use crate::context::CommandContext;

/// Range of ticks granted to a context by [`TickClock::advance`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSpan {
    pub start: Tick,
    pub ticks: u32,
}

impl TickSpan {
    pub fn end(&self) -> Tick {
        self.start + self.ticks
    }

    pub fn iter(&self) -> impl Iterator<Item = Tick> + use<> {
        let start = self.start;
        (0..self.ticks).map(move |i| start + i)
    }
}

/// Outcome of [`TickClock::reconcile`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockCorrection {
    /// The clock is within the tolerated drift
    InSync,
    /// The clock was too slow and was moved forward
    Forward { from: Tick, to: Tick },
    /// The clock is too fast; it is left untouched since it never moves backward
    Held,
    /// Nothing to simulate this frame, the clock is left untouched
    Idle,
}

/// Simulated time of a player, in ticks.
///
/// The clock is advanced by the commands of the player, not by the server: a player whose
/// packets are delayed falls behind and catches up when they arrive.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
pub struct TickClock {
    tick_base: Tick,
    max_ticks_per_advance: u32,
    /// Sequence of the latest command received, paused or not
    acknowledged: Option<u32>,
    /// Set while the clock runs ahead of the server, so that it is only reported once
    ahead: bool,
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new(Tick(0), SimulationConfig::default().max_ticks_per_advance)
    }
}

impl TickClock {
    pub fn new(tick_base: Tick, max_ticks_per_advance: u32) -> Self {
        Self {
            tick_base,
            max_ticks_per_advance: max_ticks_per_advance.max(1),
            acknowledged: None,
            ahead: false,
        }
    }

    pub fn tick_base(&self) -> Tick {
        self.tick_base
    }

    pub fn max_ticks_per_advance(&self) -> u32 {
        self.max_ticks_per_advance
    }

    pub fn set_max_ticks_per_advance(&mut self, max_ticks: u32) {
        self.max_ticks_per_advance = max_ticks.max(1);
    }

    pub fn acknowledged_sequence(&self) -> Option<u32> {
        self.acknowledged
    }

    /// Advance the clock by the ticks covered by `context`.
    ///
    /// A context advances the clock by `totalcmds`, clamped to the maximum advance per context.
    /// Paused contexts do not advance the clock, but their commands are still acknowledged.
    pub fn advance(&mut self, context: &CommandContext, sink: &mut impl AnomalySink) -> TickSpan {
        if let Some(sequence) = context.last_sequence() {
            self.acknowledged = Some(self.acknowledged.map_or(sequence, |a| a.max(sequence)));
        }
        let start = self.tick_base;
        if context.paused() {
            return TickSpan { start, ticks: 0 };
        }
        let requested = context.totalcmds();
        let granted = requested.min(self.max_ticks_per_advance);
        if granted < requested {
            sink.report(Anomaly::ClockClamped { requested, granted });
        }
        self.tick_base += granted;
        trace!(?start, granted, "advanced tick clock");
        TickSpan {
            start,
            ticks: granted,
        }
    }

    /// Keep the clock within `correction_ticks` of the server clock.
    ///
    /// `simulation_ticks` is the number of ticks the player is about to simulate this frame.
    /// The clock is only corrected on frames that simulate something: a player whose packets
    /// are delayed keeps its tick base until they arrive. It is only ever moved forward: a clock
    /// that runs ahead is held, and reported once until it is back in range.
    pub fn reconcile(
        &mut self,
        server_tick: Tick,
        simulation_ticks: u32,
        correction_ticks: u32,
        sink: &mut impl AnomalySink,
    ) -> ClockCorrection {
        if simulation_ticks == 0 {
            return ClockCorrection::Idle;
        }
        let ideal_final = server_tick + correction_ticks;
        let estimated_final = self.tick_base + simulation_ticks;
        let too_fast = ideal_final + correction_ticks;
        let too_slow = ideal_final - correction_ticks;

        if estimated_final < too_slow {
            let from = self.tick_base;
            let to = ideal_final - simulation_ticks;
            self.tick_base = to;
            self.ahead = false;
            debug!(?from, ?to, "clock too slow, moved forward");
            return ClockCorrection::Forward { from, to };
        }
        if estimated_final > too_fast {
            if !self.ahead {
                let requested = ideal_final - simulation_ticks;
                sink.report(Anomaly::ClockBackward {
                    current: self.tick_base,
                    requested,
                });
                self.ahead = true;
            }
            return ClockCorrection::Held;
        }
        self.ahead = false;
        ClockCorrection::InSync
    }

    /// Restart the clock at `tick` (on spawn or reconnect)
    pub fn reset(&mut self, tick: Tick) {
        self.tick_base = tick;
        self.acknowledged = None;
        self.ahead = false;
    }
}
