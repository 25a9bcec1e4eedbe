//! The [`CommandBacklog`]: bounded FIFO of the command contexts waiting to be simulated
use alloc::collections::VecDeque;
use alloc::vec::Vec;

use bevy_ecs::component::Component;
#[allow(unused_imports)]
use tracing::{debug, trace};

use usercmd_core::diagnostics::{Anomaly, AnomalySink};

use crate::clock::TickClock;
use crate::command::InputCommand;
use crate::context::{CommandContext, ContextHandle, MAX_COMMANDS_PER_CONTEXT};
use crate::driver::SimulationDriver;
use usercmd_core::roster::MoveState;

/// Maximum number of contexts held by a [`CommandBacklog`]
pub const BACKLOG_CAPACITY: usize = 30;

/// Per-player queue of received command contexts.
///
/// The backlog is bounded: when a new context arrives while it is full, the *oldest* context
/// is evicted. Freshness wins over completeness, and the commands of the evicted context are
/// counted as lost.
#[derive(Component, Debug, Default)]
#[require(TickClock, SimulationDriver, MoveState)]
pub struct CommandBacklog {
    contexts: VecDeque<CommandContext>,
    next_handle: u64,
    /// Number of contexts evicted since the last reset
    lost_contexts: u64,
    /// Sum of the `totalcmds` of the evicted contexts
    lost_commands: u64,
}

impl CommandBacklog {
    /// Append a new context at the back of the backlog.
    ///
    /// Batches larger than [`MAX_COMMANDS_PER_CONTEXT`] are truncated, and the oldest context
    /// is evicted if the backlog is full.
    pub fn enqueue(
        &mut self,
        commands: Vec<InputCommand>,
        dropped_packets: u32,
        paused: bool,
        sink: &mut impl AnomalySink,
    ) -> ContextHandle {
        if commands.len() > MAX_COMMANDS_PER_CONTEXT {
            sink.report(Anomaly::BatchTruncated {
                received: commands.len(),
                kept: MAX_COMMANDS_PER_CONTEXT,
            });
        }
        let mut context = CommandContext::new(commands, dropped_packets, paused);
        let handle = ContextHandle(self.next_handle);
        self.next_handle += 1;
        context.handle = handle;

        if self.contexts.len() >= BACKLOG_CAPACITY {
            if let Some(evicted) = self.contexts.pop_front() {
                self.lost_contexts += 1;
                self.lost_commands += evicted.totalcmds() as u64;
                sink.report(Anomaly::BacklogOverflow {
                    evicted_totalcmds: evicted.totalcmds(),
                });
            }
        }
        trace!(
            ?handle,
            numcmds = context.numcmds(),
            dropped_packets,
            paused,
            "enqueued command context"
        );
        self.contexts.push_back(context);
        handle
    }

    /// Remove and return the oldest context
    pub fn pop_front(&mut self) -> Option<CommandContext> {
        self.contexts.pop_front()
    }

    /// Remove every context, yielding them in arrival order
    pub fn consume(&mut self) -> impl Iterator<Item = CommandContext> + '_ {
        self.contexts.drain(..)
    }

    pub fn get(&self, handle: ContextHandle) -> Option<&CommandContext> {
        self.contexts.iter().find(|c| c.handle == handle)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandContext> {
        self.contexts.iter()
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Number of ticks that the queued contexts will simulate (paused contexts excluded)
    pub fn simulation_ticks(&self) -> u32 {
        self.contexts
            .iter()
            .filter(|c| !c.paused())
            .map(CommandContext::totalcmds)
            .fold(0, u32::saturating_add)
    }

    pub fn lost_contexts(&self) -> u64 {
        self.lost_contexts
    }

    pub fn lost_commands(&self) -> u64 {
        self.lost_commands
    }

    /// Drop every pending context and the loss counters (on spawn or reconnect)
    pub fn reset(&mut self) {
        debug!(pending = self.contexts.len(), "resetting command backlog");
        self.contexts.clear();
        self.lost_contexts = 0;
        self.lost_commands = 0;
    }
}
