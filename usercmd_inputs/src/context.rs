//! A batch of commands received from one network packet
use alloc::vec::Vec;

use crate::command::InputCommand;

/// Maximum number of commands carried by a single [`CommandContext`]
pub const MAX_COMMANDS_PER_CONTEXT: usize = 30;

/// Identifies a context inside the [`CommandBacklog`](crate::backlog::CommandBacklog)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextHandle(pub u64);

/// Commands received in one packet, plus what the network layer knows about the packets
/// that were lost before it.
///
/// `totalcmds` is always `numcmds + dropped_packets`: each dropped packet is accounted as one
/// tick that still needs to be simulated.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandContext {
    pub(crate) handle: ContextHandle,
    commands: Vec<InputCommand>,
    dropped_packets: u32,
    paused: bool,
}

impl CommandContext {
    /// Build a context. Commands beyond [`MAX_COMMANDS_PER_CONTEXT`] are discarded.
    pub fn new(mut commands: Vec<InputCommand>, dropped_packets: u32, paused: bool) -> Self {
        commands.truncate(MAX_COMMANDS_PER_CONTEXT);
        Self {
            handle: ContextHandle(0),
            commands,
            dropped_packets,
            paused,
        }
    }

    pub fn handle(&self) -> ContextHandle {
        self.handle
    }

    /// Commands in arrival order
    pub fn commands(&self) -> &[InputCommand] {
        &self.commands
    }

    pub fn numcmds(&self) -> u32 {
        self.commands.len() as u32
    }

    pub fn dropped_packets(&self) -> u32 {
        self.dropped_packets
    }

    pub fn totalcmds(&self) -> u32 {
        self.numcmds().saturating_add(self.dropped_packets)
    }

    /// Paused contexts advance neither the clock nor the movement state
    pub fn paused(&self) -> bool {
        self.paused
    }

    /// Sequence of the latest command in the context
    pub fn last_sequence(&self) -> Option<u32> {
        self.commands.iter().map(|c| c.sequence).max()
    }
}
