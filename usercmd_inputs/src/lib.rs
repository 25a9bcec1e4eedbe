//! # Usercmd Inputs
//!
//! Server side of the input command pipeline.
//!
//! Clients send batches of [`InputCommand`](command::InputCommand)s. Each batch is stored as a
//! [`CommandContext`](context::CommandContext) in the per-player
//! [`CommandBacklog`](backlog::CommandBacklog). Every fixed tick, the
//! [`SimulationDriver`](driver::SimulationDriver) drains the backlog: each context advances the
//! player's [`TickClock`](clock::TickClock) and runs one movement step per tick. The movement
//! results are staged and only committed once every player has simulated.

extern crate alloc;

pub mod backlog;
pub mod bot;
pub mod clock;
pub mod command;
pub mod context;
pub mod driver;
pub mod movement;
pub mod plugin;

pub mod prelude {
    pub use crate::backlog::{BACKLOG_CAPACITY, CommandBacklog};
    pub use crate::bot::{BotController, PlayerHandle, PlayerInfo};
    pub use crate::clock::{ClockCorrection, TickClock, TickSpan};
    pub use crate::command::{ButtonState, Buttons, InputCommand};
    pub use crate::context::{CommandContext, ContextHandle, MAX_COMMANDS_PER_CONTEXT};
    pub use crate::driver::{CurrentCommand, RunReport, SimulationDriver};
    pub use crate::movement::{
        AcceptStaged, CommandListener, MovementCollaborators, NoListener, PhysicsReconcile,
        PlayerMovement, StepListener,
    };
    pub use crate::plugin::{CommandBatch, Frozen, InputPlugin};
}
