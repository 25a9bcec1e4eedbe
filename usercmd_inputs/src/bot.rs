//! Facade used by AI code to drive a server-side bot and to read its public player info.
//!
//! Bots have no network connection: their commands are enqueued directly in the backlog, and
//! then go through the same pipeline (clock, movement step, commit) as the commands of a client.
use alloc::vec;

use bevy_math::Vec3;

use usercmd_core::diagnostics::AnomalySink;
use usercmd_core::roster::{LifeState, MoveState, Team};
use usercmd_core::tick::Tick;

use crate::backlog::CommandBacklog;
use crate::clock::TickClock;
use crate::command::InputCommand;
use crate::context::ContextHandle;
use crate::driver::SimulationDriver;

/// Read-only information about a player
pub trait PlayerInfo {
    fn team(&self) -> Team;
    fn is_alive(&self) -> bool;
    fn is_observer(&self) -> bool;
    fn origin(&self) -> Vec3;
    fn view_angles(&self) -> Vec3;
    fn tick_base(&self) -> Tick;
}

/// Control surface of a bot
pub trait BotController {
    /// Queue a command to be simulated during the next run of the pipeline
    fn run_player_move(&mut self, command: InputCommand, sink: &mut impl AnomalySink) -> ContextHandle;
    fn set_last_user_command(&mut self, command: InputCommand);
    fn last_user_command(&self) -> Option<InputCommand>;
}

/// Borrowed view over the components of one player
pub struct PlayerHandle<'a> {
    pub team: Team,
    pub life: LifeState,
    pub observing: bool,
    pub state: &'a MoveState,
    pub clock: &'a TickClock,
    pub backlog: &'a mut CommandBacklog,
    pub driver: &'a mut SimulationDriver,
}

impl PlayerInfo for PlayerHandle<'_> {
    fn team(&self) -> Team {
        self.team
    }

    fn is_alive(&self) -> bool {
        self.life.is_alive()
    }

    fn is_observer(&self) -> bool {
        self.observing
    }

    fn origin(&self) -> Vec3 {
        self.state.position
    }

    fn view_angles(&self) -> Vec3 {
        self.state.view_angles
    }

    fn tick_base(&self) -> Tick {
        self.clock.tick_base()
    }
}

impl BotController for PlayerHandle<'_> {
    fn run_player_move(&mut self, command: InputCommand, sink: &mut impl AnomalySink) -> ContextHandle {
        self.backlog.enqueue(vec![command], 0, false, sink)
    }

    fn set_last_user_command(&mut self, command: InputCommand) {
        self.driver.set_last_command(command);
    }

    fn last_user_command(&self) -> Option<InputCommand> {
        self.driver.last_command().copied()
    }
}
