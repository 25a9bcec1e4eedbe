//! The [`SimulationDriver`]: replays the pending commands of a player through the movement step
use bevy_ecs::component::Component;
#[allow(unused_imports)]
use tracing::{debug, trace};

use usercmd_core::config::SimulationConfig;
use usercmd_core::diagnostics::AnomalySink;
use usercmd_core::roster::MoveState;
use usercmd_core::tick::Tick;

use crate::backlog::CommandBacklog;
use crate::clock::TickClock;
use crate::command::{ButtonState, InputCommand};
use crate::movement::{CommandListener, PhysicsReconcile, PlayerMovement};

/// The command being simulated right now
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentCommand {
    pub command: InputCommand,
    /// Tick of the player's clock at which the command runs
    pub tick: Tick,
    /// True if the command is a held copy standing in for a command lost in transit
    pub held: bool,
}

/// Summary of a [`SimulationDriver::run_pending`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub contexts: u32,
    pub paused_contexts: u32,
    /// Ticks granted by the clock
    pub ticks: u32,
    /// Movement steps run, held commands included
    pub steps: u32,
    pub held_steps: u32,
}

/// Drives the movement step of one player.
///
/// Movement results are *staged*: [`SimulationDriver::run_pending`] never writes the committed
/// [`MoveState`], so other players keep reading the state from the start of the frame.
/// [`SimulationDriver::commit`] publishes the staged result once every player has simulated.
#[derive(Component, Debug, Default)]
pub struct SimulationDriver {
    current: Option<CurrentCommand>,
    last_command: Option<InputCommand>,
    buttons: ButtonState,
    staged: Option<MoveState>,
    steps: u64,
}

impl SimulationDriver {
    /// The command being simulated. Only set during a movement step.
    pub fn current_command(&self) -> Option<&CurrentCommand> {
        self.current.as_ref()
    }

    /// The latest command received from the client and simulated
    pub fn last_command(&self) -> Option<&InputCommand> {
        self.last_command.as_ref()
    }

    /// Override the latest command (used by bots, which have no network)
    pub fn set_last_command(&mut self, command: InputCommand) {
        self.last_command = Some(command);
    }

    pub fn buttons(&self) -> &ButtonState {
        &self.buttons
    }

    /// Result of the steps run since the last commit
    pub fn staged(&self) -> Option<&MoveState> {
        self.staged.as_ref()
    }

    /// Total number of movement steps run by this driver
    pub fn total_steps(&self) -> u64 {
        self.steps
    }

    /// Drain the backlog and run one movement step per granted tick.
    ///
    /// For each context, in arrival order, the clock grants a number of ticks. Ticks for packets
    /// lost in transit run first by holding the last known command, then the received commands
    /// run in order. If the clock clamped the advance, the most recent received commands are kept.
    pub fn run_pending(
        &mut self,
        committed: &MoveState,
        backlog: &mut CommandBacklog,
        clock: &mut TickClock,
        movement: &dyn PlayerMovement,
        config: &SimulationConfig,
        listener: &mut impl CommandListener,
        sink: &mut impl AnomalySink,
    ) -> RunReport {
        let mut report = RunReport::default();
        let mut state = self.staged.unwrap_or(*committed);
        clock.set_max_ticks_per_advance(config.max_ticks_per_advance);

        for context in backlog.consume() {
            report.contexts += 1;
            let span = clock.advance(&context, sink);
            if context.paused() {
                report.paused_contexts += 1;
                continue;
            }
            report.ticks += span.ticks;

            let received = context.numcmds().min(span.ticks);
            let held = if config.replay_dropped_commands {
                span.ticks - received
            } else {
                0
            };
            let mut ticks = span.iter();

            for _ in 0..held {
                let Some(tick) = ticks.next() else { break };
                let command = self
                    .last_command
                    .map(|c| c.held())
                    .unwrap_or_default();
                state = self.execute(state, command, tick, true, movement, listener);
                report.held_steps += 1;
                report.steps += 1;
            }
            let skipped = (context.numcmds() - received) as usize;
            for command in context.commands().iter().skip(skipped) {
                let Some(tick) = ticks.next() else { break };
                let command = command.sanitize(&config.command_limits, sink);
                state = self.execute(state, command, tick, false, movement, listener);
                self.last_command = Some(command);
                report.steps += 1;
            }
        }

        if report.steps > 0 {
            self.staged = Some(state);
        }
        if report.contexts > 0 {
            trace!(?report, tick_base = ?clock.tick_base(), "ran pending commands");
        }
        report
    }

    /// Run a single empty command, for players that must be simulated without any input
    /// (the [`Frozen`](crate::plugin::Frozen) players). The clock is not advanced.
    pub fn run_null_command(
        &mut self,
        committed: &MoveState,
        clock: &TickClock,
        movement: &dyn PlayerMovement,
        listener: &mut impl CommandListener,
    ) -> MoveState {
        let pre = self.staged.unwrap_or(*committed);
        let command = InputCommand {
            sequence: self.last_command.map_or(0, |c| c.sequence),
            ..Default::default()
        };
        let post = self.execute(pre, command, clock.tick_base(), true, movement, listener);
        self.staged = Some(post);
        post
    }

    /// Publish the staged movement result, if any
    pub fn commit(&mut self, committed: &mut MoveState, physics: &dyn PhysicsReconcile) -> bool {
        let Some(staged) = self.staged.take() else {
            return false;
        };
        *committed = physics.reconcile(committed, &staged);
        true
    }

    /// Forget the command history (on spawn or reconnect)
    pub fn reset(&mut self) {
        self.current = None;
        self.last_command = None;
        self.buttons.reset();
        self.staged = None;
    }

    fn execute(
        &mut self,
        pre: MoveState,
        command: InputCommand,
        tick: Tick,
        held: bool,
        movement: &dyn PlayerMovement,
        listener: &mut impl CommandListener,
    ) -> MoveState {
        self.buttons.update(command.buttons);
        self.current = Some(CurrentCommand {
            command,
            tick,
            held,
        });
        listener.on_command(self, &pre);
        let post = movement.step(&pre, &command);
        self.current = None;
        self.steps += 1;
        post
    }
}
