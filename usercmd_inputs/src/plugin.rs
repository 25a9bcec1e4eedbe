//! Systems that connect the command pipeline to the ECS
use alloc::vec::Vec;

use bevy_app::{App, FixedUpdate, Plugin};
use bevy_ecs::prelude::*;
#[allow(unused_imports)]
use tracing::{debug, trace, warn};

use usercmd_core::config::SimulationConfig;
use usercmd_core::diagnostics::{AnomalyEvent, forward_anomalies};
use usercmd_core::plugin::{ServerTick, SimulationSet};
use usercmd_core::roster::MoveState;
use usercmd_core::tick::TickDuration;

use crate::backlog::CommandBacklog;
use crate::clock::TickClock;
use crate::command::InputCommand;
use crate::driver::SimulationDriver;
use crate::movement::{MovementCollaborators, PhysicsReconcile, PlayerMovement, StepListener};

/// Commands received by the network layer for the player `entity`
#[derive(Message, Debug, Clone, PartialEq)]
pub struct CommandBatch {
    pub entity: Entity,
    pub commands: Vec<InputCommand>,
    /// Number of packets lost since the previous batch
    pub dropped_packets: u32,
    /// True if the client was paused when it sent the batch
    pub paused: bool,
}

/// Players excluded from the command pipeline. Their backlog still fills up, but is not run:
/// they only get a null command every tick so that their physics keeps settling.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct Frozen;

pub struct InputPlugin {
    pub collaborators: MovementCollaborators,
}

impl InputPlugin {
    pub fn new(movement: impl PlayerMovement) -> Self {
        Self {
            collaborators: MovementCollaborators::new(movement),
        }
    }

    pub fn with_physics(mut self, physics: impl PhysicsReconcile) -> Self {
        self.collaborators = self.collaborators.with_physics(physics);
        self
    }

    pub fn with_listener(mut self, listener: impl StepListener) -> Self {
        self.collaborators = self.collaborators.with_listener(listener);
        self
    }
}

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<TickClock>();
        app.insert_resource(self.collaborators.clone());
        app.add_message::<CommandBatch>();
        app.add_observer(start_clock);

        app.add_systems(
            FixedUpdate,
            receive_command_batches.in_set(SimulationSet::Receive),
        );
        app.add_systems(
            FixedUpdate,
            (run_pending_commands, run_frozen_players).in_set(SimulationSet::Run),
        );
        app.add_systems(
            FixedUpdate,
            commit_staged_moves.in_set(SimulationSet::Commit),
        );
    }
}

/// New players start their clock at the current server tick
fn start_clock(
    trigger: On<Add, CommandBacklog>,
    server_tick: Option<Res<ServerTick>>,
    config: Option<Res<SimulationConfig>>,
    mut query: Query<&mut TickClock>,
) {
    if let Ok(mut clock) = query.get_mut(trigger.entity) {
        let tick = server_tick.map(|t| t.0).unwrap_or_default();
        clock.reset(tick);
        if let Some(config) = config {
            clock.set_max_ticks_per_advance(config.max_ticks_per_advance);
        }
        debug!(entity = ?trigger.entity, ?tick, "started player clock");
    }
}

/// Enqueue the received batches in the backlog of their player
pub(crate) fn receive_command_batches(
    mut batches: MessageReader<CommandBatch>,
    mut query: Query<&mut CommandBacklog>,
    mut anomalies: MessageWriter<AnomalyEvent>,
) {
    for batch in batches.read() {
        let Ok(mut backlog) = query.get_mut(batch.entity) else {
            debug!(entity = ?batch.entity, "received commands for an unknown player");
            continue;
        };
        let mut reported = Vec::new();
        backlog.enqueue(
            batch.commands.clone(),
            batch.dropped_packets,
            batch.paused,
            &mut reported,
        );
        forward_anomalies(batch.entity, reported, &mut anomalies);
    }
}

/// Reconcile the clock of every player with the server, then run its pending commands
pub(crate) fn run_pending_commands(
    server_tick: Res<ServerTick>,
    tick_duration: Res<TickDuration>,
    config: Res<SimulationConfig>,
    collaborators: Res<MovementCollaborators>,
    mut query: Query<
        (
            Entity,
            &MoveState,
            &mut CommandBacklog,
            &mut TickClock,
            &mut SimulationDriver,
        ),
        Without<Frozen>,
    >,
    mut anomalies: MessageWriter<AnomalyEvent>,
) {
    let correction_ticks = config.correction_ticks(*tick_duration);
    for (entity, state, mut backlog, mut clock, mut driver) in query.iter_mut() {
        let mut reported = Vec::new();
        #[cfg(feature = "metrics")]
        {
            metrics::gauge!(format!("usercmd::inputs::{}::backlog_size", entity))
                .set(backlog.len() as f64);
        }
        let simulation_ticks = backlog
            .simulation_ticks()
            .min(config.max_ticks_per_advance.saturating_mul(backlog.len() as u32));
        clock.reconcile(server_tick.0, simulation_ticks, correction_ticks, &mut reported);
        let report = driver.run_pending(
            state,
            &mut backlog,
            &mut clock,
            collaborators.movement.as_ref(),
            &config,
            &mut collaborators.listeners_for(entity),
            &mut reported,
        );
        if report.steps > 0 {
            trace!(?entity, ?report, "simulated player");
            #[cfg(feature = "metrics")]
            {
                metrics::counter!("usercmd::inputs::held_steps").increment(report.held_steps as u64);
            }
        }
        forward_anomalies(entity, reported, &mut anomalies);
    }
}

/// Run a null command for every frozen player
pub(crate) fn run_frozen_players(
    collaborators: Res<MovementCollaborators>,
    mut query: Query<(Entity, &MoveState, &TickClock, &mut SimulationDriver), With<Frozen>>,
) {
    for (entity, state, clock, mut driver) in query.iter_mut() {
        driver.run_null_command(
            state,
            clock,
            collaborators.movement.as_ref(),
            &mut collaborators.listeners_for(entity),
        );
    }
}

/// Publish the staged movement results of every player
pub fn commit_staged_moves(
    collaborators: Res<MovementCollaborators>,
    mut query: Query<(&mut MoveState, &mut SimulationDriver)>,
) {
    for (mut state, mut driver) in query.iter_mut() {
        if driver.staged().is_some() {
            driver.commit(&mut state, collaborators.physics.as_ref());
        }
    }
}
