//! Collaborators invoked by the [`SimulationDriver`](crate::driver::SimulationDriver)
use alloc::sync::Arc;

use alloc::vec::Vec;

use bevy_ecs::entity::Entity;
use bevy_ecs::resource::Resource;

use usercmd_core::roster::MoveState;

use crate::command::InputCommand;
use crate::driver::{CurrentCommand, SimulationDriver};

/// Game-specific movement: computes the result of running one command for one tick.
///
/// Must be deterministic: client prediction runs the same step with the same inputs.
pub trait PlayerMovement: Send + Sync + 'static {
    fn step(&self, pre: &MoveState, command: &InputCommand) -> MoveState;
}

/// Reconciles a staged movement result with the physics engine on commit
pub trait PhysicsReconcile: Send + Sync + 'static {
    fn reconcile(&self, committed: &MoveState, staged: &MoveState) -> MoveState;
}

/// Commits the staged result as is
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptStaged;

impl PhysicsReconcile for AcceptStaged {
    fn reconcile(&self, _: &MoveState, staged: &MoveState) -> MoveState {
        *staged
    }
}

/// Notified of every command run by the driver, while it is the driver's current command
pub trait CommandListener {
    fn on_command(&mut self, driver: &SimulationDriver, pre: &MoveState);
}

/// Listener that ignores every command
#[derive(Debug, Default, Clone, Copy)]
pub struct NoListener;

impl CommandListener for NoListener {
    fn on_command(&mut self, _: &SimulationDriver, _: &MoveState) {}
}

impl<F: FnMut(&SimulationDriver, &MoveState)> CommandListener for F {
    fn on_command(&mut self, driver: &SimulationDriver, pre: &MoveState) {
        self(driver, pre)
    }
}

/// A subsystem consulted on every step run by the app (autoaim, weapons, view computation).
///
/// `command` is the current command of `entity` for the duration of the call.
pub trait StepListener: Send + Sync + 'static {
    fn on_step(&self, entity: Entity, command: &CurrentCommand, pre: &MoveState);
}

impl<F: Fn(Entity, &CurrentCommand, &MoveState) + Send + Sync + 'static> StepListener for F {
    fn on_step(&self, entity: Entity, command: &CurrentCommand, pre: &MoveState) {
        self(entity, command, pre)
    }
}

/// Forwards the current command of one player to the registered [`StepListener`]s
pub(crate) struct EntityListeners<'a> {
    pub entity: Entity,
    pub listeners: &'a [Arc<dyn StepListener>],
}

impl CommandListener for EntityListeners<'_> {
    fn on_command(&mut self, driver: &SimulationDriver, pre: &MoveState) {
        let Some(current) = driver.current_command() else {
            return;
        };
        for listener in self.listeners {
            listener.on_step(self.entity, current, pre);
        }
    }
}

/// The collaborators used by the systems of the [`InputPlugin`](crate::plugin::InputPlugin)
#[derive(Resource, Clone)]
pub struct MovementCollaborators {
    pub movement: Arc<dyn PlayerMovement>,
    pub physics: Arc<dyn PhysicsReconcile>,
    pub listeners: Vec<Arc<dyn StepListener>>,
}

impl MovementCollaborators {
    pub fn new(movement: impl PlayerMovement) -> Self {
        Self {
            movement: Arc::new(movement),
            physics: Arc::new(AcceptStaged),
            listeners: Vec::new(),
        }
    }

    pub fn with_physics(mut self, physics: impl PhysicsReconcile) -> Self {
        self.physics = Arc::new(physics);
        self
    }

    pub fn with_listener(mut self, listener: impl StepListener) -> Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    /// Listener forwarding the steps of `entity` to every registered [`StepListener`]
    pub(crate) fn listeners_for(&self, entity: Entity) -> EntityListeners<'_> {
        EntityListeners {
            entity,
            listeners: &self.listeners,
        }
    }
}
