//! Headless app running the usercmd plugins one frame at a time
use alloc::vec::Vec;
use core::time::Duration;

use bevy_app::App;
use bevy_ecs::message::Messages;
use bevy_ecs::prelude::*;
use bevy_time::TimeUpdateStrategy;
use tracing::info;

use usercmd::prelude::*;

use crate::protocol::RecordingMovement;

pub const TICK_DURATION: Duration = Duration::from_micros(15_625);

/// Runs a server app where every [`frame_step`](Self::frame_step) advances the time by exactly
/// one tick, so that each frame runs one [`FixedUpdate`](bevy_app::FixedUpdate).
pub struct Stepper {
    pub app: App,
    pub movement: RecordingMovement,
    pub players: Vec<Entity>,
    pub frame_duration: Duration,
}

impl Default for Stepper {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

impl Stepper {
    pub fn new(config: SimulationConfig) -> Self {
        Self::with_plugins(|movement| {
            UsercmdPlugins::new(movement)
                .with_tick_duration(TICK_DURATION)
                .with_config(config)
        })
    }

    /// Build the stepper with a custom [`UsercmdPlugins`], created from the recording movement
    pub fn with_plugins(plugins: impl FnOnce(RecordingMovement) -> UsercmdPlugins) -> Self {
        let movement = RecordingMovement::default();
        let mut app = App::new();
        app.add_plugins(plugins(movement.clone()));
        app.insert_resource(TimeUpdateStrategy::ManualDuration(TICK_DURATION));
        let mut stepper = Self {
            app,
            movement,
            players: Vec::new(),
            frame_duration: TICK_DURATION,
        };
        stepper.init();
        stepper
    }

    fn init(&mut self) {
        self.app.finish();
        self.app.cleanup();
        // the first update only starts the clock, it does not run any fixed tick
        self.frame_step();
        info!("stepper ready");
    }

    pub fn world(&self) -> &World {
        self.app.world()
    }

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }

    /// Spawn a player in the next free slot
    pub fn spawn_player(&mut self, team: Team) -> Entity {
        let slot = self.players.len();
        let entity = self
            .app
            .world_mut()
            .spawn((
                PlayerSlot(slot),
                team,
                LifeState::Alive,
                CommandBacklog::default(),
                TransmitBits::with_capacity(64),
                LagCompensationHistory::default(),
                ObserverState::default(),
                ReplayWindow::default(),
            ))
            .id();
        self.players.push(entity);
        entity
    }

    /// Deliver a batch of commands to `entity`, as the network layer would
    pub fn send(&mut self, entity: Entity, commands: Vec<InputCommand>, dropped: u32, paused: bool) {
        self.app
            .world_mut()
            .resource_mut::<Messages<CommandBatch>>()
            .write(CommandBatch {
                entity,
                commands,
                dropped_packets: dropped,
                paused,
            });
    }

    pub fn request(&mut self, entity: Entity, action: ObserverAction) {
        self.app
            .world_mut()
            .resource_mut::<Messages<ObserverRequest>>()
            .write(ObserverRequest { entity, action });
    }

    /// Make `target` visible (or not) to `observer`
    pub fn set_visible(&mut self, observer: Entity, target: Entity, visible: bool) {
        let Some(slot) = self.app.world().get::<PlayerSlot>(target).copied() else {
            return;
        };
        if let Some(mut bits) = self.app.world_mut().get_mut::<TransmitBits>(observer) {
            bits.set_visible(slot, visible);
        }
    }

    pub fn server_tick(&self) -> Tick {
        self.app.world().resource::<ServerTick>().0
    }

    pub fn anomalies(&self, kind: &str) -> u64 {
        self.app.world().resource::<AnomalyCounts>().get(kind)
    }

    pub fn get<C: Component>(&self, entity: Entity) -> Option<&C> {
        self.app.world().get::<C>(entity)
    }

    pub fn frame_step(&mut self) {
        self.app.update();
    }

    pub fn frame_step_n(&mut self, n: usize) {
        for _ in 0..n {
            self.frame_step();
        }
    }
}
