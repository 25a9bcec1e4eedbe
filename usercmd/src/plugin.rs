//! Defines the [`UsercmdPlugins`] PluginGroup
use core::time::Duration;

use bevy_app::{PluginGroup, PluginGroupBuilder};

use usercmd_core::config::SimulationConfig;
use usercmd_core::plugin::CorePlugin;
use usercmd_core::tick::TickDuration;
use usercmd_inputs::movement::{MovementCollaborators, PlayerMovement, StepListener};
use usercmd_inputs::plugin::InputPlugin;

/// A plugin group containing every usercmd plugin.
///
/// By default, the following plugins will be added:
/// - [`CorePlugin`]: tick, configuration, roster snapshot and anomaly logging
/// - [`InputPlugin`]: receives the command batches and runs them through the movement collaborator
/// - `LagCompensationPlugin` (feature `lag_compensation`): records the position histories
/// - `ObserverPlugin` (feature `observer`): spectator state machine and replays
///
/// Any of them can be disabled or replaced through the [`PluginGroupBuilder`].
pub struct UsercmdPlugins {
    /// The fixed duration of a simulation tick
    pub tick_duration: Duration,
    pub config: SimulationConfig,
    pub collaborators: MovementCollaborators,
}

impl UsercmdPlugins {
    pub fn new(movement: impl PlayerMovement) -> Self {
        Self {
            tick_duration: TickDuration::default().0,
            config: SimulationConfig::default(),
            collaborators: MovementCollaborators::new(movement),
        }
    }

    pub fn with_tick_duration(mut self, tick_duration: Duration) -> Self {
        self.tick_duration = tick_duration;
        self
    }

    pub fn with_config(mut self, config: SimulationConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a subsystem that is consulted with the current command on every step
    pub fn with_listener(mut self, listener: impl StepListener) -> Self {
        self.collaborators = self.collaborators.with_listener(listener);
        self
    }
}

impl PluginGroup for UsercmdPlugins {
    #[allow(clippy::let_and_return)]
    fn build(self) -> PluginGroupBuilder {
        let builder = PluginGroupBuilder::start::<Self>()
            .add(CorePlugin {
                tick_duration: self.tick_duration,
                config: self.config,
            })
            .add(InputPlugin {
                collaborators: self.collaborators,
            });

        #[cfg(feature = "lag_compensation")]
        let builder =
            builder.add(usercmd_lag_compensation::plugin::LagCompensationPlugin::default());

        #[cfg(feature = "observer")]
        let builder = builder.add(usercmd_observer::plugin::ObserverPlugin::default());

        builder
    }
}
