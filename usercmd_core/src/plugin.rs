use core::time::Duration;

use bevy_app::{App, FixedUpdate, Plugin};
use bevy_ecs::prelude::*;
use bevy_time::TimePlugin;
#[allow(unused_imports)]
use tracing::{error, info};

use crate::config::SimulationConfig;
use crate::diagnostics::{AnomalyCounts, AnomalyEvent, log_anomalies};
use crate::roster::{LifeState, MoveState, Observing, PlayerRoster, PlayerSlot, Team, snapshot_roster};
use crate::tick::{Tick, TickDuration};
use crate::visibility::roll_transmit_bits;

/// Ordering of the per-tick command pipeline. The sets run chained in [`FixedUpdate`].
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum SimulationSet {
    /// Take the [`PlayerRoster`] snapshot that every cross-entity read uses during this tick
    Snapshot,
    /// Receive the command batches delivered by the network layer
    Receive,
    /// Drain the command backlogs and stage the movement results
    Run,
    /// Commit the staged movement results and roll the visibility bits
    Commit,
    /// Log and count the anomalies reported during this tick
    Diagnostics,
}

/// Tick of the server simulation, incremented once per [`FixedUpdate`]
#[derive(Resource, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServerTick(pub Tick);

fn increment_server_tick(mut tick: ResMut<ServerTick>) {
    tick.0 += 1;
}

pub struct CorePlugin {
    pub tick_duration: Duration,
    pub config: SimulationConfig,
}

impl Default for CorePlugin {
    fn default() -> Self {
        Self {
            tick_duration: TickDuration::default().0,
            config: SimulationConfig::default(),
        }
    }
}

impl Plugin for CorePlugin {
    fn build(&self, app: &mut App) {
        if !app.is_plugin_added::<TimePlugin>() {
            app.add_plugins(TimePlugin);
        }
        if let Err(e) = self.config.validate() {
            error!("invalid simulation config, falling back to the defaults: {e}");
            app.insert_resource(SimulationConfig::default());
        } else {
            app.insert_resource(self.config.clone());
        }
        app.register_type::<(PlayerSlot, Team, LifeState, MoveState, Observing)>();
        app.register_type::<SimulationConfig>();

        app.insert_resource(TickDuration(self.tick_duration));
        app.init_resource::<ServerTick>();
        app.init_resource::<PlayerRoster>();
        app.init_resource::<AnomalyCounts>();
        app.add_message::<AnomalyEvent>();

        app.configure_sets(
            FixedUpdate,
            (
                SimulationSet::Snapshot,
                SimulationSet::Receive,
                SimulationSet::Run,
                SimulationSet::Commit,
                SimulationSet::Diagnostics,
            )
                .chain(),
        );
        app.add_systems(
            FixedUpdate,
            (increment_server_tick, snapshot_roster)
                .chain()
                .in_set(SimulationSet::Snapshot),
        );
        app.add_systems(
            FixedUpdate,
            roll_transmit_bits.in_set(SimulationSet::Commit),
        );
        app.add_systems(
            FixedUpdate,
            log_anomalies.in_set(SimulationSet::Diagnostics),
        );
    }

    fn finish(&self, app: &mut App) {
        app.world_mut()
            .resource_mut::<bevy_time::Time<bevy_time::Fixed>>()
            .set_timestep(self.tick_duration);
        info!(tick_duration = ?self.tick_duration, "usercmd core ready");
    }
}
