use alloc::sync::Arc;

use bevy_app::{App, Plugin, Update};
use bevy_ecs::prelude::*;
use bevy_time::Time;
#[allow(unused_imports)]
use tracing::{debug, trace};

use usercmd_core::config::SimulationConfig;
use usercmd_core::roster::{LifeState, Observing, PlayerRoster, Team};

use crate::mode::ObserverMode;
use crate::policy::{DefaultObserverPolicy, ObserverPolicy};
use crate::replay::{ReplayWindow, expire_replays};
use crate::state::{ObserverContext, ObserverState};

#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum ObserverSet {
    /// Apply the requests sent by the players
    Requests,
    /// Validate the targets and restore forced modes
    Settings,
    /// Expire the replay windows and notify the transitions
    Replay,
}

/// What a player asks its observer state to do
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObserverAction {
    Start(ObserverMode),
    /// Mode sent as a raw index by a client; invalid indices are ignored
    SetModeIndex(i32),
    SetMode(ObserverMode),
    SetTarget(Entity),
    NextTarget,
    PreviousTarget,
    CycleMode,
    Stop,
    StartReplay {
        delay: f32,
        duration: f32,
        target: Option<Entity>,
    },
    StopReplay,
}

#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct ObserverRequest {
    pub entity: Entity,
    pub action: ObserverAction,
}

/// Triggered on a player whose observer mode or target changed, so that its view can be refreshed
#[derive(EntityEvent, Debug, Clone, Copy, PartialEq)]
pub struct ObserverChanged {
    pub entity: Entity,
    pub mode: ObserverMode,
    pub target: Option<Entity>,
    pub forced: bool,
}

/// The [`ObserverPolicy`] of the current game mode
#[derive(Resource, Clone)]
pub struct ObserverRules {
    pub policy: Arc<dyn ObserverPolicy>,
}

impl Default for ObserverRules {
    fn default() -> Self {
        Self {
            policy: Arc::new(DefaultObserverPolicy::default()),
        }
    }
}

#[derive(Default)]
pub struct ObserverPlugin {
    pub rules: ObserverRules,
}

impl ObserverPlugin {
    pub fn new(policy: impl ObserverPolicy) -> Self {
        Self {
            rules: ObserverRules {
                policy: Arc::new(policy),
            },
        }
    }
}

impl Plugin for ObserverPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<(ObserverState, ReplayWindow)>();
        app.insert_resource(self.rules.clone());
        app.add_message::<ObserverRequest>();

        app.configure_sets(
            Update,
            (ObserverSet::Requests, ObserverSet::Settings, ObserverSet::Replay).chain(),
        );
        app.add_systems(
            Update,
            (stop_observing_on_respawn, handle_observer_requests)
                .chain()
                .in_set(ObserverSet::Requests),
        );
        app.add_systems(Update, check_observer_settings.in_set(ObserverSet::Settings));
        app.add_systems(
            Update,
            (expire_replays, notify_observer_changes).in_set(ObserverSet::Replay),
        );
    }
}

fn handle_observer_requests(
    mut requests: MessageReader<ObserverRequest>,
    time: Res<Time>,
    roster: Res<PlayerRoster>,
    config: Res<SimulationConfig>,
    rules: Res<ObserverRules>,
    mut query: Query<(&mut ObserverState, Option<&mut ReplayWindow>)>,
) {
    let now = time.elapsed();
    for request in requests.read() {
        let Ok((mut state, replay)) = query.get_mut(request.entity) else {
            debug!(entity = ?request.entity, "observer request for a player without observer state");
            continue;
        };
        let ctx = ObserverContext {
            observer: request.entity,
            roster: &roster,
            policy: rules.policy.as_ref(),
            config: &config,
            now,
        };
        let accepted = match request.action {
            ObserverAction::Start(mode) => state.start(mode, &ctx),
            ObserverAction::SetModeIndex(index) => match ObserverMode::from_index(index) {
                Some(ObserverMode::None) => {
                    state.stop();
                    true
                }
                Some(mode) if state.is_observing() => state.set_mode(mode, &ctx),
                Some(mode) => state.start(mode, &ctx),
                None => false,
            },
            ObserverAction::SetMode(mode) => state.set_mode(mode, &ctx),
            ObserverAction::SetTarget(target) => state.set_target(target, &ctx),
            ObserverAction::NextTarget => state.cycle_target(false, &ctx),
            ObserverAction::PreviousTarget => state.cycle_target(true, &ctx),
            ObserverAction::CycleMode => state.cycle_mode(&ctx),
            ObserverAction::Stop => {
                state.stop();
                true
            }
            ObserverAction::StartReplay {
                delay,
                duration,
                target,
            } => replay.is_some_and(|mut window| {
                window.start(delay, duration, target, now, config.max_replay)
            }),
            ObserverAction::StopReplay => {
                if let Some(mut window) = replay {
                    window.stop();
                }
                true
            }
        };
        if !accepted {
            debug!(entity = ?request.entity, action = ?request.action, "rejected observer request");
        }
    }
}

fn check_observer_settings(
    time: Res<Time>,
    roster: Res<PlayerRoster>,
    config: Res<SimulationConfig>,
    rules: Res<ObserverRules>,
    mut query: Query<(Entity, &mut ObserverState)>,
) {
    let now = time.elapsed();
    for (entity, mut state) in query.iter_mut() {
        if !state.is_observing() {
            continue;
        }
        let ctx = ObserverContext {
            observer: entity,
            roster: &roster,
            policy: rules.policy.as_ref(),
            config: &config,
            now,
        };
        // avoid flagging the component as changed when nothing happens
        let revision = state.revision();
        let mut updated = state.clone();
        updated.check_settings(&ctx);
        if updated.revision() != revision {
            *state = updated;
        }
    }
}

/// Playing players that come back to life stop spectating
fn stop_observing_on_respawn(
    mut query: Query<(&LifeState, Option<&Team>, &mut ObserverState), Changed<LifeState>>,
) {
    for (life, team, mut state) in query.iter_mut() {
        if life.is_alive() && team.is_some_and(Team::is_playing) && state.is_observing() {
            state.stop();
        }
    }
}

/// Trigger [`ObserverChanged`] for every transition and keep the [`Observing`] marker in sync
fn notify_observer_changes(
    mut commands: Commands,
    mut query: Query<(Entity, &mut ObserverState, Has<Observing>), Changed<ObserverState>>,
) {
    for (entity, mut state, observing) in query.iter_mut() {
        if state.notified_revision == state.revision() {
            continue;
        }
        state.notified_revision = state.revision();
        match (state.is_observing(), observing) {
            (true, false) => {
                commands.entity(entity).insert(Observing);
            }
            (false, true) => {
                commands.entity(entity).remove::<Observing>();
            }
            _ => {}
        }
        trace!(?entity, mode = ?state.mode(), target = ?state.target(), "observer changed");
        commands.trigger(ObserverChanged {
            entity,
            mode: state.mode(),
            target: state.target(),
            forced: state.is_forced(),
        });
    }
}
