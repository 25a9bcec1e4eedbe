use alloc::vec::Vec;

use bevy_ecs::prelude::*;
use test_log::test;

use usercmd::prelude::*;

use crate::stepper::Stepper;

#[derive(Resource, Default)]
struct ChangeLog(Vec<ObserverChanged>);

fn stepper_with_log() -> Stepper {
    let mut stepper = Stepper::default();
    stepper.app.init_resource::<ChangeLog>();
    stepper
        .app
        .add_observer(|trigger: On<ObserverChanged>, mut log: ResMut<ChangeLog>| {
            log.0.push(*trigger.event());
        });
    stepper
}

fn state(stepper: &Stepper, entity: Entity) -> ObserverState {
    stepper.get::<ObserverState>(entity).cloned().unwrap_or_default()
}

#[test]
fn test_spectator_rotates_through_the_players() {
    let mut stepper = stepper_with_log();
    let spectator = stepper.spawn_player(Team::SPECTATOR);
    let a = stepper.spawn_player(Team(2));
    let b = stepper.spawn_player(Team(3));
    stepper.frame_step();

    stepper.request(spectator, ObserverAction::Start(ObserverMode::Chase));
    stepper.frame_step();
    assert_eq!(state(&stepper, spectator).mode(), ObserverMode::Chase);
    assert_eq!(state(&stepper, spectator).target(), Some(a));
    assert!(stepper.get::<Observing>(spectator).is_some());

    stepper.request(spectator, ObserverAction::NextTarget);
    stepper.frame_step();
    assert_eq!(state(&stepper, spectator).target(), Some(b));

    stepper.request(spectator, ObserverAction::NextTarget);
    stepper.frame_step();
    assert_eq!(state(&stepper, spectator).target(), Some(a));

    stepper.request(spectator, ObserverAction::PreviousTarget);
    stepper.frame_step();
    assert_eq!(state(&stepper, spectator).target(), Some(b));

    let log = &stepper.world().resource::<ChangeLog>().0;
    assert_eq!(
        log.iter().map(|e| e.target).collect::<Vec<_>>(),
        vec![Some(a), Some(b), Some(a), Some(b)]
    );
    assert!(log.iter().all(|e| e.entity == spectator && !e.forced));
}

#[test]
fn test_forced_mode_is_restored_when_a_target_comes_back() {
    let mut stepper = stepper_with_log();
    let spectator = stepper.spawn_player(Team::SPECTATOR);
    let a = stepper.spawn_player(Team(2));
    let b = stepper.spawn_player(Team(3));
    stepper.frame_step();
    stepper.request(spectator, ObserverAction::Start(ObserverMode::Chase));
    stepper.frame_step();
    assert_eq!(state(&stepper, spectator).target(), Some(a));

    // the target leaves: switch to the next one
    stepper.world_mut().despawn(a);
    stepper.frame_step();
    assert_eq!(state(&stepper, spectator).target(), Some(b));

    // nobody left to watch: fall back to free roaming
    stepper.world_mut().entity_mut(b).insert(LifeState::Dead);
    stepper.frame_step();
    let forced = state(&stepper, spectator);
    assert_eq!(forced.mode(), ObserverMode::Roam);
    assert!(forced.is_forced());
    assert_eq!(forced.last_mode(), ObserverMode::Chase);

    stepper.world_mut().entity_mut(b).insert(LifeState::Alive);
    stepper.frame_step();
    let restored = state(&stepper, spectator);
    assert_eq!(restored.mode(), ObserverMode::Chase);
    assert_eq!(restored.target(), Some(b));
    assert!(!restored.is_forced());

    let log = &stepper.world().resource::<ChangeLog>().0;
    assert_eq!(
        log.iter().map(|e| (e.mode, e.forced)).collect::<Vec<_>>(),
        vec![
            (ObserverMode::Chase, false),
            (ObserverMode::Chase, false),
            (ObserverMode::Roam, true),
            (ObserverMode::Chase, false),
        ]
    );
}

#[test]
fn test_respawned_players_stop_observing() {
    let mut stepper = Stepper::default();
    let player = stepper.spawn_player(Team(2));
    let _other = stepper.spawn_player(Team(3));
    stepper.world_mut().entity_mut(player).insert(LifeState::Dead);
    stepper.frame_step();

    stepper.request(player, ObserverAction::SetModeIndex(ObserverMode::Roam.index()));
    stepper.frame_step();
    assert_eq!(state(&stepper, player).mode(), ObserverMode::Roam);
    assert!(stepper.get::<Observing>(player).is_some());

    stepper.world_mut().entity_mut(player).insert(LifeState::Alive);
    stepper.frame_step();
    assert!(!state(&stepper, player).is_observing());
    assert!(stepper.get::<Observing>(player).is_none());
}

#[test]
fn test_invalid_requests_are_ignored() {
    let mut stepper = Stepper::default();
    let spectator = stepper.spawn_player(Team::SPECTATOR);
    stepper.frame_step();

    stepper.request(spectator, ObserverAction::SetModeIndex(42));
    stepper.request(spectator, ObserverAction::NextTarget);
    stepper.frame_step();
    assert!(!state(&stepper, spectator).is_observing());

    // nobody to chase yet
    stepper.request(spectator, ObserverAction::Start(ObserverMode::Chase));
    stepper.frame_step();
    let started = state(&stepper, spectator);
    assert_eq!(started.mode(), ObserverMode::Roam);
    assert!(started.is_forced());
}

#[test]
fn test_replay_stops_on_its_own() {
    let mut stepper = Stepper::default();
    let spectator = stepper.spawn_player(Team::SPECTATOR);
    let target = stepper.spawn_player(Team(2));
    stepper.frame_step();

    // further back than the maximum replay delay
    stepper.request(
        spectator,
        ObserverAction::StartReplay {
            delay: 20.0,
            duration: 1.0,
            target: Some(target),
        },
    );
    stepper.frame_step();
    assert!(!stepper.get::<ReplayWindow>(spectator).unwrap().is_active());

    stepper.request(
        spectator,
        ObserverAction::StartReplay {
            delay: 1.0,
            duration: 0.5,
            target: Some(target),
        },
    );
    stepper.frame_step();
    let window = stepper.get::<ReplayWindow>(spectator).unwrap();
    assert!(window.is_active());
    assert_eq!(window.target(), Some(target));

    stepper.frame_step_n(10);
    assert!(stepper.get::<ReplayWindow>(spectator).unwrap().is_active());

    // 0.5s is 32 ticks
    stepper.frame_step_n(30);
    assert!(!stepper.get::<ReplayWindow>(spectator).unwrap().is_active());
}
