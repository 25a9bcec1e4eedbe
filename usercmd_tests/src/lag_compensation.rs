use approx::assert_relative_eq;
use bevy_ecs::prelude::*;
use bevy_ecs::system::RunSystemOnce;
use bevy_math::Vec3;
use test_log::test;

use usercmd::prelude::*;

use crate::protocol::forward_commands;
use crate::stepper::Stepper;

struct Setup {
    stepper: Stepper,
    shooter: Entity,
    enemy: Entity,
    teammate: Entity,
}

/// An enemy moving one unit along X every tick, in view of the shooter
fn setup(frames: u32) -> Setup {
    let mut stepper = Stepper::default();
    let shooter = stepper.spawn_player(Team(2));
    let enemy = stepper.spawn_player(Team(3));
    let teammate = stepper.spawn_player(Team(2));
    for i in 0..frames {
        stepper.send(enemy, forward_commands(i, 1), 0, false);
        stepper.frame_step();
    }
    // written by the network layer for the next tick
    stepper.set_visible(shooter, enemy, true);
    stepper.set_visible(shooter, teammate, true);
    Setup {
        stepper,
        shooter,
        enemy,
        teammate,
    }
}

fn position_for(setup: &mut Setup, candidate: Entity, command: InputCommand) -> Option<Vec3> {
    let shooter = setup.shooter;
    setup
        .stepper
        .world_mut()
        .run_system_once(move |lag: LagCompensation| {
            lag.position_for(shooter, candidate, &command)
        })
        .unwrap()
}

fn latest_tick(setup: &Setup) -> Tick {
    setup
        .stepper
        .get::<LagCompensationHistory>(setup.enemy)
        .and_then(LagCompensationHistory::most_recent)
        .unwrap()
}

#[test]
fn test_enemy_is_rewound_to_the_command_tick() {
    let mut setup = setup(10);
    let tick = latest_tick(&setup);
    assert_relative_eq!(
        setup.stepper.get::<MoveState>(setup.enemy).unwrap().position.x,
        10.0
    );

    let command = InputCommand::new(0).with_tick(tick - 4);
    let enemy = setup.enemy;
    let rewound = position_for(&mut setup, enemy, command).unwrap();
    assert_relative_eq!(rewound.x, 6.0);
}

#[test]
fn test_teammates_and_hidden_players_use_the_frame_start_position() {
    let mut setup = setup(10);
    let tick = latest_tick(&setup);
    let command = InputCommand::new(0).with_tick(tick - 4);

    let (shooter, teammate) = (setup.shooter, setup.teammate);
    let compensated = setup
        .stepper
        .world_mut()
        .run_system_once(move |lag: LagCompensation| {
            lag.should_compensate(shooter, teammate, &command)
        })
        .unwrap();
    assert!(!compensated);

    setup.stepper.set_visible(setup.shooter, setup.enemy, false);
    let enemy = setup.enemy;
    let current = position_for(&mut setup, enemy, command).unwrap();
    // the roster was captured before the last tick was simulated
    assert_relative_eq!(current.x, 9.0);
}

#[test]
fn test_players_that_left_are_not_resolved() {
    let mut setup = setup(3);
    let command = InputCommand::new(0).with_tick(latest_tick(&setup));
    let enemy = setup.enemy;
    setup.stepper.world_mut().despawn(enemy);
    setup.stepper.frame_step();
    assert_eq!(position_for(&mut setup, enemy, command), None);
}
