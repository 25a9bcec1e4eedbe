use alloc::vec::Vec;

use approx::assert_relative_eq;
use bevy_math::Vec3;
use test_log::test;

use usercmd::prelude::*;

use crate::protocol::{MOVE_SCALE, RecordingListener, forward_commands};
use crate::stepper::{Stepper, TICK_DURATION};

fn tick_base(stepper: &Stepper, player: bevy_ecs::entity::Entity) -> Tick {
    stepper
        .get::<TickClock>(player)
        .map(TickClock::tick_base)
        .unwrap_or_default()
}

fn position(stepper: &Stepper, player: bevy_ecs::entity::Entity) -> Vec3 {
    stepper
        .get::<MoveState>(player)
        .map(|state| state.position)
        .unwrap_or_default()
}

#[test]
fn test_batches_run_in_order_within_one_frame() {
    let mut stepper = Stepper::default();
    let player = stepper.spawn_player(Team(2));
    let start = tick_base(&stepper, player);
    assert_eq!(start, stepper.server_tick());

    stepper.send(player, forward_commands(0, 2), 0, false);
    stepper.send(player, forward_commands(2, 2), 0, false);
    stepper.send(player, forward_commands(4, 2), 0, false);
    stepper.frame_step();

    assert_eq!(stepper.movement.sequences(), (0..6).collect::<Vec<_>>());
    assert_eq!(tick_base(&stepper, player), start + 6);
    assert_relative_eq!(position(&stepper, player).x, 6.0 * 100.0 * MOVE_SCALE);
    let backlog = stepper.get::<CommandBacklog>(player).unwrap();
    assert!(backlog.is_empty());
    assert_eq!(
        stepper.get::<SimulationDriver>(player).unwrap().total_steps(),
        6
    );
}

#[test]
fn test_paused_batches_are_acknowledged_but_not_simulated() {
    let mut stepper = Stepper::default();
    let player = stepper.spawn_player(Team(2));

    stepper.send(player, forward_commands(0, 3), 0, true);
    stepper.frame_step();

    assert!(stepper.movement.sequences().is_empty());
    assert_eq!(position(&stepper, player), Vec3::ZERO);
    assert_eq!(
        stepper
            .get::<TickClock>(player)
            .unwrap()
            .acknowledged_sequence(),
        Some(2)
    );
}

#[test]
fn test_dropped_packets_replay_the_last_command() {
    let mut stepper = Stepper::default();
    let player = stepper.spawn_player(Team(2));

    stepper.send(player, forward_commands(0, 1), 0, false);
    stepper.frame_step();
    stepper.send(player, forward_commands(5, 2), 3, false);
    stepper.frame_step();

    // the held copies of command 0 run before the received commands
    assert_eq!(stepper.movement.sequences(), vec![0, 0, 0, 0, 5, 6]);
    assert_relative_eq!(position(&stepper, player).x, 6.0 * 100.0 * MOVE_SCALE);
}

#[test]
fn test_dropped_packets_are_skipped_when_replay_is_disabled() {
    let mut stepper =
        Stepper::new(SimulationConfig::default().with_replay_dropped_commands(false));
    let player = stepper.spawn_player(Team(2));
    let start = tick_base(&stepper, player);

    stepper.send(player, forward_commands(5, 2), 3, false);
    stepper.frame_step();

    assert_eq!(stepper.movement.sequences(), vec![5, 6]);
    // the clock still covers the lost commands
    assert_eq!(tick_base(&stepper, player), start + 5);
}

#[test]
fn test_backlog_overflow_evicts_the_oldest_contexts() {
    let mut stepper = Stepper::default();
    let player = stepper.spawn_player(Team(2));

    for i in 0..(BACKLOG_CAPACITY as u32 + 5) {
        stepper.send(player, forward_commands(i, 1), 0, false);
    }
    stepper.frame_step();

    let backlog = stepper.get::<CommandBacklog>(player).unwrap();
    assert_eq!(backlog.lost_contexts(), 5);
    assert_eq!(backlog.lost_commands(), 5);
    assert_eq!(stepper.anomalies("backlog_overflow"), 5);
    assert_eq!(
        stepper.movement.sequences(),
        (5..BACKLOG_CAPACITY as u32 + 5).collect::<Vec<_>>()
    );
}

#[test]
fn test_clock_running_ahead_is_held() {
    let mut stepper = Stepper::default();
    let player = stepper.spawn_player(Team(2));
    let start = tick_base(&stepper, player);

    for i in 0..20 {
        stepper.send(player, forward_commands(i, 1), 0, false);
    }
    stepper.frame_step();

    // the clock is never moved backward, the player simulates every tick it was sent
    assert_eq!(tick_base(&stepper, player), start + 20);
    assert_eq!(stepper.anomalies("clock_backward"), 1);

    // still ahead, but only reported once
    for i in 20..25 {
        stepper.send(player, forward_commands(i, 1), 0, false);
        stepper.frame_step();
    }
    assert_eq!(tick_base(&stepper, player), start + 25);
    assert_eq!(stepper.anomalies("clock_backward"), 1);
}

#[test]
fn test_clock_recovers_after_a_lag_spike() {
    let config = SimulationConfig::default();
    let correction = config.correction_ticks(TickDuration(TICK_DURATION));
    let mut stepper = Stepper::new(config);
    let player = stepper.spawn_player(Team(2));
    let start = tick_base(&stepper, player);

    // the packets of the client are delayed
    stepper.frame_step_n(20);
    assert_eq!(tick_base(&stepper, player), start);

    // then arrive together
    for i in 0..20 {
        stepper.send(player, forward_commands(i, 1), 0, false);
    }
    stepper.frame_step();
    for i in 20..70 {
        stepper.send(player, forward_commands(i, 1), 0, false);
        stepper.frame_step();
        let drift = tick_base(&stepper, player) - stepper.server_tick();
        assert!(
            (0..=correction as i32).contains(&drift),
            "clock drifted by {drift} ticks"
        );
    }
    assert_eq!(stepper.anomalies("clock_backward"), 0);
    assert_eq!(stepper.movement.sequences().len(), 70);
}

#[test]
fn test_paused_contexts_do_not_change_the_outcome() {
    let mut stepper = Stepper::default();
    let with_pauses = stepper.spawn_player(Team(2));
    let without_pauses = stepper.spawn_player(Team(2));

    for i in 0..5 {
        stepper.send(with_pauses, forward_commands(2 * i, 2), 0, true);
    }
    for i in 5..10 {
        stepper.send(with_pauses, forward_commands(2 * i, 2), 0, false);
        stepper.send(without_pauses, forward_commands(2 * i, 2), 0, false);
    }
    stepper.frame_step();

    let expected = position(&stepper, without_pauses);
    assert_relative_eq!(expected.x, 10.0 * 100.0 * MOVE_SCALE);
    assert_eq!(position(&stepper, with_pauses), expected);
    assert_eq!(
        tick_base(&stepper, with_pauses),
        tick_base(&stepper, without_pauses)
    );
}

#[test]
fn test_listeners_see_the_current_command_of_every_step() {
    let listener = RecordingListener::default();
    let mut stepper = Stepper::with_plugins(|movement| {
        UsercmdPlugins::new(movement)
            .with_tick_duration(TICK_DURATION)
            .with_listener(listener.clone())
    });
    let player = stepper.spawn_player(Team(2));
    let start = tick_base(&stepper, player);

    stepper.send(player, forward_commands(0, 1), 0, false);
    stepper.frame_step();
    stepper.send(player, forward_commands(5, 2), 3, false);
    stepper.frame_step();

    let steps = listener.steps();
    assert!(steps.iter().all(|step| step.entity == player));
    assert_eq!(
        steps.iter().map(|step| step.sequence).collect::<Vec<_>>(),
        vec![0, 0, 0, 0, 5, 6]
    );
    assert_eq!(
        steps.iter().map(|step| step.held).collect::<Vec<_>>(),
        vec![false, true, true, true, false, false]
    );
    assert_eq!(
        steps.iter().map(|step| step.tick).collect::<Vec<_>>(),
        (0..6).map(|i| start + i).collect::<Vec<_>>()
    );
    // only set while a step runs
    assert!(
        stepper
            .get::<SimulationDriver>(player)
            .unwrap()
            .current_command()
            .is_none()
    );
}

#[test]
fn test_out_of_range_commands_are_clamped() {
    let mut stepper = Stepper::default();
    let player = stepper.spawn_player(Team(2));

    let commands = vec![
        InputCommand::new(0).with_move(f32::NAN, 10_000.0, 0.0),
        InputCommand::new(1).with_view_delta(Vec3::new(0.0, f32::INFINITY, 0.0)),
    ];
    stepper.send(player, commands, 0, false);
    stepper.frame_step();

    assert_eq!(stepper.anomalies("command_clamped"), 3);
    let state = stepper.get::<MoveState>(player).unwrap();
    assert!(state.position.is_finite());
    assert!(state.view_angles.is_finite());
    let last = stepper
        .get::<SimulationDriver>(player)
        .and_then(SimulationDriver::last_command)
        .unwrap();
    assert_eq!(last.random_seed, InputCommand::seed_for(1));
}

#[test]
fn test_frozen_players_keep_their_backlog() {
    let mut stepper = Stepper::default();
    let player = stepper.spawn_player(Team(2));
    stepper.world_mut().entity_mut(player).insert(Frozen);

    stepper.send(player, forward_commands(0, 2), 0, false);
    stepper.frame_step();

    // only a null command ran
    assert_eq!(stepper.movement.sequences(), vec![0]);
    assert_eq!(position(&stepper, player), Vec3::ZERO);
    assert_eq!(stepper.get::<CommandBacklog>(player).unwrap().len(), 1);

    stepper.movement.clear();
    stepper.world_mut().entity_mut(player).remove::<Frozen>();
    stepper.frame_step();
    assert_eq!(stepper.movement.sequences(), vec![0, 1]);
}
