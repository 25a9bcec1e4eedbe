//! Test collaborators plugged in the [`Stepper`](crate::stepper::Stepper)
use alloc::sync::Arc;
use alloc::vec::Vec;
use std::sync::Mutex;

use bevy_ecs::entity::Entity;
use usercmd::prelude::*;

/// Movement speed per tick for a full-scale movement intent
pub const MOVE_SCALE: f32 = 0.01;

/// Integrates the movement intent along the world axes and records every command it runs
#[derive(Clone, Default)]
pub struct RecordingMovement {
    log: Arc<Mutex<Vec<u32>>>,
}

impl RecordingMovement {
    /// Sequences of the commands run so far, in order
    pub fn sequences(&self) -> Vec<u32> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut log) = self.log.lock() {
            log.clear();
        }
    }
}

impl PlayerMovement for RecordingMovement {
    fn step(&self, pre: &MoveState, command: &InputCommand) -> MoveState {
        if let Ok(mut log) = self.log.lock() {
            log.push(command.sequence);
        }
        let velocity = command.move_intent() * MOVE_SCALE;
        MoveState {
            position: pre.position + velocity,
            velocity,
            view_angles: pre.view_angles + command.view_delta,
        }
    }
}

/// A step seen by the [`RecordingListener`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepRecord {
    pub entity: Entity,
    pub sequence: u32,
    pub tick: Tick,
    pub held: bool,
}

/// Records the current command of every step, like an autoaim or weapon system would read it
#[derive(Clone, Default)]
pub struct RecordingListener {
    log: Arc<Mutex<Vec<StepRecord>>>,
}

impl RecordingListener {
    pub fn steps(&self) -> Vec<StepRecord> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }
}

impl StepListener for RecordingListener {
    fn on_step(&self, entity: Entity, command: &CurrentCommand, _: &MoveState) {
        if let Ok(mut log) = self.log.lock() {
            log.push(StepRecord {
                entity,
                sequence: command.command.sequence,
                tick: command.tick,
                held: command.held,
            });
        }
    }
}

/// Commands `start..start + n`, each moving forward
pub fn forward_commands(start: u32, n: u32) -> Vec<InputCommand> {
    (start..start + n)
        .map(|i| InputCommand::new(i).with_move(100.0, 0.0, 0.0).with_buttons(Buttons::FORWARD))
        .collect()
}
