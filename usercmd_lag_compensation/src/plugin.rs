use bevy_app::{App, FixedUpdate, Plugin};
use bevy_ecs::prelude::*;
use bevy_ecs::system::SystemParam;
use bevy_math::Vec3;

use usercmd_core::plugin::SimulationSet;
use usercmd_core::roster::PlayerRoster;
use usercmd_core::visibility::TransmitBits;
use usercmd_inputs::command::InputCommand;
use usercmd_inputs::plugin::commit_staged_moves;

use crate::gate::LagCompensationGate;
use crate::history::{LagCompensationHistory, record_history};

/// A system parameter combining the [`LagCompensationGate`] with the position histories.
///
/// Players are resolved through the [`PlayerRoster`], so every read observes the state from the
/// start of the frame. Systems using it should run in [`SimulationSet::Run`].
#[derive(SystemParam)]
pub struct LagCompensation<'w, 's> {
    gate: Res<'w, LagCompensationGate>,
    roster: Res<'w, PlayerRoster>,
    visibility: Query<'w, 's, &'static TransmitBits>,
    history: Query<'w, 's, &'static LagCompensationHistory>,
}

impl LagCompensation<'_, '_> {
    /// Check the gate for `candidate`. Players that left the roster are never compensated.
    pub fn should_compensate(&self, observer: Entity, candidate: Entity, command: &InputCommand) -> bool {
        let (Some(observer_entry), Some(candidate_entry)) =
            (self.roster.get(observer), self.roster.get(candidate))
        else {
            return false;
        };
        let Ok(bits) = self.visibility.get(observer) else {
            return false;
        };
        self.gate
            .should_compensate(observer_entry, candidate_entry, command, bits)
    }

    /// Position to use for `candidate` when resolving the hits of `command`.
    ///
    /// Returns the rewound position if the gate allows it, and the frame-start position otherwise.
    pub fn position_for(&self, observer: Entity, candidate: Entity, command: &InputCommand) -> Option<Vec3> {
        let current = self.roster.get(candidate)?.position;
        if !self.should_compensate(observer, candidate, command) {
            return Some(current);
        }
        let rewound = self
            .history
            .get(candidate)
            .ok()
            .and_then(|history| history.position_at(command.tick));
        Some(rewound.unwrap_or(current))
    }
}

pub struct LagCompensationPlugin {
    pub gate: LagCompensationGate,
}

impl Default for LagCompensationPlugin {
    fn default() -> Self {
        Self {
            gate: LagCompensationGate::default(),
        }
    }
}

impl Plugin for LagCompensationPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<LagCompensationHistory>();
        app.insert_resource(self.gate.clone());
        app.add_systems(
            FixedUpdate,
            record_history
                .in_set(SimulationSet::Commit)
                .after(commit_staged_moves),
        );
    }
}
