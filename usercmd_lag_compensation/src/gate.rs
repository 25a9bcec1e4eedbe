//! The [`LagCompensationGate`]: decides which players get rewound for a command
use alloc::sync::Arc;

use bevy_ecs::resource::Resource;
use bevy_math::Vec3;

use usercmd_core::roster::RosterEntry;
use usercmd_core::visibility::TransmitBits;
use usercmd_inputs::command::InputCommand;

use crate::policy::{ExclusionPolicy, SameTeamExclusion};

/// Only compensate players that lie in front of the shooter.
///
/// Players closer than `near_range` are always compensated, since they could run past the
/// shooter during the rewound interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewCone {
    pub near_range: f32,
    /// Cosine of the half-angle of the cone
    pub cos_half_angle: f32,
}

impl Default for ViewCone {
    fn default() -> Self {
        Self {
            near_range: 600.0,
            // 45 degrees
            cos_half_angle: core::f32::consts::FRAC_1_SQRT_2,
        }
    }
}

/// Forward direction for view angles (pitch, yaw, roll) in degrees, with z up
pub fn view_forward(view_angles: Vec3) -> Vec3 {
    let pitch = view_angles.x.to_radians();
    let yaw = view_angles.y.to_radians();
    Vec3::new(pitch.cos() * yaw.cos(), pitch.cos() * yaw.sin(), -pitch.sin())
}

/// Pure predicate deciding whether `candidate` should be rewound while resolving the hits of
/// a command of `observer`.
///
/// It never moves anything: rewinding and restoring the candidate is left to the caller
/// (see [`LagCompensationHistory`](crate::history::LagCompensationHistory)).
#[derive(Resource, Clone)]
pub struct LagCompensationGate {
    policy: Arc<dyn ExclusionPolicy>,
    max_range: Option<f32>,
    view_cone: Option<ViewCone>,
}

impl Default for LagCompensationGate {
    fn default() -> Self {
        Self::new(SameTeamExclusion)
    }
}

impl core::fmt::Debug for LagCompensationGate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LagCompensationGate")
            .field("max_range", &self.max_range)
            .field("view_cone", &self.view_cone)
            .finish_non_exhaustive()
    }
}

impl LagCompensationGate {
    pub fn new(policy: impl ExclusionPolicy) -> Self {
        Self {
            policy: Arc::new(policy),
            max_range: None,
            view_cone: None,
        }
    }

    /// Never compensate players further away than `range`
    pub fn with_max_range(mut self, range: f32) -> Self {
        self.max_range = Some(range);
        self
    }

    pub fn with_view_cone(mut self, cone: ViewCone) -> Self {
        self.view_cone = Some(cone);
        self
    }

    pub fn should_compensate(
        &self,
        observer: &RosterEntry,
        candidate: &RosterEntry,
        command: &InputCommand,
        visibility: &TransmitBits,
    ) -> bool {
        if observer.entity == candidate.entity || !candidate.life.is_alive() {
            return false;
        }
        // the client cannot have seen (and aimed at) a player it was not sent
        if !visibility.is_visible_or_recent(candidate.slot) {
            return false;
        }
        if self.policy.excludes(observer, candidate) {
            return false;
        }
        let offset = candidate.position - observer.position;
        let distance = offset.length();
        if self.max_range.is_some_and(|range| distance > range) {
            return false;
        }
        if let Some(cone) = self.view_cone {
            // a candidate at the exact position of the observer has no direction
            if distance >= cone.near_range && distance > 0.0 {
                let forward = view_forward(observer.view_angles + command.view_delta);
                if forward.dot(offset / distance) < cone.cos_half_angle {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::NoExclusion;
    use approx::assert_relative_eq;
    use bevy_ecs::world::World;
    use test_log::test;
    use usercmd_core::roster::{LifeState, Team};

    fn players() -> (RosterEntry, RosterEntry) {
        let mut world = World::new();
        let observer = RosterEntry::new(world.spawn_empty().id(), 0).with_team(Team(2));
        let candidate = RosterEntry::new(world.spawn_empty().id(), 1)
            .with_team(Team(3))
            .with_position(Vec3::new(100.0, 0.0, 0.0));
        (observer, candidate)
    }

    #[test]
    fn test_view_forward() {
        let forward = view_forward(Vec3::new(0.0, 90.0, 0.0));
        assert_relative_eq!(forward.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(forward.y, 1.0, epsilon = 1e-6);
        // looking down
        let forward = view_forward(Vec3::new(90.0, 0.0, 0.0));
        assert_relative_eq!(forward.z, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_requires_visibility() {
        let (observer, candidate) = players();
        let gate = LagCompensationGate::default();
        let command = InputCommand::new(0);
        assert!(gate.should_compensate(&observer, &candidate, &command, &TransmitBits::from_visible([1])));
        assert!(!gate.should_compensate(&observer, &candidate, &command, &TransmitBits::from_visible([0, 2])));

        // recently visible is enough
        let mut bits = TransmitBits::from_visible([1]);
        bits.roll();
        assert!(gate.should_compensate(&observer, &candidate, &command, &bits));
    }

    #[test]
    fn test_same_team_exclusion() {
        let (observer, candidate) = players();
        let candidate = candidate.with_team(Team(2));
        let bits = TransmitBits::from_visible([1]);
        let command = InputCommand::new(0);
        assert!(!LagCompensationGate::new(SameTeamExclusion).should_compensate(&observer, &candidate, &command, &bits));
        assert!(LagCompensationGate::new(NoExclusion).should_compensate(&observer, &candidate, &command, &bits));
    }

    #[test]
    fn test_rejects_self_and_dead_players() {
        let (observer, candidate) = players();
        let bits = TransmitBits::from_visible([0, 1]);
        let command = InputCommand::new(0);
        let gate = LagCompensationGate::new(NoExclusion);
        assert!(!gate.should_compensate(&observer, &observer, &command, &bits));
        let dead = candidate.with_life(LifeState::Dead);
        assert!(!gate.should_compensate(&observer, &dead, &command, &bits));
    }

    #[test]
    fn test_range_and_view_cone() {
        let (observer, candidate) = players();
        let bits = TransmitBits::from_visible([1]);
        let command = InputCommand::new(0);

        let gate = LagCompensationGate::new(NoExclusion).with_max_range(50.0);
        assert!(!gate.should_compensate(&observer, &candidate, &command, &bits));

        let gate = LagCompensationGate::new(NoExclusion).with_view_cone(ViewCone {
            near_range: 10.0,
            ..Default::default()
        });
        // the candidate is straight ahead (+x)
        assert!(gate.should_compensate(&observer, &candidate, &command, &bits));
        // turning around during the command puts the candidate behind
        let turned = InputCommand::new(0).with_view_delta(Vec3::new(0.0, 180.0, 0.0));
        assert!(!gate.should_compensate(&observer, &candidate, &turned, &bits));
        // close players are compensated whatever the view direction
        let close = candidate.with_position(Vec3::new(5.0, 0.0, 0.0));
        assert!(gate.should_compensate(&observer, &close, &turned, &bits));
    }

    #[test]
    fn test_view_cone_without_near_range() {
        let (observer, candidate) = players();
        let bits = TransmitBits::from_visible([1]);
        let gate = LagCompensationGate::new(NoExclusion).with_view_cone(ViewCone {
            near_range: 0.0,
            ..Default::default()
        });
        let overlapping = candidate.with_position(observer.position);
        assert!(gate.should_compensate(&observer, &overlapping, &InputCommand::new(0), &bits));
    }
}
