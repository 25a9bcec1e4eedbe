//! Per game mode rules deciding which players are never lag compensated
use usercmd_core::roster::RosterEntry;

/// Capability object injected in the [`LagCompensationGate`](crate::gate::LagCompensationGate)
pub trait ExclusionPolicy: Send + Sync + 'static {
    /// True if `candidate` must not be rewound when `observer` fires
    fn excludes(&self, observer: &RosterEntry, candidate: &RosterEntry) -> bool;
}

/// Every visible player is compensated (free-for-all modes)
#[derive(Debug, Default, Clone, Copy)]
pub struct NoExclusion;

impl ExclusionPolicy for NoExclusion {
    fn excludes(&self, _: &RosterEntry, _: &RosterEntry) -> bool {
        false
    }
}

/// Teammates are not compensated, since they cannot be damaged
#[derive(Debug, Default, Clone, Copy)]
pub struct SameTeamExclusion;

impl ExclusionPolicy for SameTeamExclusion {
    fn excludes(&self, observer: &RosterEntry, candidate: &RosterEntry) -> bool {
        observer.team.is_playing() && observer.team == candidate.team
    }
}
