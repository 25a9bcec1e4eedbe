//! Configuration shared by the command pipeline and the observer layer.
use core::time::Duration;

use bevy_ecs::resource::Resource;
use bevy_reflect::Reflect;
use serde::{Deserialize, Serialize};

use crate::tick::TickDuration;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("max_ticks_per_advance must be at least 1")]
    ZeroTickClamp,
    #[error("command limit `{0}` must be finite and positive")]
    InvalidCommandLimit(&'static str),
}

/// Valid ranges for the fields of an input command.
///
/// Values outside of these ranges are clamped, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
pub struct CommandLimits {
    /// Maximum absolute value of the forward/side/up movement intent
    pub max_move: f32,
    /// Maximum absolute change of any view angle within one command, in degrees
    pub max_view_delta: f32,
}

impl Default for CommandLimits {
    fn default() -> Self {
        Self {
            max_move: 450.0,
            max_view_delta: 180.0,
        }
    }
}

#[derive(Resource, Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Maximum number of ticks a single command context can advance a player's clock.
    ///
    /// Protects the server from clients that claim a huge amount of lost commands.
    pub max_ticks_per_advance: u32,
    /// How far the player's clock may drift from the server clock before it gets corrected.
    pub clock_correction: Duration,
    pub command_limits: CommandLimits,
    /// If true, the ticks of commands that were lost in transit are simulated by holding
    /// the last known command.
    pub replay_dropped_commands: bool,
    /// Relaxes validation strictness (observer camera restrictions are ignored)
    pub allow_cheats: bool,
    /// How long a dying player remains a valid target to spectate
    pub death_linger: Duration,
    /// Maximum replay delay. A zero duration disables replays.
    pub max_replay: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_ticks_per_advance: 32,
            clock_correction: Duration::from_millis(60),
            command_limits: CommandLimits::default(),
            replay_dropped_commands: true,
            allow_cheats: false,
            death_linger: Duration::from_secs(3),
            max_replay: Duration::from_secs(10),
        }
    }
}

impl SimulationConfig {
    pub fn with_max_ticks_per_advance(mut self, max_ticks: u32) -> Self {
        self.max_ticks_per_advance = max_ticks;
        self
    }

    pub fn with_clock_correction(mut self, correction: Duration) -> Self {
        self.clock_correction = correction;
        self
    }

    pub fn with_command_limits(mut self, limits: CommandLimits) -> Self {
        self.command_limits = limits;
        self
    }

    pub fn with_replay_dropped_commands(mut self, replay: bool) -> Self {
        self.replay_dropped_commands = replay;
        self
    }

    pub fn with_cheats(mut self, allow_cheats: bool) -> Self {
        self.allow_cheats = allow_cheats;
        self
    }

    pub fn with_death_linger(mut self, linger: Duration) -> Self {
        self.death_linger = linger;
        self
    }

    pub fn with_max_replay(mut self, max_replay: Duration) -> Self {
        self.max_replay = max_replay;
        self
    }

    /// Number of ticks of drift tolerated by the clock correction.
    ///
    /// The correction is capped at one second.
    pub fn correction_ticks(&self, tick_duration: TickDuration) -> u32 {
        tick_duration.ticks_in(self.clock_correction.min(Duration::from_secs(1)))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_ticks_per_advance == 0 {
            return Err(ConfigError::ZeroTickClamp);
        }
        let limits = &self.command_limits;
        for (name, value) in [
            ("max_move", limits.max_move),
            ("max_view_delta", limits.max_view_delta),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidCommandLimit(name));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(SimulationConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = SimulationConfig::default().with_max_ticks_per_advance(0);
        assert_eq!(config.validate(), Err(ConfigError::ZeroTickClamp));

        let config = SimulationConfig::default().with_command_limits(CommandLimits {
            max_move: f32::NAN,
            ..Default::default()
        });
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidCommandLimit("max_move"))
        );

        let config = SimulationConfig::default().with_command_limits(CommandLimits {
            max_view_delta: -1.0,
            ..Default::default()
        });
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidCommandLimit("max_view_delta"))
        );
    }

    #[test]
    fn test_correction_ticks() {
        let tick_duration = TickDuration(Duration::from_millis(10));
        let config = SimulationConfig::default().with_clock_correction(Duration::from_millis(60));
        assert_eq!(config.correction_ticks(tick_duration), 6);

        // capped at one second
        let config = config.with_clock_correction(Duration::from_secs(5));
        assert_eq!(config.correction_ticks(tick_duration), 100);
    }

    #[test]
    fn test_config_serde() {
        let config = SimulationConfig::default().with_cheats(true);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: SimulationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
