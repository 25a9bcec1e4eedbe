//! The [`InputCommand`] sent by a client for each simulated tick
use bevy_math::Vec3;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use usercmd_core::config::CommandLimits;
use usercmd_core::diagnostics::{Anomaly, AnomalySink, CommandField};
use usercmd_core::tick::Tick;

bitflags! {
    /// Buttons held down by the player during a command
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Buttons: u32 {
        const ATTACK = 1 << 0;
        const JUMP = 1 << 1;
        const DUCK = 1 << 2;
        const FORWARD = 1 << 3;
        const BACK = 1 << 4;
        const USE = 1 << 5;
        const LEFT = 1 << 7;
        const RIGHT = 1 << 8;
        const MOVE_LEFT = 1 << 9;
        const MOVE_RIGHT = 1 << 10;
        const ATTACK2 = 1 << 11;
        const RELOAD = 1 << 13;
        const SPEED = 1 << 17;
        const WALK = 1 << 18;
        const SCORE = 1 << 16;
    }
}

impl Default for Buttons {
    fn default() -> Self {
        Self::empty()
    }
}

/// One tick worth of player intent.
///
/// Commands arrive in batches (see [`CommandContext`](crate::context::CommandContext)) and
/// are replayed by the server in order, one simulation step each.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InputCommand {
    /// Monotonically increasing command number assigned by the client
    pub sequence: u32,
    /// Client tick at which the command was generated
    pub tick: Tick,
    pub buttons: Buttons,
    pub forward_move: f32,
    pub side_move: f32,
    pub up_move: f32,
    /// Change of the view angles (pitch, yaw, roll) during the command, in degrees
    pub view_delta: Vec3,
    /// One-shot command (spray, flashlight, ...); only acted upon once
    pub impulse: u8,
    /// Seed shared by client prediction and server simulation for random effects
    pub random_seed: u32,
    /// Weapon switch requested during this command
    pub weapon_select: Option<u32>,
}

impl InputCommand {
    pub fn new(sequence: u32) -> Self {
        Self {
            sequence,
            random_seed: Self::seed_for(sequence),
            ..Default::default()
        }
    }

    pub fn with_tick(mut self, tick: Tick) -> Self {
        self.tick = tick;
        self
    }

    pub fn with_buttons(mut self, buttons: Buttons) -> Self {
        self.buttons = buttons;
        self
    }

    pub fn with_move(mut self, forward: f32, side: f32, up: f32) -> Self {
        self.forward_move = forward;
        self.side_move = side;
        self.up_move = up;
        self
    }

    pub fn with_view_delta(mut self, view_delta: Vec3) -> Self {
        self.view_delta = view_delta;
        self
    }

    pub fn with_impulse(mut self, impulse: u8) -> Self {
        self.impulse = impulse;
        self
    }

    pub fn with_weapon_select(mut self, weapon: u32) -> Self {
        self.weapon_select = Some(weapon);
        self
    }

    /// The random seed that the client must have used for the command `sequence`.
    ///
    /// Derived from the sequence only, so client and server always agree without the
    /// client being able to choose its own seed.
    pub fn seed_for(sequence: u32) -> u32 {
        (seahash::hash(&sequence.to_le_bytes()) as u32) & 0x7fff_ffff
    }

    /// Movement intent as a vector (forward, side, up)
    pub fn move_intent(&self) -> Vec3 {
        Vec3::new(self.forward_move, self.side_move, self.up_move)
    }

    /// Bring every field back in its valid range.
    ///
    /// Non-finite values become zero, out-of-range values are clamped. Each clamped field is
    /// reported as a [`Anomaly::CommandClamped`]. The random seed is always recomputed from the
    /// sequence.
    pub fn sanitize(mut self, limits: &CommandLimits, sink: &mut impl AnomalySink) -> Self {
        let sequence = self.sequence;
        let mut clamp = |value: &mut f32, max: f32, field: CommandField| {
            let clamped = if value.is_finite() {
                value.clamp(-max, max)
            } else {
                0.0
            };
            if clamped != *value {
                *value = clamped;
                sink.report(Anomaly::CommandClamped { sequence, field });
            }
        };
        clamp(&mut self.forward_move, limits.max_move, CommandField::ForwardMove);
        clamp(&mut self.side_move, limits.max_move, CommandField::SideMove);
        clamp(&mut self.up_move, limits.max_move, CommandField::UpMove);

        let mut view_delta = self.view_delta.to_array();
        let mut view_clamped = false;
        for angle in view_delta.iter_mut() {
            let clamped = if angle.is_finite() {
                angle.clamp(-limits.max_view_delta, limits.max_view_delta)
            } else {
                0.0
            };
            if clamped != *angle {
                *angle = clamped;
                view_clamped = true;
            }
        }
        if view_clamped {
            self.view_delta = Vec3::from_array(view_delta);
            sink.report(Anomaly::CommandClamped {
                sequence,
                field: CommandField::ViewDelta,
            });
        }
        self.random_seed = Self::seed_for(sequence);
        self
    }

    /// Copy of the command used to simulate a tick whose command was lost in transit.
    ///
    /// Movement and buttons are held, while one-shot actions and the view change are not repeated.
    pub fn held(&self) -> Self {
        Self {
            view_delta: Vec3::ZERO,
            impulse: 0,
            weapon_select: None,
            ..*self
        }
    }
}

/// Button transitions between two consecutive commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonState {
    /// Buttons held during the latest command
    pub buttons: Buttons,
    /// Buttons that went down during the latest command
    pub pressed: Buttons,
    /// Buttons that went up during the latest command
    pub released: Buttons,
    /// Buttons held during the command before
    pub last: Buttons,
}

impl ButtonState {
    pub fn update(&mut self, buttons: Buttons) {
        self.last = self.buttons;
        self.buttons = buttons;
        let changed = self.last ^ buttons;
        self.pressed = changed & buttons;
        self.released = changed & self.last;
    }

    pub fn just_pressed(&self, button: Buttons) -> bool {
        self.pressed.contains(button)
    }

    pub fn just_released(&self, button: Buttons) -> bool {
        self.released.contains(button)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
