//! Time-delayed viewing on top of the observer state
use core::time::Duration;

use bevy_ecs::prelude::*;
use bevy_reflect::Reflect;
#[allow(unused_imports)]
use tracing::{debug, trace};

use usercmd_core::tick::TickDuration;

/// A window that shows the game as it was `delay` ago, until it stops on its own.
///
/// The window only changes which point in time the view is sampled at; it never touches the
/// commands of the player.
#[derive(Component, Debug, Clone, Default, PartialEq, Reflect)]
pub struct ReplayWindow {
    delay: Duration,
    stop_at: Duration,
    target: Option<Entity>,
    active: bool,
}

impl ReplayWindow {
    /// Start a replay `delay` seconds in the past, for `duration` seconds.
    ///
    /// Fails on a negative delay, a non-positive duration, when replays are disabled
    /// (`max_replay` is zero) or when the delay exceeds `max_replay`.
    pub fn start(
        &mut self,
        delay: f32,
        duration: f32,
        target: Option<Entity>,
        now: Duration,
        max_replay: Duration,
    ) -> bool {
        if delay.is_nan() || delay < 0.0 || duration.is_nan() || duration <= 0.0 {
            return false;
        }
        if max_replay.is_zero() {
            return false;
        }
        let (Ok(delay), Ok(duration)) = (
            Duration::try_from_secs_f32(delay),
            Duration::try_from_secs_f32(duration),
        ) else {
            return false;
        };
        if delay > max_replay {
            return false;
        }
        let Some(stop_at) = now.checked_add(duration) else {
            return false;
        };
        *self = Self {
            delay,
            stop_at,
            target,
            active: true,
        };
        debug!(?delay, ?duration, ?target, "started replay");
        true
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    /// Stop the window once its duration has elapsed. Returns true if it just stopped.
    pub fn update(&mut self, now: Duration) -> bool {
        if self.active && now >= self.stop_at {
            self.active = false;
            trace!("replay finished");
            return true;
        }
        false
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn target(&self) -> Option<Entity> {
        self.active.then_some(self.target).flatten()
    }

    /// Point in time at which the view should be sampled, if the window is active
    pub fn view_time(&self, now: Duration) -> Option<Duration> {
        self.active.then(|| now.saturating_sub(self.delay))
    }

    /// The delay expressed in ticks; zero when the window is not active
    pub fn delay_ticks(&self, tick_duration: TickDuration) -> u32 {
        if !self.active {
            return 0;
        }
        tick_duration.ticks_in(self.delay)
    }
}

/// Stop the replays whose duration has elapsed
pub(crate) fn expire_replays(time: Res<bevy_time::Time>, mut query: Query<&mut ReplayWindow>) {
    let now = time.elapsed();
    for mut window in query.iter_mut() {
        if window.is_active() {
            window.update(now);
        }
    }
}
