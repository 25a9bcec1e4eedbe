/*! # Usercmd

Server-authoritative processing of player input commands for the Bevy game engine.

Clients send their inputs as batches of commands; the server replays them one tick at a time,
advancing a per-player clock, so that the simulation runs exactly as many ticks as the client
experienced despite packet loss, batching or pauses.

The crate is split in several sub-crates, all re-exported here:
- [`common`]: ticks, configuration, diagnostics and the per-frame player roster
- [`inputs`]: command backlog, tick clock and simulation driver
- [`lag_compensation`]: which players to rewind when resolving hits
- [`observer`]: spectator modes and replays

Add the [`UsercmdPlugins`](prelude::UsercmdPlugins) plugin group to your server app.
*/
mod plugin;

pub mod common {
    pub use usercmd_core::*;
}

pub mod inputs {
    pub use usercmd_inputs::*;
}

#[cfg(feature = "lag_compensation")]
pub mod lag_compensation {
    pub use usercmd_lag_compensation::*;
}

#[cfg(feature = "observer")]
pub mod observer {
    pub use usercmd_observer::*;
}

pub mod prelude {
    pub use crate::plugin::UsercmdPlugins;
    pub use usercmd_core::prelude::*;
    pub use usercmd_inputs::prelude::*;

    #[cfg(feature = "lag_compensation")]
    pub use usercmd_lag_compensation::prelude::*;

    #[cfg(feature = "observer")]
    pub use usercmd_observer::prelude::*;
}
