//! Keyframed vector animation playback.
//!
//! Loads a Lottie-compatible description, mounts it into a retained SVG
//! scene graph and re-renders that graph frame by frame from a clock.
//!
//! ```no_run
//! use lottie_player::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let animation = Animation::from_slice(&std::fs::read("loader.json")?)?;
//! let scene = SceneGraph::with_container(animation.w, animation.h, "stage");
//! let engine = Engine::mount(animation, scene, "stage", EngineOptions::default())?;
//!
//! let mut player = Player::new(engine, MonotonicClock::new(), ManualScheduler::new());
//! player.play();
//! while let Some(tick) = player.scheduler_mut().take_pending() {
//!     player.on_tick(tick);
//!     # break;
//! }
//! # Ok(())
//! # }
//! ```

pub use lottie_core as core;
pub use lottie_data as data;
pub use lottie_raster as raster;

pub mod prelude {
    pub use lottie_core::{
        Clock, Engine, EngineError, EngineOptions, EngineResult, ManualClock, ManualScheduler,
        MonotonicClock, PlaybackState, Player, SceneGraph, Scheduler,
    };
    pub use lottie_data::model::Animation;
    pub use lottie_raster::{RasterError, RasterOptions};
}
