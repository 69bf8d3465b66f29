//! Core engine for Lottie/Bodymovin vector animations.
//!
//! The pipeline runs in three stages. [`load_composition`] decodes and
//! validates a JSON document into an immutable [`Composition`]. A
//! [`SceneGraph`] is built from it once, resolving parent chains and
//! nested compositions into an index-based evaluation graph. From there,
//! [`evaluate`] is a pure function of `(graph, frame)` producing a
//! [`RenderTree`] for a drawing backend, and [`PlaybackController`] maps
//! wall-clock ticks onto frames with looping, clipping and completion
//! notifications.
//!
//! ```no_run
//! use motion_core::{load_composition, PlaybackConfig, PlaybackController};
//! use std::sync::Arc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let bytes = std::fs::read("animation.json")?;
//! let comp = Arc::new(load_composition(&bytes)?);
//! let mut controller = PlaybackController::new(comp, PlaybackConfig::default())?;
//! controller.play();
//! controller.advance(1.0 / 60.0);
//! let tree = controller.render_tree();
//! # drop(tree);
//! # Ok(())
//! # }
//! ```

pub mod animatable;
pub mod decode;
pub mod evaluate;
pub mod graph;
pub mod playback;
pub mod render;
mod trim;

pub use decode::{decode_with_limit, Composition, DecodeError, ImageSource, RefKind};
pub use evaluate::{evaluate, evaluate_with_cache, EvalCache};
pub use graph::{BuildError, SceneGraph};
pub use playback::{
    ClipRange, LoopMode, PlayState, PlaybackConfig, PlaybackController, PlaybackEvent,
};
pub use render::*;

/// Decode a composition from raw JSON bytes.
pub fn load_composition(bytes: &[u8]) -> Result<Composition, DecodeError> {
    decode::decode(bytes)
}
