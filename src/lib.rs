pub mod api;
pub mod document;
pub mod error;
pub mod model;
pub mod pitch;
pub mod placement;
pub mod resolve;
pub mod validate;

pub use api::{perform, perform_composition, perform_source, perform_unchecked, RenderPolicy};
pub use error::*;
pub use model::*;
pub use placement::{place, place_note, Cue, Performance, PlayableEvent};
pub use resolve::{resolve, resolve_at, BackendDefaults, EffectiveParams};
pub use validate::{diagnose, validate, validate_note};

/// Render a track with full validation.
/// This is the main entry point for the library.
pub fn render(track: &Track) -> Result<Performance, ScoreError> {
    perform(track, RenderPolicy::Strict)
}
