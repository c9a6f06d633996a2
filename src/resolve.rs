//! # Parameter Resolution
//!
//! Computes the effective performance parameters of a note from its ancestor chain.
//!
//! ## Algorithm
//! Each field of [`PerformanceParams`] is resolved on its own: starting at the note and
//! walking outward through its containers, its bar and finally its track, the first scope
//! that sets the field wins. A field that no scope sets stays unset in the result; the
//! rendering backend supplies its own fallback (see [`BackendDefaults`]).
//!
//! Because every field walks independently, a note can take `channel` from its track
//! while taking `velocity` from its innermost container.
//!
//! Named `other` parameters follow the same rule per name.
//!
//! ## Meter and Tempo
//! Bars resolve their meter and tempo the same way over two levels (bar, then track).
//! The track always has a concrete default meter; tempo falls back to [`DEFAULT_TEMPO`].
//!
//! ## Example
//! ```rust
//! use cadenza::{resolve, Note, PerformanceParams, SoundDescriptor};
//!
//! let track_params = PerformanceParams::new().with_channel(2);
//! let container_params = PerformanceParams::new().with_velocity(70);
//! let note = Note::new(SoundDescriptor::pitched("piano", 60))
//!     .with_params(PerformanceParams::new().with_velocity(90));
//!
//! let effective = resolve(&note, &[&container_params, &track_params]);
//! assert_eq!(effective.velocity, Some(90));
//! assert_eq!(effective.channel, Some(2));
//! assert_eq!(effective.bank, None);
//! ```

use serde::Serialize;
use std::collections::BTreeMap;
use std::iter;

use crate::model::{Bar, Element, Meter, Note, NotePath, PerformanceParams, Track};

/// Tempo in bpm when neither bar nor track sets one
pub const DEFAULT_TEMPO: f64 = 120.0;

/// Slot length in beats of a note whose duration is set nowhere
pub const DEFAULT_NOTE_DURATION: f64 = 1.0;

/// Parameters of a note after the outward walk
///
/// Same shape as [`PerformanceParams`]; `None` here means no scope set the field.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch_bend: Option<i16>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub other: BTreeMap<String, i32>,
}

impl EffectiveParams {
    /// Length of the note's slot in beats.
    pub fn duration_or_default(&self) -> f64 {
        self.duration.unwrap_or(DEFAULT_NOTE_DURATION)
    }

    /// Fill every field still unset with the backend's fallback.
    pub fn or_defaults(&self, defaults: &BackendDefaults) -> RenderParams {
        RenderParams {
            channel: self.channel.unwrap_or(defaults.channel),
            velocity: self.velocity.unwrap_or(defaults.velocity),
            bank: self.bank.unwrap_or(defaults.bank),
            pitch_bend: self.pitch_bend.unwrap_or(defaults.pitch_bend),
        }
    }
}

/// Fallbacks a rendering backend applies to fields no scope sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendDefaults {
    pub channel: u8,
    pub velocity: u8,
    pub bank: u16,
    pub pitch_bend: i16,
}

impl Default for BackendDefaults {
    fn default() -> Self {
        Self {
            channel: 0,
            velocity: 100,
            bank: 0,
            pitch_bend: 0,
        }
    }
}

/// Fully concrete parameters, ready for a synthesizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderParams {
    pub channel: u8,
    pub velocity: u8,
    pub bank: u16,
    pub pitch_bend: i16,
}

/// Resolve a note against its ancestors, innermost first.
///
/// The note's own parameters are consulted before any ancestor. Resolution is pure:
/// the same note and chain always give the same result.
pub fn resolve(note: &Note, ancestors: &[&PerformanceParams]) -> EffectiveParams {
    let chain: Vec<&PerformanceParams> = iter::once(&note.params)
        .chain(ancestors.iter().copied())
        .collect();
    resolve_chain(&chain)
}

/// Resolve a chain of scopes, innermost first.
pub fn resolve_chain(chain: &[&PerformanceParams]) -> EffectiveParams {
    EffectiveParams {
        duration: nearest(chain, |p| p.duration),
        velocity: nearest(chain, |p| p.velocity),
        channel: nearest(chain, |p| p.channel),
        bank: nearest(chain, |p| p.bank),
        pitch_bend: nearest(chain, |p| p.pitch_bend),
        // Outermost first, so inner scopes overwrite
        other: chain
            .iter()
            .rev()
            .flat_map(|params| params.other.iter())
            .map(|(name, value)| (name.clone(), *value))
            .collect(),
    }
}

fn nearest<T>(chain: &[&PerformanceParams], field: impl Fn(&PerformanceParams) -> Option<T>) -> Option<T> {
    chain.iter().find_map(|&params| field(params))
}

/// The bar's own meter, else the track's default.
pub fn resolve_meter(bar: &Bar, track: &Track) -> Meter {
    bar.meter.unwrap_or(track.default_meter)
}

/// The bar's own tempo, else the track's, else [`DEFAULT_TEMPO`].
pub fn resolve_tempo(bar: &Bar, track: &Track) -> f64 {
    bar.tempo.or(track.tempo).unwrap_or(DEFAULT_TEMPO)
}

/// Find the note at `path` together with its ancestor chain, innermost first.
pub fn find_note<'t>(track: &'t Track, path: &NotePath) -> Option<(&'t Note, Vec<&'t PerformanceParams>)> {
    let bar = track.bars.get(path.bar?)?;
    let mut chain = vec![&track.params, &bar.params];
    let mut elements = &bar.children;

    for &index in &path.containers {
        match elements.get(index)? {
            Element::Container(container) => {
                chain.push(&container.params);
                elements = &container.children;
            }
            Element::Note(_) => return None,
        }
    }

    match elements.get(path.note)? {
        Element::Note(note) => {
            chain.reverse();
            Some((note, chain))
        }
        Element::Container(_) => None,
    }
}

/// Effective parameters of the note at `path`, or `None` if no note lives there.
pub fn resolve_at(track: &Track, path: &NotePath) -> Option<EffectiveParams> {
    find_note(track, path).map(|(note, ancestors)| resolve(note, &ancestors))
}
