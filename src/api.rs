//! # Public API
//!
//! This module contains the main entry points for rendering a track.
//!
//! ## Rendering Functions
//!
//! - [`perform()`] - Validate and place a track built in code
//! - [`perform_source()`] - Load a YAML track document, then `perform()` it
//! - [`perform_unchecked()`] - Place without validating (useful for sketches)
//! - [`perform_composition()`] - Perform several tracks as one score
//!
//! ## Policies
//!
//! [`RenderPolicy::Strict`] fails on the first error. [`RenderPolicy::SkipInvalidNotes`]
//! drops notes with note-level errors (logging each at `warn`) and renders the rest;
//! bar-level errors change the timing of everything after them, so they still fail.
//!
//! ## Typical Usage
//!
//! ```rust
//! use cadenza::{perform_source, RenderPolicy};
//!
//! let source = r#"
//! tempo: 120
//! params: { channel: 2 }
//! bars:
//!   - children:
//!       - container:
//!           children:
//!             - note: { sound: { instrument: piano, pitch: 60 }, params: { velocity: 90 } }
//! "#;
//!
//! let performance = perform_source(source, RenderPolicy::Strict)?;
//! assert_eq!(performance.events[0].params.channel, Some(2));
//! assert_eq!(performance.events[0].params.velocity, Some(90));
//! # Ok::<(), cadenza::ScoreError>(())
//! ```

use log::{info, warn};
use std::collections::HashSet;

use crate::document::parse_track;
use crate::error::ScoreError;
use crate::model::{Composition, NotePath, Track};
use crate::placement::{bar_timeline, place, place_controls, BarTiming, Performance, PlayableEvent};
use crate::validate::{validate_bars, validate_controls, validate_event};

/// What to do with notes that fail validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderPolicy {
    /// Fail on the first error
    #[default]
    Strict,
    /// Drop offending notes and keep going
    SkipInvalidNotes,
}

/// Validate and place a track.
///
/// # Pipeline
/// 1. Check bar meters and tempos, and control values
/// 2. Place every note (resolving its parameters)
/// 3. Check each placed note
/// 4. Place control changes
///
/// # Errors
/// Returns the first [`ScoreError`] under [`RenderPolicy::Strict`], or the first bar-level
/// error under [`RenderPolicy::SkipInvalidNotes`].
pub fn perform(track: &Track, policy: RenderPolicy) -> Result<Performance, ScoreError> {
    if let Some(error) = validate_bars(track).into_iter().next() {
        return Err(error);
    }
    if let Some(error) = validate_controls(track).into_iter().next() {
        return Err(error);
    }

    let mut events = place(track);
    let mut skipped: HashSet<NotePath> = HashSet::new();

    for event in &events {
        for error in validate_event(event) {
            match policy {
                RenderPolicy::Strict => return Err(error),
                RenderPolicy::SkipInvalidNotes => {
                    warn!("skipping note: {}", error);
                    skipped.insert(event.path.clone());
                }
            }
        }
    }

    if !skipped.is_empty() {
        events.retain(|event| !skipped.contains(&event.path));
        info!("skipped {} invalid notes", skipped.len());
    }

    Ok(assemble(track, events))
}

/// Place a track without validating it.
///
/// Every note is emitted, including ones a backend may not be able to play.
pub fn perform_unchecked(track: &Track) -> Performance {
    assemble(track, place(track))
}

/// Load a YAML track document and perform it.
pub fn perform_source(source: &str, policy: RenderPolicy) -> Result<Performance, ScoreError> {
    let track = parse_track(source)?;
    perform(&track, policy)
}

/// Perform every track of a composition and merge them into one score.
///
/// A track that sets no channel of its own plays on channel `index + 1`: the first track
/// on channel 1, the second on channel 2. Each track keeps its own bars and tempo, so the
/// merged events and controls are ordered by milliseconds, ties kept in track order.
/// `bars` is the timeline of the track whose bars end last.
///
/// # Errors
/// The first failing track's error, wrapped in [`ScoreError::TrackError`].
pub fn perform_composition(composition: &Composition, policy: RenderPolicy) -> Result<Performance, ScoreError> {
    let mut merged = Performance {
        title: composition.title.clone(),
        bars: Vec::new(),
        events: Vec::new(),
        controls: Vec::new(),
    };

    for (index, track) in composition.tracks.iter().enumerate() {
        let track = on_default_channel(track, index);
        let performance = perform(&track, policy).map_err(|error| ScoreError::TrackError {
            track: index,
            source: Box::new(error),
        })?;

        if bars_end_ms(&performance) > bars_end_ms(&merged) {
            merged.bars = performance.bars;
        }
        merged.events.extend(performance.events.into_iter().map(|mut event| {
            event.track = Some(index);
            event
        }));
        merged.controls.extend(performance.controls.into_iter().map(|mut control| {
            control.track = Some(index);
            control
        }));
    }

    merged.events.sort_by(|a, b| a.start_ms.total_cmp(&b.start_ms));
    merged.controls.sort_by(|a, b| a.start_ms.total_cmp(&b.start_ms));

    info!(
        "merged {} tracks into {} events",
        composition.tracks.len(),
        merged.events.len()
    );
    Ok(merged)
}

fn on_default_channel(track: &Track, index: usize) -> Track {
    let mut track = track.clone();
    if track.params.channel.is_none() {
        // Anything past channel 15 is reported by validation
        track.params.channel = Some(u8::try_from(index + 1).unwrap_or(u8::MAX));
    }
    track
}

fn bars_end_ms(performance: &Performance) -> f64 {
    performance.bars.last().map(BarTiming::end_ms).unwrap_or(0.0)
}

fn assemble(track: &Track, events: Vec<PlayableEvent>) -> Performance {
    let bars = bar_timeline(track);
    let controls = place_controls(track, &bars);
    Performance {
        title: track.title.clone(),
        bars,
        events,
        controls,
    }
}
