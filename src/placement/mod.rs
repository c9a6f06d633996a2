//! # Placement Module
//!
//! Turn a track into the flat, time-ordered event stream a rendering backend consumes.
//!
//! ## Purpose
//! This module resolves every note of a [`Track`](crate::Track) and pins it to absolute
//! time. The output is the crate's whole contract with the backend:
//! 1. **Note events** - sound, effective parameters, start and duration in beats and ms
//! 2. **Control events** - track-level controller changes (volume, pan, sustain, ...)
//! 3. **Bar timings** - where each bar starts, for backends that draw or split at bar lines
//!
//! ## Sub-modules
//! - `types` - PlayableEvent, ControlEvent, BarTiming, Performance, Cue
//! - `engine` - Bar timeline, note placement and controller placement
//!
//! ## Entry Points
//! - [`place()`] - Place every note of a track
//! - [`place_note()`] - Place a standalone note
//! - [`bar_timeline()`] - Start, length and tempo of each bar
//!
//! ## Example
//! ```rust
//! use cadenza::placement::place;
//! use cadenza::{Bar, Meter, Note, PerformanceParams, SoundDescriptor, Track};
//!
//! let note = Note::new(SoundDescriptor::pitched("cello", 48))
//!     .with_params(PerformanceParams::new().with_duration(2.0))
//!     .at(3.0);
//! let track = Track::new(Meter::new(4, 4))
//!     .with_bar(Bar::new().with(note))
//!     .with_bar(Bar::new());
//!
//! let events = place(&track);
//! assert_eq!(events.len(), 1);
//! assert_eq!(events[0].bar, Some(0));
//! assert_eq!(events[0].last_bar, Some(1)); // sustains into the second bar
//! ```
//!
//! ## Time
//! Beats are quarter notes. Milliseconds follow the tempo of the bar a note starts in;
//! a tempo change in a later bar does not stretch a note that sustains into it.
//!
//! ## Related Modules
//! - `resolve` - Parameter, meter and tempo resolution used for every note
//! - `validate` - Checks the placed events before they are handed to a backend
//! - `api` - Combines validation and placement into a [`Performance`]

mod engine;
mod types;


pub use engine::{bar_timeline, beats_to_ms, place, place_controls, place_note};
pub use types::{BarTiming, ControlEvent, Cue, Performance, PlayableEvent};
