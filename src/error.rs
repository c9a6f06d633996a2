//! # Error Types
//!
//! This module defines all error types for cadenza.
//!
//! Resolution and placement never fail; every variant here is produced either by the
//! validation pass or by loading a YAML track document. Note-level errors carry the
//! [`NotePath`] of the offending note, bar-level errors carry the bar index, so a caller
//! can report the problem or skip the note and keep going.
//!
//! ## Error Types
//! - `MissingSound` - Pitched instrument with no pitch
//! - `InvalidMeter` - Resolved meter with a zero component
//! - `InvalidTempo` - Resolved tempo that is not a positive number
//! - `UnresolvedRequiredParam` - Reserved for mandatory parameters
//! - `ParamOutOfRange` - Resolved value outside its MIDI range
//! - `NegativeStart` - Note placed before the start of the track, or at no finite time
//! - `ControlOutOfRange` - Controller change value above 127
//! - `ControlOutsideTrack` - Controller change before the start of the track
//! - `TrackError` - Any of the above, raised by one track of a composition
//! - `DocumentError` - Malformed YAML track document
//!
//! ## Usage
//! ```rust
//! use cadenza::{validate, ScoreError, Track};
//!
//! let track = Track::default();
//! match validate(&track) {
//!     Ok(()) => println!("ready to render"),
//!     Err(ScoreError::MissingSound { path, instrument }) => {
//!         eprintln!("{} needs a pitch for {}", path, instrument);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

use crate::model::{Meter, NotePath};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoreError {
    /// A pitched instrument reached full resolution without a pitch.
    ///
    /// # Example
    /// ```
    /// # use cadenza::{NotePath, ScoreError};
    /// let err = ScoreError::MissingSound {
    ///     path: NotePath::new(0, vec![1], 2),
    ///     instrument: "piano".to_string(),
    /// };
    /// assert_eq!(
    ///     err.to_string(),
    ///     "Missing sound at bar 1 > container 2 > note 3: instrument 'piano' is pitched but no pitch was given"
    /// );
    /// ```
    #[error("Missing sound at {path}: instrument '{instrument}' is pitched but no pitch was given")]
    MissingSound { path: NotePath, instrument: String },

    /// A bar resolved to a meter with a zero beat count or beat unit.
    ///
    /// # Example
    /// ```
    /// # use cadenza::{Meter, ScoreError};
    /// let err = ScoreError::InvalidMeter { bar: 3, meter: Meter::new(0, 4) };
    /// assert_eq!(err.to_string(), "Invalid meter at bar 4: 0/4 (both components must be positive)");
    /// ```
    #[error("Invalid meter at bar {}: {meter} (both components must be positive)", .bar + 1)]
    InvalidMeter { bar: usize, meter: Meter },

    /// A bar resolved to a tempo that is zero, negative or not finite.
    #[error("Invalid tempo at bar {}: {bpm} bpm", .bar + 1)]
    InvalidTempo { bar: usize, bpm: f64 },

    /// A mandatory parameter was not set anywhere in the ancestor chain.
    ///
    /// Every current performance parameter has a backend fallback, so nothing
    /// produces this yet.
    #[error("Unresolved required parameter '{param}' at {path}")]
    UnresolvedRequiredParam { path: NotePath, param: &'static str },

    /// A resolved value falls outside the range the rendering backend accepts.
    ///
    /// # Example
    /// ```
    /// # use cadenza::{NotePath, ScoreError};
    /// let err = ScoreError::ParamOutOfRange {
    ///     path: NotePath::standalone(),
    ///     param: "channel",
    ///     value: 16.0,
    ///     expected: "0..=15",
    /// };
    /// assert_eq!(err.to_string(), "Parameter 'channel' out of range at standalone note: 16 (expected 0..=15)");
    /// ```
    #[error("Parameter '{param}' out of range at {path}: {value} (expected {expected})")]
    ParamOutOfRange {
        path: NotePath,
        param: &'static str,
        value: f64,
        expected: &'static str,
    },

    /// A note's absolute start falls before the beginning of the track, or is not finite.
    #[error("Note at {path} starts outside the track: {start} beats")]
    NegativeStart { path: NotePath, start: f64 },

    /// A track-level controller change carries a value above 127.
    #[error("Control change {} out of range: {value} (expected 0..=127)", .control + 1)]
    ControlOutOfRange { control: usize, value: u8 },

    /// A track-level controller change sits at a negative or non-finite beat.
    ///
    /// # Example
    /// ```
    /// # use cadenza::ScoreError;
    /// let err = ScoreError::ControlOutsideTrack { control: 0, beat: -8.0 };
    /// assert_eq!(err.to_string(), "Control change 1 placed outside the track: beat -8");
    /// ```
    #[error("Control change {} placed outside the track: beat {beat}", .control + 1)]
    ControlOutsideTrack { control: usize, beat: f64 },

    /// An error raised while performing one track of a composition.
    #[error("Track {}: {source}", .track + 1)]
    TrackError {
        track: usize,
        #[source]
        source: Box<ScoreError>,
    },

    /// The YAML track document could not be read.
    ///
    /// # Example
    /// ```
    /// # use cadenza::ScoreError;
    /// let err = ScoreError::DocumentError("meter must be in format N/D".to_string());
    /// assert_eq!(err.to_string(), "Invalid track document: meter must be in format N/D");
    /// ```
    #[error("Invalid track document: {0}")]
    DocumentError(String),
}
