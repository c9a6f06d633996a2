//! # Validation Module
//!
//! This module checks that a track can actually be rendered.
//!
//! ## Purpose
//! Resolution and placement are total: a missing value is simply left unset. Whether the
//! result is playable is decided here, after placement, so every check sees the fully
//! resolved note. Errors name the offending note by its path (or the offending bar), and
//! a caller may report them, or skip the offending note and render the rest.
//!
//! ## Validation Rules
//!
//! ### Bars
//! - The resolved meter must have a positive beat count and beat unit
//! - The resolved tempo must be a positive, finite bpm
//!
//! ### Notes
//! - A pitched instrument needs a pitch; percussion may omit it
//! - Pitch and velocity in 0..=127, channel in 0..=15, bank in 0..=16383,
//!   pitch bend in -8192..=8191
//! - A resolved duration must be positive and finite
//! - The absolute start must be finite and not fall before the start of the track
//!
//! ### Controls
//! - Controller values in 0..=127
//! - The beat must be finite and not fall before the start of the track
//!
//! ## Entry Points
//! - `validate(track)` - first error, if any
//! - `diagnose(track)` - every error, bars first, then notes in placement order
//!
//! ## Example
//! ```rust
//! use cadenza::{validate, Bar, Note, SoundDescriptor, Track};
//!
//! let track = Track::default().with_bar(
//!     Bar::new()
//!         .with(Note::new(SoundDescriptor::percussion("snare")))
//!         .with(Note::new(SoundDescriptor::pitched("piano", 60))),
//! );
//! assert!(validate(&track).is_ok());
//! ```

use crate::error::ScoreError;
use crate::model::{Note, NotePath, Track};
use crate::placement::{bar_timeline, place, place_note, PlayableEvent};

const MIDI_MAX: u8 = 127;
const CHANNEL_MAX: u8 = 15;
const BANK_MAX: u16 = 16383;
const PITCH_BEND_MIN: i16 = -8192;
const PITCH_BEND_MAX: i16 = 8191;

/// Validate a track, stopping at the first error
pub fn validate(track: &Track) -> Result<(), ScoreError> {
    match diagnose(track).into_iter().next() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// Collect every error in the track
pub fn diagnose(track: &Track) -> Vec<ScoreError> {
    let mut errors = validate_bars(track);
    for event in place(track) {
        errors.extend(validate_event(&event));
    }
    errors.extend(validate_controls(track));
    errors
}

/// Validate a note used outside any container
pub fn validate_note(note: &Note) -> Result<(), ScoreError> {
    match validate_event(&place_note(note)).into_iter().next() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// Check that every bar resolves to a usable meter and tempo
pub(crate) fn validate_bars(track: &Track) -> Vec<ScoreError> {
    let mut errors = Vec::new();

    for timing in bar_timeline(track) {
        if !timing.meter.is_valid() {
            errors.push(ScoreError::InvalidMeter {
                bar: timing.index,
                meter: timing.meter,
            });
        }
        if !(timing.tempo.is_finite() && timing.tempo > 0.0) {
            errors.push(ScoreError::InvalidTempo {
                bar: timing.index,
                bpm: timing.tempo,
            });
        }
    }

    errors
}

/// Check a placed note against what a MIDI-style backend can play
pub fn validate_event(event: &PlayableEvent) -> Vec<ScoreError> {
    let mut errors = Vec::new();
    let path = &event.path;

    match event.sound.pitch {
        None if !event.sound.instrument.is_percussion() => {
            errors.push(ScoreError::MissingSound {
                path: path.clone(),
                instrument: event.sound.instrument.name.clone(),
            });
        }
        Some(pitch) if pitch > MIDI_MAX => {
            errors.push(out_of_range(path, "pitch", pitch as f64, "0..=127"));
        }
        _ => {}
    }

    let params = &event.params;
    if let Some(velocity) = params.velocity.filter(|v| *v > MIDI_MAX) {
        errors.push(out_of_range(path, "velocity", velocity as f64, "0..=127"));
    }
    if let Some(channel) = params.channel.filter(|c| *c > CHANNEL_MAX) {
        errors.push(out_of_range(path, "channel", channel as f64, "0..=15"));
    }
    if let Some(bank) = params.bank.filter(|b| *b > BANK_MAX) {
        errors.push(out_of_range(path, "bank", bank as f64, "0..=16383"));
    }
    if let Some(bend) = params.pitch_bend.filter(|b| !(PITCH_BEND_MIN..=PITCH_BEND_MAX).contains(b)) {
        errors.push(out_of_range(path, "pitch-bend", bend as f64, "-8192..=8191"));
    }
    if let Some(duration) = params.duration.filter(|d| !(d.is_finite() && *d > 0.0)) {
        errors.push(out_of_range(path, "duration", duration, "a positive number of beats"));
    }

    if !event.start.is_finite() || event.start < 0.0 {
        errors.push(ScoreError::NegativeStart {
            path: path.clone(),
            start: event.start,
        });
    }

    errors
}

pub(crate) fn validate_controls(track: &Track) -> Vec<ScoreError> {
    let mut errors = Vec::new();

    for (index, change) in track.controls.iter().enumerate() {
        if !change.beat.is_finite() || change.beat < 0.0 {
            errors.push(ScoreError::ControlOutsideTrack {
                control: index,
                beat: change.beat,
            });
        }
        if change.value > MIDI_MAX {
            errors.push(ScoreError::ControlOutOfRange {
                control: index,
                value: change.value,
            });
        }
    }

    errors
}

fn out_of_range(path: &NotePath, param: &'static str, value: f64, expected: &'static str) -> ScoreError {
    ScoreError::ParamOutOfRange {
        path: path.clone(),
        param,
        value,
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bar, Meter, MidiControl, NoteContainer, PerformanceParams, SoundDescriptor};

    fn piano(pitch: u8) -> Note {
        Note::new(SoundDescriptor::pitched("piano", pitch))
    }

    #[test]
    fn test_percussion_without_pitch_is_valid() {
        let snare = Note::new(SoundDescriptor::new(crate::InstrumentId::from_name("snare"), None));
        assert!(validate_note(&snare).is_ok());
    }

    #[test]
    fn test_pitched_without_pitch_is_missing_sound() {
        let note = Note::new(SoundDescriptor::new(crate::InstrumentId::from_name("piano"), None));
        let result = validate_note(&note);
        assert!(matches!(result, Err(ScoreError::MissingSound { ref instrument, .. }) if instrument == "piano"));
    }

    #[test]
    fn test_missing_sound_reports_path() {
        let track = Track::default().with_bar(Bar::new()).with_bar(
            Bar::new().with(
                NoteContainer::new()
                    .with(piano(60))
                    .with(Note::new(SoundDescriptor::new(crate::InstrumentId::pitched("organ"), None))),
            ),
        );

        let result = validate(&track);
        if let Err(ScoreError::MissingSound { path, .. }) = &result {
            assert_eq!(*path, NotePath::new(1, vec![0], 1));
        } else {
            panic!("Expected MissingSound but got: {:?}", result);
        }
    }

    #[test]
    fn test_invalid_meter_on_bar() {
        let track = Track::default()
            .with_bar(Bar::new())
            .with_bar(Bar::new().with_meter(Meter::new(3, 0)));

        let errors = diagnose(&track);
        assert_eq!(
            errors,
            vec![ScoreError::InvalidMeter {
                bar: 1,
                meter: Meter::new(3, 0)
            }]
        );
    }

    #[test]
    fn test_invalid_default_meter_hits_every_bar() {
        let track = Track::new(Meter::new(0, 4)).with_bar(Bar::new()).with_bar(Bar::new());
        assert_eq!(diagnose(&track).len(), 2);
    }

    #[test]
    fn test_invalid_tempo() {
        let track = Track::default().with_bar(Bar::new().with_tempo(0.0));
        let result = validate(&track);
        assert!(matches!(result, Err(ScoreError::InvalidTempo { bar: 0, .. })));
    }

    #[test]
    fn test_inherited_channel_out_of_range() {
        let track = Track::default()
            .with_params(PerformanceParams::new().with_channel(16))
            .with_bar(Bar::new().with(piano(60)));

        let result = validate(&track);
        if let Err(ScoreError::ParamOutOfRange { param, path, .. }) = &result {
            assert_eq!(*param, "channel");
            assert_eq!(*path, NotePath::new(0, vec![], 0));
        } else {
            panic!("Expected ParamOutOfRange but got: {:?}", result);
        }
    }

    #[test]
    fn test_ranges() {
        let cases = [
            (PerformanceParams::new().with_velocity(128), "velocity"),
            (PerformanceParams::new().with_bank(16384), "bank"),
            (PerformanceParams::new().with_pitch_bend(8192), "pitch-bend"),
            (PerformanceParams::new().with_pitch_bend(-8193), "pitch-bend"),
            (PerformanceParams::new().with_duration(0.0), "duration"),
            (PerformanceParams::new().with_duration(f64::NAN), "duration"),
        ];

        for (params, expected) in cases {
            let result = validate_note(&piano(60).with_params(params));
            assert!(
                matches!(result, Err(ScoreError::ParamOutOfRange { param, .. }) if param == expected),
                "Expected {} to be out of range",
                expected
            );
        }

        assert!(validate_note(&piano(128)).is_err());
        assert!(validate_note(&piano(127).with_params(PerformanceParams::new().with_pitch_bend(-8192))).is_ok());
    }

    #[test]
    fn test_negative_start() {
        // A pickup into the first bar lands before the track starts
        let track = Track::default().with_bar(Bar::new().with(piano(60).at(-1.0)));
        assert!(matches!(validate(&track), Err(ScoreError::NegativeStart { .. })));

        // The same pickup in a later bar is fine
        let track = Track::default()
            .with_bar(Bar::new())
            .with_bar(Bar::new().with(piano(60).at(-1.0)));
        assert!(validate(&track).is_ok());
    }

    #[test]
    fn test_infinite_start() {
        let track = Track::default().with_bar(Bar::new().with(piano(60).at(f64::INFINITY)).with(piano(62)));

        // The following note resumes after the infinite one, so it is rejected as well
        let errors = diagnose(&track);
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|error| matches!(error, ScoreError::NegativeStart { start, .. } if start.is_infinite())));
    }

    #[test]
    fn test_control_beat_outside_track() {
        let track = Track::default()
            .with_control(-8.0, MidiControl::Volume, 100)
            .with_control(f64::NAN, MidiControl::Pan, 64)
            .with_control(0.0, MidiControl::Sustain, 127);

        let errors = diagnose(&track);
        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors[0],
            ScoreError::ControlOutsideTrack {
                control: 0,
                beat: -8.0
            }
        );
        assert!(matches!(errors[1], ScoreError::ControlOutsideTrack { control: 1, .. }));
    }

    #[test]
    fn test_control_value_range() {
        let track = Track::default()
            .with_control(0.0, MidiControl::Volume, 100)
            .with_control(2.0, MidiControl::Pan, 200);

        assert_eq!(
            diagnose(&track),
            vec![ScoreError::ControlOutOfRange { control: 1, value: 200 }]
        );
    }

    #[test]
    fn test_diagnose_collects_everything() {
        let track = Track::default().with_bar(
            Bar::new()
                .with_tempo(-5.0)
                .with(Note::new(SoundDescriptor::new(crate::InstrumentId::pitched("flute"), None)))
                .with(piano(60).with_params(PerformanceParams::new().with_velocity(200))),
        );

        let errors = diagnose(&track);
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[0], ScoreError::InvalidTempo { .. }));
        assert!(matches!(errors[1], ScoreError::MissingSound { .. }));
        assert!(matches!(errors[2], ScoreError::ParamOutOfRange { param: "velocity", .. }));
    }
}
