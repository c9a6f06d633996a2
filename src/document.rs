//! # Track Documents
//!
//! Load a [`Track`] from a YAML document.
//!
//! ## Format
//! ```yaml
//! title: Waltz
//! meter: 3/4          # default meter, "N/D" (default 4/4)
//! tempo: 96           # bpm (default 120)
//! params:             # outermost parameter scope
//!   channel: 2
//! controls:
//!   - { beat: 0, control: volume, value: 100 }
//! repeat: 1           # play the bars twice
//! bars:
//!   - params: { velocity: 80 }
//!     children:
//!       - container:
//!           arrangement: chord      # or "sequence" (default)
//!           params: { duration: 3 }
//!           children:
//!             - note: { sound: { instrument: piano, pitch: C-3 } }
//!             - note: { sound: { instrument: piano, pitch: 55 } }
//!   - meter: 4/4
//!     tempo: 110
//!     children:
//!       - note: { sound: { instrument: snare }, offset: 1.5 }
//! ```
//!
//! Parameter keys are `duration`, `velocity`, `channel`, `bank`, `pitch-bend` and `other`
//! (a map of named integer parameters). Pitches are MIDI numbers or names such as `C-4`.
//! An instrument is percussion when `percussion: true` is given, or when `percussion` is
//! left out and the name is a General MIDI drum name.
//!
//! Unknown keys are rejected so that typos do not silently drop a parameter.

use log::debug;
use serde::Deserialize;

use crate::error::ScoreError;
use crate::model::{
    Arrangement, Bar, ControlChange, Element, InstrumentId, Meter, MidiControl, Note, NoteContainer,
    PerformanceParams, SoundDescriptor, Track,
};
use crate::pitch::parse_pitch_name;

/// Most bars a document may unroll to with `repeat`
pub const MAX_DOCUMENT_BARS: usize = 100_000;

/// Raw track for YAML deserialization
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RawTrack {
    pub title: Option<String>,
    pub meter: Option<String>,
    pub tempo: Option<f64>,
    #[serde(default)]
    pub params: PerformanceParams,
    #[serde(default)]
    pub controls: Vec<RawControl>,
    pub repeat: Option<usize>,
    #[serde(default)]
    pub bars: Vec<RawBar>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RawBar {
    pub meter: Option<String>,
    pub tempo: Option<f64>,
    #[serde(default)]
    pub params: PerformanceParams,
    #[serde(default)]
    pub children: Vec<RawElement>,
}

/// A child entry: exactly one of `note` or `container`
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RawElement {
    pub note: Option<RawNote>,
    pub container: Option<RawContainer>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RawNote {
    pub sound: RawSound,
    #[serde(default)]
    pub params: PerformanceParams,
    pub offset: Option<f64>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RawSound {
    pub instrument: String,
    pub pitch: Option<RawPitch>,
    pub percussion: Option<bool>,
}

/// A pitch written as a MIDI number or a name
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum RawPitch {
    Number(i64),
    Name(String),
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RawContainer {
    pub arrangement: Option<String>,
    #[serde(default)]
    pub params: PerformanceParams,
    #[serde(default)]
    pub children: Vec<RawElement>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RawControl {
    pub beat: f64,
    pub control: String,
    pub value: i64,
}

/// Parse a YAML track document
///
/// # Example
/// ```rust
/// use cadenza::document::parse_track;
///
/// let track = parse_track(r#"
/// meter: 3/4
/// params: { channel: 2 }
/// bars:
///   - children:
///       - note: { sound: { instrument: piano, pitch: C-4 }, params: { velocity: 90 } }
/// "#)?;
///
/// assert_eq!(track.default_meter.beats_per_bar, 3);
/// assert_eq!(track.params.channel, Some(2));
/// assert_eq!(track.bars.len(), 1);
/// # Ok::<(), cadenza::ScoreError>(())
/// ```
pub fn parse_track(source: &str) -> Result<Track, ScoreError> {
    let raw: RawTrack = serde_yaml::from_str(source).map_err(|e| ScoreError::DocumentError(e.to_string()))?;
    build_track(raw)
}

fn build_track(raw: RawTrack) -> Result<Track, ScoreError> {
    let default_meter = match &raw.meter {
        Some(meter) => parse_meter(meter, "track")?,
        None => Meter::default(),
    };

    let controls = raw
        .controls
        .iter()
        .enumerate()
        .map(|(index, control)| build_control(control, index))
        .collect::<Result<Vec<_>, _>>()?;

    let bars = raw
        .bars
        .into_iter()
        .enumerate()
        .map(|(index, bar)| build_bar(bar, index))
        .collect::<Result<Vec<_>, _>>()?;

    let track = Track {
        title: raw.title,
        bars,
        default_meter,
        tempo: raw.tempo,
        params: raw.params,
        controls,
    };

    match raw.repeat {
        Some(repetitions) => repeat_track(&track, repetitions),
        None => Ok(track),
    }
}

fn repeat_track(track: &Track, repetitions: usize) -> Result<Track, ScoreError> {
    let too_long = || {
        ScoreError::DocumentError(format!(
            "repeat: {} repetitions of {} bars exceed the limit of {} bars",
            repetitions,
            track.bars.len(),
            MAX_DOCUMENT_BARS
        ))
    };

    let count = repetitions
        .checked_add(1)
        .and_then(|plays| plays.checked_mul(track.bars.len()))
        .filter(|count| *count <= MAX_DOCUMENT_BARS)
        .ok_or_else(too_long)?;
    debug!("repeat unrolls {} bars into {}", track.bars.len(), count);

    track.repeated(repetitions).ok_or_else(too_long)
}

fn build_bar(raw: RawBar, index: usize) -> Result<Bar, ScoreError> {
    let context = format!("bar {}", index + 1);
    let meter = match &raw.meter {
        Some(meter) => Some(parse_meter(meter, &context)?),
        None => None,
    };

    Ok(Bar {
        children: build_children(raw.children, &context)?,
        meter,
        tempo: raw.tempo,
        params: raw.params,
    })
}

fn build_children(raw: Vec<RawElement>, context: &str) -> Result<Vec<Element>, ScoreError> {
    raw.into_iter()
        .enumerate()
        .map(|(index, element)| build_element(element, &format!("{}, child {}", context, index + 1)))
        .collect()
}

fn build_element(raw: RawElement, context: &str) -> Result<Element, ScoreError> {
    match (raw.note, raw.container) {
        (Some(note), None) => Ok(Element::Note(build_note(note, context)?)),
        (None, Some(container)) => Ok(Element::Container(build_container(container, context)?)),
        _ => Err(ScoreError::DocumentError(format!(
            "{}: a child must have exactly one of 'note' or 'container'",
            context
        ))),
    }
}

fn build_container(raw: RawContainer, context: &str) -> Result<NoteContainer, ScoreError> {
    let arrangement = match raw.arrangement.as_deref().map(str::trim) {
        None | Some("sequence") => Arrangement::Sequence,
        Some("chord") => Arrangement::Chord,
        Some(other) => {
            return Err(ScoreError::DocumentError(format!(
                "{}: unknown arrangement '{}' (expected 'sequence' or 'chord')",
                context, other
            )))
        }
    };

    Ok(NoteContainer {
        children: build_children(raw.children, context)?,
        params: raw.params,
        arrangement,
    })
}

fn build_note(raw: RawNote, context: &str) -> Result<Note, ScoreError> {
    let instrument = match raw.sound.percussion {
        Some(true) => InstrumentId::percussion(raw.sound.instrument),
        Some(false) => InstrumentId::pitched(raw.sound.instrument),
        None => InstrumentId::from_name(raw.sound.instrument),
    };

    let pitch = match &raw.sound.pitch {
        None => None,
        Some(RawPitch::Number(number)) => Some(u8::try_from(*number).ok().filter(|p| *p <= 127).ok_or_else(|| {
            ScoreError::DocumentError(format!("{}: pitch {} is outside 0..=127", context, number))
        })?),
        Some(RawPitch::Name(name)) => Some(parse_pitch_name(name).ok_or_else(|| {
            ScoreError::DocumentError(format!("{}: invalid pitch name '{}'", context, name))
        })?),
    };

    Ok(Note {
        sound: SoundDescriptor::new(instrument, pitch),
        params: raw.params,
        start_offset: raw.offset,
    })
}

fn build_control(raw: &RawControl, index: usize) -> Result<ControlChange, ScoreError> {
    let control = MidiControl::from_str(&raw.control).ok_or_else(|| {
        ScoreError::DocumentError(format!("control {}: unknown controller '{}'", index + 1, raw.control))
    })?;
    let value = u8::try_from(raw.value)
        .ok()
        .filter(|v| *v <= 127)
        .ok_or_else(|| ScoreError::DocumentError(format!("control {}: value {} is outside 0..=127", index + 1, raw.value)))?;

    Ok(ControlChange {
        beat: raw.beat,
        control,
        value,
    })
}

fn parse_meter(s: &str, context: &str) -> Result<Meter, ScoreError> {
    Meter::from_str(s).ok_or_else(|| {
        ScoreError::DocumentError(format!("{}: invalid meter '{}' (expected N/D, e.g. 4/4)", context, s))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InstrumentFamily;

    #[test]
    fn test_minimal_document() {
        let track = parse_track("bars: []").unwrap();
        assert_eq!(track.default_meter, Meter::new(4, 4));
        assert_eq!(track.tempo, None);
        assert!(track.bars.is_empty());
    }

    #[test]
    fn test_full_document() {
        let source = r#"
title: Waltz
meter: 3/4
tempo: 96
params: { channel: 2, bank: 1 }
bars:
  - params: { velocity: 80 }
    children:
      - container:
          arrangement: chord
          params: { duration: 3, pitch-bend: -200, other: { reverb: 40 } }
          children:
            - note: { sound: { instrument: piano, pitch: C-3 } }
            - note: { sound: { instrument: piano, pitch: 55 } }
  - meter: 4/4
    tempo: 110
    children:
      - note: { sound: { instrument: snare }, offset: 1.5 }
"#;
        let track = parse_track(source).unwrap();

        assert_eq!(track.title.as_deref(), Some("Waltz"));
        assert_eq!(track.default_meter, Meter::new(3, 4));
        assert_eq!(track.tempo, Some(96.0));
        assert_eq!(track.params.bank, Some(1));
        assert_eq!(track.bars.len(), 2);

        let Element::Container(chord) = &track.bars[0].children[0] else {
            panic!("Expected a container");
        };
        assert_eq!(chord.arrangement, Arrangement::Chord);
        assert_eq!(chord.params.duration, Some(3.0));
        assert_eq!(chord.params.pitch_bend, Some(-200));
        assert_eq!(chord.params.other.get("reverb"), Some(&40));
        assert_eq!(chord.children.len(), 2);

        let Element::Note(snare) = &track.bars[1].children[0] else {
            panic!("Expected a note");
        };
        assert_eq!(snare.sound.instrument.family, InstrumentFamily::Percussion);
        assert_eq!(snare.sound.pitch, None);
        assert_eq!(snare.start_offset, Some(1.5));
        assert_eq!(track.bars[1].meter, Some(Meter::new(4, 4)));
        assert_eq!(track.bars[1].tempo, Some(110.0));
    }

    #[test]
    fn test_explicit_percussion_flag() {
        let source = r#"
bars:
  - children:
      - note: { sound: { instrument: tabla, percussion: true } }
      - note: { sound: { instrument: snare, percussion: false, pitch: 60 } }
"#;
        let track = parse_track(source).unwrap();
        let families: Vec<InstrumentFamily> = track.bars[0]
            .children
            .iter()
            .filter_map(|element| match element {
                Element::Note(note) => Some(note.sound.instrument.family),
                Element::Container(_) => None,
            })
            .collect();
        assert_eq!(families, vec![InstrumentFamily::Percussion, InstrumentFamily::Pitched]);
    }

    #[test]
    fn test_repeat_and_controls() {
        let source = r#"
repeat: 2
controls:
  - { beat: 0, control: volume, value: 100 }
  - { beat: 4, control: "64", value: 127 }
bars:
  - children: []
"#;
        let track = parse_track(source).unwrap();
        assert_eq!(track.bars.len(), 3);
        assert_eq!(track.controls.len(), 2);
        assert_eq!(track.controls[1].control, MidiControl::Sustain);
    }

    #[test]
    fn test_repeat_limit() {
        let result = parse_track("repeat: 18446744073709551615\nbars:\n  - children: []");
        assert!(matches!(result, Err(ScoreError::DocumentError(ref message)) if message.contains("repeat")));

        let result = parse_track("repeat: 1000000\nbars:\n  - children: []");
        assert!(matches!(result, Err(ScoreError::DocumentError(ref message)) if message.contains("limit")));

        // Nothing to repeat
        let track = parse_track("repeat: 18446744073709551614\nbars: []").unwrap();
        assert!(track.bars.is_empty());
    }

    #[test]
    fn test_invalid_meter() {
        let result = parse_track("meter: four-four");
        assert!(matches!(result, Err(ScoreError::DocumentError(ref message)) if message.contains("invalid meter")));
    }

    #[test]
    fn test_invalid_pitch() {
        let result = parse_track("bars:\n  - children:\n      - note: { sound: { instrument: piano, pitch: H-4 } }");
        assert!(matches!(result, Err(ScoreError::DocumentError(ref message)) if message.contains("bar 1, child 1")));

        let result = parse_track("bars:\n  - children:\n      - note: { sound: { instrument: piano, pitch: 300 } }");
        assert!(matches!(result, Err(ScoreError::DocumentError(ref message)) if message.contains("outside 0..=127")));
    }

    #[test]
    fn test_child_must_be_note_or_container() {
        let result = parse_track("bars:\n  - children:\n      - {}");
        assert!(matches!(result, Err(ScoreError::DocumentError(ref message)) if message.contains("exactly one")));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(parse_track("bars:\n  - params: { velocty: 80 }").is_err());
        assert!(parse_track("tempo: 120\nswing: eighth").is_err());
    }

    #[test]
    fn test_unknown_arrangement_and_control() {
        let result = parse_track("bars:\n  - children:\n      - container: { arrangement: arpeggio }");
        assert!(matches!(result, Err(ScoreError::DocumentError(ref message)) if message.contains("arpeggio")));

        let result = parse_track("controls:\n  - { beat: 0, control: whammy, value: 1 }");
        assert!(matches!(result, Err(ScoreError::DocumentError(ref message)) if message.contains("whammy")));
    }
}
