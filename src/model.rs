//! # Composition Model
//!
//! This module defines the container hierarchy a caller builds before rendering.
//!
//! ## Type Hierarchy
//! ```text
//! Track
//!   ├── default_meter: Meter (always concrete)
//!   ├── tempo: Option<f64> (bpm)
//!   ├── params: PerformanceParams
//!   ├── controls: Vec<ControlChange>
//!   └── Vec<Bar>
//!         ├── meter: Option<Meter> (falls back to the track)
//!         ├── tempo: Option<f64>
//!         ├── params: PerformanceParams
//!         └── Vec<Element>
//!
//! Element (enum)
//!   ├── Note
//!   │     ├── sound: SoundDescriptor (instrument + optional pitch, never inherited)
//!   │     ├── params: PerformanceParams
//!   │     └── start_offset: Option<f64> (beats from the bar start)
//!   └── Container (NoteContainer)
//!         ├── arrangement: Sequence | Chord
//!         ├── params: PerformanceParams
//!         └── Vec<Element> (nests arbitrarily deep)
//! ```
//!
//! ## Key Concepts
//!
//! ### Performance Parameters
//! Every field of [`PerformanceParams`] is independently optional. An unset field means
//! "defer to the enclosing scope"; the `resolve` module walks outward to find the value.
//!
//! ### Ownership
//! The composition is a strict tree. Each entity is owned by exactly one parent, and a
//! [`Note`] can also be used standalone. Identity is positional: a note is addressed by
//! its [`NotePath`] rather than by an id.
//!
//! ### Beats
//! All times are measured in quarter-note beats. A bar's length in beats comes from its
//! meter (see [`Meter::length_in_beats`]).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::pitch;

/// Time signature (e.g., 4/4, 3/4, 6/8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meter {
    pub beats_per_bar: u32,
    pub beat_unit: u32,
}

impl Meter {
    pub fn new(beats_per_bar: u32, beat_unit: u32) -> Self {
        Self {
            beats_per_bar,
            beat_unit,
        }
    }

    /// Parse a meter written as "N/D", e.g. "4/4" or "6/8".
    pub fn from_str(s: &str) -> Option<Self> {
        let (beats, unit) = s.trim().split_once('/')?;
        let beats_per_bar = beats.trim().parse().ok()?;
        let beat_unit = unit.trim().parse().ok()?;
        Some(Self::new(beats_per_bar, beat_unit))
    }

    pub fn is_valid(&self) -> bool {
        self.beats_per_bar > 0 && self.beat_unit > 0
    }

    /// Length of one bar in quarter-note beats.
    ///
    /// 4/4 = 4 beats, 3/4 = 3 beats, 6/8 = 3 beats. An invalid meter has no length.
    pub fn length_in_beats(&self) -> f64 {
        if self.beat_unit == 0 {
            return 0.0;
        }
        self.beats_per_bar as f64 * 4.0 / self.beat_unit as f64
    }
}

impl Default for Meter {
    fn default() -> Self {
        Self::new(4, 4)
    }
}

impl fmt::Display for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.beats_per_bar, self.beat_unit)
    }
}

/// Whether an instrument needs a pitch to be playable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentFamily {
    #[default]
    Pitched,
    Percussion,
}

/// Instrument identifier handed to the rendering backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct InstrumentId {
    pub name: String,
    pub family: InstrumentFamily,
}

impl InstrumentId {
    pub fn pitched(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            family: InstrumentFamily::Pitched,
        }
    }

    pub fn percussion(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            family: InstrumentFamily::Percussion,
        }
    }

    /// Classify by name: General MIDI drum names are percussion, anything else is pitched.
    pub fn from_name(name: impl Into<String>) -> Self {
        let name = name.into();
        if pitch::percussion_key(&name).is_some() {
            Self::percussion(name)
        } else {
            Self::pitched(name)
        }
    }

    pub fn is_percussion(&self) -> bool {
        self.family == InstrumentFamily::Percussion
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// What to play: an instrument and, for pitched instruments, a MIDI pitch.
///
/// Sound descriptors are never inherited; every note carries its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SoundDescriptor {
    pub instrument: InstrumentId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch: Option<u8>,
}

impl SoundDescriptor {
    pub fn new(instrument: InstrumentId, pitch: Option<u8>) -> Self {
        Self { instrument, pitch }
    }

    pub fn pitched(instrument: impl Into<String>, pitch: u8) -> Self {
        Self::new(InstrumentId::pitched(instrument), Some(pitch))
    }

    pub fn percussion(instrument: impl Into<String>) -> Self {
        Self::new(InstrumentId::percussion(instrument), None)
    }
}

/// Sparse performance parameters. `None` means "inherit from the enclosing scope".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct PerformanceParams {
    /// Length in beats
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
    /// Open-ended parameters, each inherited independently by name
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub other: BTreeMap<String, i32>,
}

impl PerformanceParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration(mut self, beats: f64) -> Self {
        self.duration = Some(beats);
        self
    }

    pub fn with_velocity(mut self, velocity: u8) -> Self {
        self.velocity = Some(velocity);
        self
    }

    pub fn with_channel(mut self, channel: u8) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn with_bank(mut self, bank: u16) -> Self {
        self.bank = Some(bank);
        self
    }

    pub fn with_pitch_bend(mut self, bend: i16) -> Self {
        self.pitch_bend = Some(bend);
        self
    }

    pub fn with_other(mut self, name: impl Into<String>, value: i32) -> Self {
        self.other.insert(name.into(), value);
        self
    }
}

/// The atomic playable unit
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub sound: SoundDescriptor,
    pub params: PerformanceParams,
    /// Explicit start in beats from the owning bar's start
    pub start_offset: Option<f64>,
}

impl Note {
    pub fn new(sound: SoundDescriptor) -> Self {
        Self {
            sound,
            params: PerformanceParams::default(),
            start_offset: None,
        }
    }

    pub fn with_params(mut self, params: PerformanceParams) -> Self {
        self.params = params;
        self
    }

    /// Pin the note to `offset` beats after its bar starts.
    pub fn at(mut self, offset: f64) -> Self {
        self.start_offset = Some(offset);
        self
    }
}

/// How a container lays out its children in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Arrangement {
    /// Children follow one another
    #[default]
    Sequence,
    /// Children all start together
    Chord,
}

/// Either a note or a nested container
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Note(Note),
    Container(NoteContainer),
}

impl From<Note> for Element {
    fn from(note: Note) -> Self {
        Element::Note(note)
    }
}

impl From<NoteContainer> for Element {
    fn from(container: NoteContainer) -> Self {
        Element::Container(container)
    }
}

/// An ordered group of notes and containers sharing a parameter scope
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NoteContainer {
    pub children: Vec<Element>,
    pub params: PerformanceParams,
    pub arrangement: Arrangement,
}

impl NoteContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A container whose children sound together.
    pub fn chord() -> Self {
        Self {
            arrangement: Arrangement::Chord,
            ..Self::default()
        }
    }

    pub fn with(mut self, element: impl Into<Element>) -> Self {
        self.children.push(element.into());
        self
    }

    pub fn with_params(mut self, params: PerformanceParams) -> Self {
        self.params = params;
        self
    }
}

/// A span of time bounded by a meter
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bar {
    pub children: Vec<Element>,
    pub meter: Option<Meter>,
    /// Tempo in bpm; falls back to the track
    pub tempo: Option<f64>,
    pub params: PerformanceParams,
}

impl Bar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, element: impl Into<Element>) -> Self {
        self.children.push(element.into());
        self
    }

    pub fn with_meter(mut self, meter: Meter) -> Self {
        self.meter = Some(meter);
        self
    }

    pub fn with_tempo(mut self, bpm: f64) -> Self {
        self.tempo = Some(bpm);
        self
    }

    pub fn with_params(mut self, params: PerformanceParams) -> Self {
        self.params = params;
        self
    }
}

/// MIDI continuous controllers a track can change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MidiControl {
    Vibrato,
    Volume,
    /// Left to right
    Pan,
    /// Soft to loud
    Expression,
    Sustain,
    Reverb,
    Chorus,
}

impl MidiControl {
    /// Controller number
    pub fn number(&self) -> u8 {
        match self {
            MidiControl::Vibrato => 1,
            MidiControl::Volume => 7,
            MidiControl::Pan => 10,
            MidiControl::Expression => 11,
            MidiControl::Sustain => 64,
            MidiControl::Reverb => 91,
            MidiControl::Chorus => 93,
        }
    }

    /// Parse a controller by name ("volume") or number ("7").
    pub fn from_str(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        if let Ok(number) = trimmed.parse::<u8>() {
            return Self::from_number(number);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "vibrato" | "modulation" => Some(MidiControl::Vibrato),
            "volume" => Some(MidiControl::Volume),
            "pan" => Some(MidiControl::Pan),
            "expression" => Some(MidiControl::Expression),
            "sustain" => Some(MidiControl::Sustain),
            "reverb" => Some(MidiControl::Reverb),
            "chorus" => Some(MidiControl::Chorus),
            _ => None,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(MidiControl::Vibrato),
            7 => Some(MidiControl::Volume),
            10 => Some(MidiControl::Pan),
            11 => Some(MidiControl::Expression),
            64 => Some(MidiControl::Sustain),
            91 => Some(MidiControl::Reverb),
            93 => Some(MidiControl::Chorus),
            _ => None,
        }
    }
}

/// A controller change at a beat position on the track
#[derive(Debug, Clone, PartialEq)]
pub struct ControlChange {
    pub beat: f64,
    pub control: MidiControl,
    pub value: u8,
}

/// The root of a composition
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Track {
    pub title: Option<String>,
    pub bars: Vec<Bar>,
    pub default_meter: Meter,
    /// Tempo in bpm; `None` means the default of 120
    pub tempo: Option<f64>,
    pub params: PerformanceParams,
    pub controls: Vec<ControlChange>,
}

impl Track {
    pub fn new(default_meter: Meter) -> Self {
        Self {
            default_meter,
            ..Self::default()
        }
    }

    pub fn with_bar(mut self, bar: Bar) -> Self {
        self.bars.push(bar);
        self
    }

    pub fn with_params(mut self, params: PerformanceParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_tempo(mut self, bpm: f64) -> Self {
        self.tempo = Some(bpm);
        self
    }

    pub fn with_control(mut self, beat: f64, control: MidiControl, value: u8) -> Self {
        self.controls.push(ControlChange {
            beat,
            control,
            value,
        });
        self
    }

    /// Add `bar` to the end of the track `n_times` times.
    pub fn add_bar(&mut self, bar: Bar, n_times: usize) {
        for _ in 0..n_times {
            self.bars.push(bar.clone());
        }
    }

    /// The track with its bars played `repetitions + 1` times.
    ///
    /// A section that is played once has 0 repetitions. Returns `None` when the
    /// resulting bar count does not fit in a `usize`.
    pub fn repeated(&self, repetitions: usize) -> Option<Self> {
        let count = repetitions.checked_add(1)?.checked_mul(self.bars.len())?;
        let mut track = self.clone();
        track.bars = self.bars.iter().cycle().take(count).cloned().collect();
        Some(track)
    }
}

/// Several tracks played together, each on its own channel
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Composition {
    pub title: Option<String>,
    pub tracks: Vec<Track>,
}

impl Composition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_track(mut self, track: Track) -> Self {
        self.tracks.push(track);
        self
    }
}

/// Position of a note in its track
///
/// `containers` lists the index of each enclosing container within its parent, outermost
/// first; `note` is the note's index within its immediate parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePath {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bar: Option<usize>,
    pub containers: Vec<usize>,
    pub note: usize,
}

impl NotePath {
    pub fn new(bar: usize, containers: Vec<usize>, note: usize) -> Self {
        Self {
            bar: Some(bar),
            containers,
            note,
        }
    }

    /// Path of a note used outside any container.
    pub fn standalone() -> Self {
        Self {
            bar: None,
            containers: Vec::new(),
            note: 0,
        }
    }
}

impl fmt::Display for NotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(bar) = self.bar else {
            return f.write_str("standalone note");
        };
        write!(f, "bar {}", bar + 1)?;
        for container in &self.containers {
            write!(f, " > container {}", container + 1)?;
        }
        write!(f, " > note {}", self.note + 1)
    }
}
