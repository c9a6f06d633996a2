//! Placement output type definitions
//!
//! This module defines the resolved, timed records handed to a rendering backend.

use serde::Serialize;

use super::engine::beats_to_ms;
use crate::model::{Meter, MidiControl, NotePath, SoundDescriptor};
use crate::resolve::{BackendDefaults, EffectiveParams};

/// A fully resolved note with absolute timing
///
/// # Fields
/// - `sound`: Instrument and optional pitch, exactly as declared on the note
/// - `params`: Effective parameters after the outward walk (unset fields stay unset)
/// - `start`: Absolute start in beats from the start of the track
/// - `duration`: Length in beats (the resolved duration, or one beat if none)
/// - `start_ms` / `duration_ms`: The same span in milliseconds at the bar's tempo
/// - `bar`: Index of the bar that owns the note (`None` for standalone notes)
/// - `last_bar`: Last bar the sound overlaps, for sustains that cross bar lines
/// - `percussion_key`: General MIDI key for known percussion instruments
/// - `track`: Index of the track in a composition (`None` for a single track)
/// - `path`: Where the note was declared, within its track
///
/// A note that sustains past its bar is still a single event. Splitting it at bar lines
/// is left to the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayableEvent {
    pub sound: SoundDescriptor,
    pub params: EffectiveParams,
    pub start: f64,
    pub duration: f64,
    pub start_ms: f64,
    pub duration_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bar: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_bar: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percussion_key: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<usize>,
    pub path: NotePath,
}

impl PlayableEvent {
    /// Absolute end in beats (exclusive).
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Whether the sound carries over into a later bar.
    pub fn crosses_bar_line(&self) -> bool {
        matches!((self.bar, self.last_bar), (Some(first), Some(last)) if last > first)
    }

    /// Key a synthesizer should sound: the pitch, or the percussion key.
    pub fn key(&self) -> Option<u8> {
        self.sound.pitch.or(self.percussion_key)
    }
}

/// A controller change with absolute timing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlEvent {
    pub control: MidiControl,
    pub controller: u8,
    pub value: u8,
    /// Channel from the track's parameters, if it sets one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<u8>,
    pub start: f64,
    pub start_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<usize>,
}

/// Where one bar sits in time
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarTiming {
    pub index: usize,
    pub meter: Meter,
    /// Tempo in bpm
    pub tempo: f64,
    /// Start in beats
    pub start: f64,
    /// Length in beats
    pub length: f64,
    pub start_ms: f64,
}

impl BarTiming {
    pub fn end(&self) -> f64 {
        self.start + self.length
    }

    pub fn end_ms(&self) -> f64 {
        self.start_ms + beats_to_ms(self.length, self.tempo)
    }
}

/// Everything a backend needs to render a track
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub bars: Vec<BarTiming>,
    pub events: Vec<PlayableEvent>,
    pub controls: Vec<ControlEvent>,
}

/// One instruction in a performance's millisecond timeline
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Cue {
    #[serde(rename_all = "camelCase")]
    NoteOn {
        time_ms: f64,
        /// Index into `Performance::events`
        event: usize,
        instrument: String,
        key: Option<u8>,
        channel: u8,
        velocity: u8,
        bank: u16,
        pitch_bend: i16,
    },
    #[serde(rename_all = "camelCase")]
    NoteOff {
        time_ms: f64,
        event: usize,
        key: Option<u8>,
        channel: u8,
    },
    #[serde(rename_all = "camelCase")]
    Control {
        time_ms: f64,
        channel: u8,
        controller: u8,
        value: u8,
    },
}

impl Cue {
    pub fn time_ms(&self) -> f64 {
        match self {
            Cue::NoteOn { time_ms, .. } | Cue::NoteOff { time_ms, .. } | Cue::Control { time_ms, .. } => *time_ms,
        }
    }

    /// Order of cues that share a timestamp: releases, then controllers, then new notes.
    fn rank(&self) -> u8 {
        match self {
            Cue::NoteOff { .. } => 0,
            Cue::Control { .. } => 1,
            Cue::NoteOn { .. } => 2,
        }
    }
}

impl Performance {
    /// Flatten the performance into start/stop instructions ordered by time.
    ///
    /// Unset parameters are filled from `defaults`, the way a synthesizer would.
    ///
    /// Overlapping notes of the same key on one channel are all kept. Each `NoteOff`
    /// names the event it releases, so a backend that tracks voices can pair them up.
    /// A synthesizer that releases by key and channel alone will end the later note
    /// at the earlier note's `NoteOff`; voice allocation is the backend's concern.
    pub fn timeline(&self, defaults: &BackendDefaults) -> Vec<Cue> {
        let mut cues = Vec::with_capacity(self.events.len() * 2 + self.controls.len());

        for (index, event) in self.events.iter().enumerate() {
            let params = event.params.or_defaults(defaults);
            cues.push(Cue::NoteOn {
                time_ms: event.start_ms,
                event: index,
                instrument: event.sound.instrument.name.clone(),
                key: event.key(),
                channel: params.channel,
                velocity: params.velocity,
                bank: params.bank,
                pitch_bend: params.pitch_bend,
            });
            cues.push(Cue::NoteOff {
                time_ms: event.start_ms + event.duration_ms,
                event: index,
                key: event.key(),
                channel: params.channel,
            });
        }

        for control in &self.controls {
            cues.push(Cue::Control {
                time_ms: control.start_ms,
                channel: control.channel.unwrap_or(defaults.channel),
                controller: control.controller,
                value: control.value,
            });
        }

        cues.sort_by(|a, b| a.time_ms().total_cmp(&b.time_ms()).then(a.rank().cmp(&b.rank())));
        cues
    }

    /// Total length in milliseconds, including sustains past the last bar.
    pub fn duration_ms(&self) -> f64 {
        let bars_end = self.bars.last().map(BarTiming::end_ms).unwrap_or(0.0);
        self.events
            .iter()
            .map(|event| event.start_ms + event.duration_ms)
            .fold(bars_end, f64::max)
    }
}
