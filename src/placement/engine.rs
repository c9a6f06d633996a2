//! Temporal placement engine
//!
//! Walks a track depth-first, resolves each note's parameters against its ancestor chain
//! and computes its absolute start, duration and bar span.

use log::{debug, info};

use super::types::{BarTiming, ControlEvent, PlayableEvent};
use crate::model::{Arrangement, Element, Note, NotePath, PerformanceParams, Track};
use crate::pitch::percussion_key;
use crate::resolve::{resolve, resolve_meter, resolve_tempo, DEFAULT_TEMPO};

/// Convert beats to milliseconds at `bpm`.
///
/// A tempo that is not a positive number gives no time at all; validation reports it.
pub fn beats_to_ms(beats: f64, bpm: f64) -> f64 {
    if bpm.is_finite() && bpm > 0.0 {
        beats * 60_000.0 / bpm
    } else {
        0.0
    }
}

/// Compute where every bar of the track starts.
///
/// Each bar starts where the previous one ends; a bar's length comes from its resolved
/// meter, independent of how many notes it holds.
pub fn bar_timeline(track: &Track) -> Vec<BarTiming> {
    let mut start = 0.0;
    let mut start_ms = 0.0;

    track
        .bars
        .iter()
        .enumerate()
        .map(|(index, bar)| {
            let meter = resolve_meter(bar, track);
            let tempo = resolve_tempo(bar, track);
            let length = meter.length_in_beats();
            let timing = BarTiming {
                index,
                meter,
                tempo,
                start,
                length,
                start_ms,
            };
            debug!(
                "bar {} starts at beat {} ({} at {} bpm, {} beats)",
                index + 1,
                start,
                meter,
                tempo,
                length
            );
            start += length;
            start_ms += beats_to_ms(length, tempo);
            timing
        })
        .collect()
}

/// Place every note of the track in time
///
/// # Algorithm
/// 1. Bars start at the cumulative length of the bars before them
/// 2. Inside a bar, children follow one another; a `Chord` container starts all of its
///    children together
/// 3. A note with an explicit offset starts that many beats after its bar starts, and the
///    next sibling in a sequence resumes where that note's slot ends
/// 4. Events are ordered by absolute start, ties kept in declaration order
///
/// A note sounding past the end of its bar is emitted once with its full duration.
/// Overlapping notes are all kept; polyphony is valid.
///
/// # Example
/// ```rust
/// use cadenza::{place, Bar, Note, NoteContainer, PerformanceParams, SoundDescriptor, Track};
///
/// let track = Track::default()
///     .with_params(PerformanceParams::new().with_channel(2))
///     .with_bar(Bar::new().with(
///         NoteContainer::new()
///             .with(Note::new(SoundDescriptor::pitched("piano", 60)))
///             .with(Note::new(SoundDescriptor::pitched("piano", 64))),
///     ));
///
/// let events = place(&track);
/// assert_eq!(events.len(), 2);
/// assert_eq!(events[1].start, 1.0);
/// assert_eq!(events[1].params.channel, Some(2));
/// ```
pub fn place(track: &Track) -> Vec<PlayableEvent> {
    let bars = bar_timeline(track);
    let mut placer = Placer {
        bars: &bars,
        scopes: vec![&track.params],
        containers: Vec::new(),
        events: Vec::new(),
    };

    for (timing, bar) in bars.iter().zip(&track.bars) {
        placer.scopes.push(&bar.params);
        placer.place_elements(&bar.children, Arrangement::Sequence, timing, 0.0);
        placer.scopes.pop();
    }

    // Stable sort keeps declaration order for equal starts
    let mut events = placer.events;
    events.sort_by(|a, b| a.start.total_cmp(&b.start));

    info!("placed {} events across {} bars", events.len(), bars.len());
    events
}

/// Place a note used outside any container.
///
/// It resolves against an empty chain and starts at its offset, or at 0.
pub fn place_note(note: &Note) -> PlayableEvent {
    let params = resolve(note, &[]);
    let duration = params.duration_or_default();
    let start = note.start_offset.unwrap_or(0.0);

    PlayableEvent {
        percussion_key: percussion_key_for(note),
        sound: note.sound.clone(),
        params,
        start,
        duration,
        start_ms: beats_to_ms(start, DEFAULT_TEMPO),
        duration_ms: beats_to_ms(duration, DEFAULT_TEMPO),
        bar: None,
        last_bar: None,
        track: None,
        path: NotePath::standalone(),
    }
}

/// Place the track's controller changes on its timeline.
pub fn place_controls(track: &Track, bars: &[BarTiming]) -> Vec<ControlEvent> {
    let mut controls: Vec<ControlEvent> = track
        .controls
        .iter()
        .map(|change| {
            let start_ms = match bar_at(bars, change.beat) {
                Some(bar) => ms_within(bar, change.beat),
                None => beats_to_ms(change.beat, track.tempo.unwrap_or(DEFAULT_TEMPO)),
            };
            ControlEvent {
                track: None,
                control: change.control,
                controller: change.control.number(),
                value: change.value,
                channel: track.params.channel,
                start: change.beat,
                start_ms,
            }
        })
        .collect();

    controls.sort_by(|a, b| a.start.total_cmp(&b.start));
    controls
}

/// The bar a beat falls in; beats past the end belong to the last bar, beats before the
/// start to the first.
fn bar_at(bars: &[BarTiming], beat: f64) -> Option<&BarTiming> {
    let index = bars.partition_point(|bar| bar.start <= beat);
    bars.get(index.saturating_sub(1))
}

/// Milliseconds at `beat`, counted at the tempo of `bar`.
fn ms_within(bar: &BarTiming, beat: f64) -> f64 {
    bar.start_ms + beats_to_ms(beat - bar.start, bar.tempo)
}

fn percussion_key_for(note: &Note) -> Option<u8> {
    if note.sound.instrument.is_percussion() {
        percussion_key(&note.sound.instrument.name)
    } else {
        None
    }
}

struct Placer<'t, 'b> {
    bars: &'b [BarTiming],
    /// Parameter scopes from the track inward
    scopes: Vec<&'t PerformanceParams>,
    /// Indices of the containers enclosing the current element
    containers: Vec<usize>,
    events: Vec<PlayableEvent>,
}

impl<'t, 'b> Placer<'t, 'b> {
    /// Place `elements` starting `start` beats into the bar.
    ///
    /// Returns where the group's slot ends, in beats from the bar start.
    fn place_elements(
        &mut self,
        elements: &'t [Element],
        arrangement: Arrangement,
        timing: &BarTiming,
        start: f64,
    ) -> f64 {
        let mut cursor = start;
        let mut latest = start;

        for (index, element) in elements.iter().enumerate() {
            let slot_start = match arrangement {
                Arrangement::Sequence => cursor,
                Arrangement::Chord => start,
            };

            let slot_end = match element {
                Element::Note(note) => self.place_one(note, index, timing, slot_start),
                Element::Container(container) => {
                    self.scopes.push(&container.params);
                    self.containers.push(index);
                    let end = self.place_elements(&container.children, container.arrangement, timing, slot_start);
                    self.containers.pop();
                    self.scopes.pop();
                    end
                }
            };

            cursor = slot_end;
            latest = latest.max(slot_end);
        }

        match arrangement {
            Arrangement::Sequence => cursor,
            Arrangement::Chord => latest,
        }
    }

    /// Place a single note; returns where its slot ends.
    fn place_one(&mut self, note: &Note, index: usize, timing: &BarTiming, slot_start: f64) -> f64 {
        let ancestors: Vec<&PerformanceParams> = self.scopes.iter().rev().copied().collect();
        let params = resolve(note, &ancestors);
        let duration = params.duration_or_default();
        let offset = note.start_offset.unwrap_or(slot_start);
        let start = timing.start + offset;

        let path = NotePath::new(timing.index, self.containers.clone(), index);
        let last_bar = self.last_bar(start + duration, timing.index);
        debug!("{} starts at beat {} for {} beats", path, start, duration);

        // An offset may carry the note into a neighbouring bar with its own tempo
        let sounding = bar_at(self.bars, start).unwrap_or(timing);

        self.events.push(PlayableEvent {
            percussion_key: percussion_key_for(note),
            sound: note.sound.clone(),
            params,
            start,
            duration,
            start_ms: ms_within(sounding, start),
            duration_ms: beats_to_ms(duration, sounding.tempo),
            bar: Some(timing.index),
            last_bar: Some(last_bar),
            track: None,
            path,
        });

        offset + duration
    }

    /// The last bar that starts before `end`, never earlier than the owning bar.
    fn last_bar(&self, end: f64, owner: usize) -> usize {
        let overlapping = self.bars.partition_point(|bar| bar.start < end);
        overlapping.saturating_sub(1).max(owner)
    }
}
