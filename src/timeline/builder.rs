//! Timeline construction
//!
//! Walks each instrument's events in tree order and turns them into timeline
//! entries with absolute times and measure numbers.
//!
//! ## Time Cursors
//! - Each voice has its own cursor, starting at the current measure start
//! - Voice-independent events (voice 0) use the stream cursor: where the
//!   previous event ended, or where the last shift left it
//! - `Shift` pseudo-events move the cursor of their voice and are not indexed
//! - Chord members are skipped; the base carries the chord's time and duration
//! - A barline sits at the furthest time reached in its measure and resets every
//!   cursor to that time

use super::store::Timeline;
use super::types::{Entry, EntryKind};
use crate::context::ScoreContext;
use crate::error::TimelineError;
use crate::semantic::{validate, validate_instrument};
use crate::time::*;
use crate::tree::*;
use std::collections::HashMap;

/// Build a timeline with default settings
///
/// # Example
/// ```rust
/// use gen_timeline::{build, load_tree};
///
/// let tree = load_tree("instruments:\n  - events:\n      - clef: G\n      - note: q\n      - note: h\n")?;
/// let timeline = build(&tree)?;
/// assert_eq!(timeline.len(), 3);
/// assert_eq!(timeline.total_duration(0, 0), 192.0);
/// # Ok::<(), gen_timeline::TimelineError>(())
/// ```
pub fn build(tree: &EventTree) -> Result<Timeline, TimelineError> {
    build_with(tree, &ScoreContext::default())
}

/// Build a timeline with explicit settings
///
/// # Errors
/// Returns [`TimelineError::MalformedTree`] if validation fails.
pub fn build_with(tree: &EventTree, context: &ScoreContext) -> Result<Timeline, TimelineError> {
    validate(tree)?;

    let mut entries = Vec::new();
    for (index, instrument) in tree.instruments().iter().enumerate() {
        entries.extend(build_instrument(instrument, index));
    }
    sort_entries(&mut entries);

    let timeline = Timeline::from_parts(entries, staff_counts(tree), context.clone());
    tracing::debug!(
        "Built timeline: {} instruments, {} events, {} entries, duration {}",
        tree.instruments().len(),
        tree.num_events(),
        timeline.len(),
        timeline.score_duration()
    );
    Ok(timeline)
}

/// Validate and index a single instrument (unsorted)
pub(crate) fn build_checked_instrument(
    tree: &EventTree,
    index: usize,
) -> Result<Vec<Entry>, TimelineError> {
    match tree.instrument(index) {
        Some(instrument) => {
            validate_instrument(instrument, index)?;
            Ok(build_instrument(instrument, index))
        }
        None => Ok(Vec::new()),
    }
}

pub(crate) fn staff_counts(tree: &EventTree) -> Vec<usize> {
    tree.instruments().iter().map(|i| i.num_staves as usize).collect()
}

pub(crate) fn sort_entries(entries: &mut [Entry]) {
    entries.sort_by(|a, b| a.order_cmp(b));
}

/// Per-instrument cursor state
struct Cursors {
    measure: usize,
    measure_start: TimeUnits,
    /// Furthest time reached in the current measure
    measure_end: TimeUnits,
    stream: TimeUnits,
    voices: HashMap<u8, TimeUnits>,
}

impl Cursors {
    fn new() -> Self {
        Self {
            measure: 0,
            measure_start: 0.0,
            measure_end: 0.0,
            stream: 0.0,
            voices: HashMap::new(),
        }
    }

    fn time_for(&self, voice: u8) -> TimeUnits {
        if voice == 0 {
            self.stream
        } else {
            self.voices.get(&voice).copied().unwrap_or(self.measure_start)
        }
    }

    fn set(&mut self, voice: u8, time: TimeUnits) {
        if voice != 0 {
            self.voices.insert(voice, time);
        }
        self.stream = time;
        if is_greater_time(time, self.measure_end) {
            self.measure_end = time;
        }
    }

    fn close_measure(&mut self) -> TimeUnits {
        let time = self.measure_end.max(self.stream);
        self.measure += 1;
        self.measure_start = time;
        self.measure_end = time;
        self.stream = time;
        self.voices.clear();
        time
    }
}

fn build_instrument(instrument: &Instrument, index: usize) -> Vec<Entry> {
    let mut entries = Vec::with_capacity(instrument.events.len());
    let mut cursors = Cursors::new();
    let num_staves = instrument.num_staves as usize;

    for event in &instrument.events {
        if event.is_chord_member() {
            continue;
        }

        if let EventKind::Shift(shift) = &event.kind {
            let current = cursors.time_for(event.voice);
            let target = match shift {
                TimeShift::ToMeasureStart => cursors.measure_start,
                TimeShift::Forward(units) => current + units,
                TimeShift::Back(units) => {
                    let back = current - units;
                    if is_lower_time(back, cursors.measure_start) {
                        tracing::warn!(
                            "Shift {} in instrument {} rewinds past the measure start; clamped",
                            event.id,
                            index
                        );
                        cursors.measure_start
                    } else {
                        back
                    }
                }
            };
            cursors.set(event.voice, target);
            continue;
        }

        let Some(kind) = EntryKind::from_event(&event.kind) else {
            continue;
        };

        let (time, measure) = if event.is_measure_boundary() {
            let measure = cursors.measure;
            (cursors.close_measure(), measure)
        } else {
            (cursors.time_for(event.voice), cursors.measure)
        };

        let duration = event.duration();
        let staves: Vec<usize> = if event.is_instrument_wide() {
            (0..num_staves).collect()
        } else {
            vec![event.staff as usize]
        };
        for staff in staves {
            entries.push(Entry {
                time,
                measure,
                instrument: index,
                staff,
                voice: event.voice,
                order_priority: kind.priority(),
                event_id: event.id,
                duration,
                kind,
            });
        }

        if !event.is_measure_boundary() {
            cursors.set(event.voice, time + duration);
        }
    }

    tracing::trace!(
        "Instrument {} ({}): {} entries, {} barlines",
        index,
        instrument.name,
        entries.len(),
        cursors.measure
    );
    entries
}
