//! The staff-object timeline: storage, queries and rebuild bookkeeping

use super::builder::{build_checked_instrument, build_with, sort_entries, staff_counts};
use super::types::{Entry, Slot, Successor};
use crate::context::ScoreContext;
use crate::error::TimelineError;
use crate::time::{is_greater_time, is_lower_time, time_key, TimeUnits};
use crate::tree::{EventId, EventTree, TimeSignature};
use std::collections::{HashMap, HashSet};

/// Derived per-staff index
#[derive(Debug, Clone, Default)]
struct StaffIndex {
    /// Timeline positions of this staff's entries, in order
    positions: Vec<usize>,
    /// Distinct voices (> 0), ascending
    voices: Vec<u8>,
    /// Voice of the first voiced entry in staff order
    first_voice: Option<u8>,
    total_duration: TimeUnits,
    num_measures: usize,
    /// Start time of each measure; index 0 is always 0
    measure_starts: Vec<TimeUnits>,
}

/// Totally ordered index of every staff object in the score.
///
/// The timeline references events by id only. It is rebuilt in place after the
/// tree is edited; every rebuild bumps [`Timeline::generation`].
#[derive(Debug, Clone)]
pub struct Timeline {
    entries: Vec<Entry>,
    /// `[instrument][staff]`
    staves: Vec<Vec<StaffIndex>>,
    /// First position of every indexed id (staff 0 for shared events)
    by_id: HashMap<EventId, usize>,
    context: ScoreContext,
    generation: u64,
    /// Events dropped by the latest rebuild
    removed: HashMap<EventId, Successor>,
}

impl Timeline {
    pub(crate) fn from_parts(entries: Vec<Entry>, staff_counts: Vec<usize>, context: ScoreContext) -> Self {
        let mut timeline = Self {
            entries: Vec::new(),
            staves: Vec::new(),
            by_id: HashMap::new(),
            context,
            generation: 0,
            removed: HashMap::new(),
        };
        timeline.install(entries, &staff_counts);
        timeline
    }

    /// Replace the entries and recompute every derived index
    fn install(&mut self, entries: Vec<Entry>, staff_counts: &[usize]) {
        self.entries = entries;
        self.staves = staff_counts
            .iter()
            .map(|&n| vec![StaffIndex::default(); n])
            .collect();
        self.by_id.clear();

        for (pos, entry) in self.entries.iter().enumerate() {
            self.by_id.entry(entry.event_id).or_insert(pos);
            if let Some(index) = self
                .staves
                .get_mut(entry.instrument)
                .and_then(|s| s.get_mut(entry.staff))
            {
                index.positions.push(pos);
            }
        }

        for staff_list in self.staves.iter_mut() {
            for index in staff_list.iter_mut() {
                let mut voices = HashSet::new();
                let mut first_voice = None;
                let mut total: TimeUnits = 0.0;
                let mut measure_starts = vec![0.0];
                for &pos in &index.positions {
                    let entry = &self.entries[pos];
                    if entry.voice > 0 {
                        voices.insert(entry.voice);
                        first_voice.get_or_insert(entry.voice);
                    }
                    if is_greater_time(entry.end_time(), total) {
                        total = entry.end_time();
                    }
                    if entry.is_barline() {
                        measure_starts.push(entry.time);
                    }
                }
                let barlines = measure_starts.len() - 1;
                let open_measure = index
                    .positions
                    .last()
                    .map(|&pos| !self.entries[pos].is_barline())
                    .unwrap_or(false);
                let mut voices: Vec<u8> = voices.into_iter().collect();
                voices.sort_unstable();

                index.voices = voices;
                index.first_voice = first_voice;
                index.total_duration = total;
                index.num_measures = barlines + usize::from(open_measure);
                index.measure_starts = measure_starts;
            }
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry_at(&self, position: usize) -> Option<&Entry> {
        self.entries.get(position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// First entry of an event (staff 0 for events indexed once per staff)
    pub fn find_by_id(&self, id: EventId) -> Option<&Entry> {
        self.position_of(id).map(|pos| &self.entries[pos])
    }

    pub fn position_of(&self, id: EventId) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    /// Entry of an event on a given staff
    pub fn find_in_staff(&self, id: EventId, instrument: usize, staff: usize) -> Option<usize> {
        self.staff_index(instrument, staff)?
            .positions
            .iter()
            .copied()
            .find(|&pos| self.entries[pos].event_id == id)
    }

    pub fn num_instruments(&self) -> usize {
        self.staves.len()
    }

    pub fn num_staves(&self, instrument: usize) -> usize {
        self.staves.get(instrument).map(|s| s.len()).unwrap_or(0)
    }

    /// Staves with at least one entry, in traversal order
    pub fn staves(&self) -> Vec<(usize, usize)> {
        self.staves
            .iter()
            .enumerate()
            .flat_map(|(i, list)| {
                list.iter()
                    .enumerate()
                    .filter(|(_, index)| !index.positions.is_empty())
                    .map(move |(s, _)| (i, s))
            })
            .collect()
    }

    fn staff_index(&self, instrument: usize, staff: usize) -> Option<&StaffIndex> {
        self.staves.get(instrument)?.get(staff)
    }

    /// Timeline positions of a staff's entries
    pub fn staff_positions(&self, instrument: usize, staff: usize) -> &[usize] {
        self.staff_index(instrument, staff)
            .map(|index| index.positions.as_slice())
            .unwrap_or(&[])
    }

    /// End time of the last object of the staff
    pub fn total_duration(&self, instrument: usize, staff: usize) -> TimeUnits {
        self.staff_index(instrument, staff)
            .map(|index| index.total_duration)
            .unwrap_or(0.0)
    }

    /// Longest staff
    pub fn score_duration(&self) -> TimeUnits {
        self.staves
            .iter()
            .flatten()
            .map(|index| index.total_duration)
            .fold(0.0, f64::max)
    }

    /// Barlines plus the trailing open measure, if any
    pub fn num_measures(&self, instrument: usize, staff: usize) -> usize {
        self.staff_index(instrument, staff)
            .map(|index| index.num_measures)
            .unwrap_or(0)
    }

    /// Start time of a measure; measures past the last barline start at it
    pub fn measure_start(&self, instrument: usize, staff: usize, measure: usize) -> TimeUnits {
        self.staff_index(instrument, staff)
            .and_then(|index| {
                let last = index.measure_starts.len().saturating_sub(1);
                index.measure_starts.get(measure.min(last)).copied()
            })
            .unwrap_or(0.0)
    }

    /// Distinct voices used on a staff (voice-independent objects excluded)
    pub fn voices(&self, instrument: usize, staff: usize) -> &[u8] {
        self.staff_index(instrument, staff)
            .map(|index| index.voices.as_slice())
            .unwrap_or(&[])
    }

    /// Voice of the first event met when walking the staff; `None` if the
    /// staff only holds voice-independent objects
    pub fn first_voice(&self, instrument: usize, staff: usize) -> Option<u8> {
        self.staff_index(instrument, staff)?.first_voice
    }

    /// End time of a voice's own content; the staff duration if the voice has none
    pub fn voice_duration(&self, instrument: usize, staff: usize, voice: u8) -> TimeUnits {
        let end = self
            .staff_positions(instrument, staff)
            .iter()
            .map(|&pos| &self.entries[pos])
            .filter(|entry| entry.voice == voice)
            .map(|entry| entry.end_time())
            .fold(None, |acc: Option<TimeUnits>, t| Some(acc.map_or(t, |a| a.max(t))));
        end.unwrap_or_else(|| self.total_duration(instrument, staff))
    }

    /// Filtered view of a staff.
    ///
    /// With `voice = None` every entry is a slot. With a voice, the view keeps
    /// that voice's entries and the voice-independent ones, and inserts a
    /// [`Slot::Gap`] at each (time, measure) where another voice has an entry
    /// and this voice has none. A gap anchors to the next entry of the voice,
    /// else the next entry of the view, else the closest one before it.
    pub fn entries_for(&self, instrument: usize, staff: usize, voice: Option<u8>) -> Vec<Slot> {
        let positions = self.staff_positions(instrument, staff);
        let slot_of = |pos: usize| {
            let entry = &self.entries[pos];
            Slot::Entry {
                position: pos,
                time: entry.time,
                measure: entry.measure,
            }
        };

        let Some(voice) = voice else {
            return positions.iter().map(|&pos| slot_of(pos)).collect();
        };

        let occupied: HashSet<(i64, usize)> = positions
            .iter()
            .map(|&pos| &self.entries[pos])
            .filter(|entry| entry.voice == voice)
            .map(|entry| (time_key(entry.time), entry.measure))
            .collect();

        let mut gaps: HashSet<(i64, usize)> = HashSet::new();
        let mut slots = Vec::with_capacity(positions.len());
        let mut prev_in_voice: Option<EventId> = None;
        let mut prev_any: Option<EventId> = None;
        for &pos in positions {
            let entry = &self.entries[pos];
            if entry.voice == 0 || entry.voice == voice {
                if entry.voice == voice {
                    prev_in_voice = Some(entry.event_id);
                }
                prev_any = Some(entry.event_id);
                slots.push(slot_of(pos));
                continue;
            }
            let key = (time_key(entry.time), entry.measure);
            if !occupied.contains(&key) && gaps.insert(key) {
                // provisional, replaced below when a real entry follows
                slots.push(Slot::Gap {
                    time: entry.time,
                    measure: entry.measure,
                    anchor: prev_in_voice.or(prev_any),
                });
            }
        }

        let mut next_in_voice: Option<EventId> = None;
        let mut next_any: Option<EventId> = None;
        for slot in slots.iter_mut().rev() {
            match slot {
                Slot::Entry { position, .. } => {
                    let entry = &self.entries[*position];
                    if entry.voice == voice {
                        next_in_voice = Some(entry.event_id);
                    }
                    next_any = Some(entry.event_id);
                }
                Slot::Gap { anchor, .. } => *anchor = next_in_voice.or(next_any).or(*anchor),
            }
        }
        slots
    }

    /// Time signature governing (time, measure) on the given staff
    pub fn time_signature_at(
        &self,
        instrument: usize,
        staff: usize,
        time: TimeUnits,
        measure: usize,
    ) -> Option<TimeSignature> {
        self.staff_positions(instrument, staff)
            .iter()
            .map(|&pos| &self.entries[pos])
            .take_while(|entry| {
                is_lower_time(entry.time, time)
                    || (!is_greater_time(entry.time, time) && entry.measure <= measure)
            })
            .filter_map(|entry| entry.time_signature())
            .last()
    }

    pub fn context(&self) -> &ScoreContext {
        &self.context
    }

    /// Bumped by every rebuild
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// For an event dropped by the latest rebuild: its staff and the first
    /// event that followed it there and still exists
    pub fn successor_of_removed(&self, id: EventId) -> Option<Successor> {
        self.removed.get(&id).copied()
    }

    /// Full re-scan after a batch of edits
    pub fn rebuild(&mut self, tree: &EventTree) -> Result<(), TimelineError> {
        let fresh = build_with(tree, &self.context)?;
        self.replace(fresh.entries, &staff_counts(tree));
        tracing::debug!(
            "Rebuilt timeline (generation {}): {} entries, {} removed",
            self.generation,
            self.len(),
            self.removed.len()
        );
        Ok(())
    }

    /// Re-scan one instrument; the other instruments' entries are kept as they are
    pub fn rebuild_instrument(&mut self, tree: &EventTree, instrument: usize) -> Result<(), TimelineError> {
        if tree.instruments().len() != self.staves.len() {
            return self.rebuild(tree);
        }
        let fresh = build_checked_instrument(tree, instrument)?;
        let mut entries: Vec<Entry> = self
            .entries
            .iter()
            .filter(|entry| entry.instrument != instrument)
            .copied()
            .collect();
        entries.extend(fresh);
        sort_entries(&mut entries);
        self.replace(entries, &staff_counts(tree));
        tracing::debug!(
            "Rebuilt instrument {} (generation {}): {} entries",
            instrument,
            self.generation,
            self.len()
        );
        Ok(())
    }

    /// Install new entries and record where removed events used to be
    fn replace(&mut self, entries: Vec<Entry>, staff_counts: &[usize]) {
        let new_ids: HashSet<EventId> = entries.iter().map(|e| e.event_id).collect();

        let mut removed = HashMap::new();
        for (instrument, staff_list) in self.staves.iter().enumerate() {
            for (staff, index) in staff_list.iter().enumerate() {
                let mut next: Option<EventId> = None;
                for &pos in index.positions.iter().rev() {
                    let id = self.entries[pos].event_id;
                    if new_ids.contains(&id) {
                        next = Some(id);
                    } else {
                        removed.entry(id).or_insert(Successor {
                            instrument,
                            staff,
                            next,
                        });
                    }
                }
            }
        }

        self.install(entries, staff_counts);
        self.removed = removed;
        self.generation += 1;
    }
}
