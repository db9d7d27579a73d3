//! Score navigator state machine
//!
//! The reachable positions form one sequence: the slots of every non-empty
//! staff in (instrument, staff) order, each staff followed by its `EndOfStaff`
//! except the last one, which is followed by `EndOfScore`. The navigator keeps
//! the filtered view of the current staff and an index into it. Views are
//! cached per (staff, filter) until the next reset.

use super::state::{CursorState, Pointed};
use super::view::StaffView;
use crate::context::ScoreContext;
use crate::time::{compare_time, TimeUnits};
use crate::timeline::{Entry, Slot, Successor, Timeline};
use crate::tree::EventId;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    Slot(usize),
    EndOfStaff,
    EndOfScore,
}

/// Stateful cursor over a [`Timeline`].
///
/// # Example
/// ```rust
/// use gen_timeline::{index_score, Navigator};
///
/// let timeline = index_score("instruments:\n  - events:\n      - clef: G\n      - note: q\n")?;
/// let mut nav = Navigator::new(&timeline);
/// nav.move_next();
/// assert_eq!(nav.current_time(), 0.0);
/// nav.move_next();
/// assert!(nav.is_at_end_of_score());
/// assert_eq!(nav.current_time(), 64.0);
/// # Ok::<(), gen_timeline::TimelineError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Navigator<'a> {
    timeline: &'a Timeline,
    context: ScoreContext,
    /// Non-empty staves in traversal order
    staves: Vec<(usize, usize)>,
    /// Voice chosen by the user (sticky across staves)
    selected_voice: Option<u8>,
    staff_idx: usize,
    /// Effective filter of the loaded staff
    filter: Option<u8>,
    view: Rc<StaffView>,
    /// Views already built, keyed by (staff index, filter)
    views: HashMap<(usize, Option<u8>), Rc<StaffView>>,
    cursor: Cursor,
}

impl<'a> Navigator<'a> {
    /// Navigator at the first position of the score, with the timeline's settings
    pub fn new(timeline: &'a Timeline) -> Self {
        Self::with_context(timeline, timeline.context())
    }

    pub fn with_context(timeline: &'a Timeline, context: &ScoreContext) -> Self {
        let mut nav = Self {
            timeline,
            context: context.clone(),
            staves: Vec::new(),
            selected_voice: None,
            staff_idx: 0,
            filter: None,
            view: Rc::default(),
            views: HashMap::new(),
            cursor: Cursor::EndOfScore,
        };
        nav.reset();
        nav.go_to_start();
        nav
    }

    pub fn timeline(&self) -> &'a Timeline {
        self.timeline
    }

    pub fn context(&self) -> &ScoreContext {
        &self.context
    }

    fn reset(&mut self) {
        self.staves = self.timeline.staves();
        self.selected_voice = self.context.initial_voice;
        self.staff_idx = 0;
        self.filter = None;
        self.view = Rc::default();
        self.views.clear();
        self.cursor = Cursor::EndOfScore;
    }

    fn go_to_start(&mut self) {
        if self.staves.is_empty() {
            self.cursor = Cursor::EndOfScore;
        } else {
            self.load_staff(0);
            self.cursor = Cursor::Slot(0);
        }
    }

    // ---------------------------------------------------------------------
    // staff views

    fn effective_filter(&self, instrument: usize, staff: usize) -> Option<u8> {
        let voices = self.timeline.voices(instrument, staff);
        match self.selected_voice {
            Some(v) if voices.contains(&v) => Some(v),
            _ if voices.len() >= 2 => self.timeline.first_voice(instrument, staff),
            _ => None,
        }
    }

    fn load_staff(&mut self, staff_idx: usize) {
        let Some(&(instrument, staff)) = self.staves.get(staff_idx) else {
            return;
        };
        let filter = self.effective_filter(instrument, staff);
        let key = (staff_idx, filter);
        let timeline = self.timeline;
        let view = self
            .views
            .entry(key)
            .or_insert_with(|| Rc::new(StaffView::new(timeline, instrument, staff, filter)));
        self.view = Rc::clone(view);
        self.staff_idx = staff_idx;
        self.filter = filter;
    }

    fn reload_staff(&mut self) {
        self.load_staff(self.staff_idx);
    }

    fn staff_idx_of(&self, instrument: usize, staff: usize) -> Option<usize> {
        self.staves.iter().position(|&s| s == (instrument, staff))
    }

    fn current_staff(&self) -> (usize, usize) {
        self.staves.get(self.staff_idx).copied().unwrap_or((0, 0))
    }

    fn is_last_staff(&self) -> bool {
        self.staff_idx + 1 >= self.staves.len()
    }

    /// Position after the last slot of the loaded staff
    fn end_cursor(&self) -> Cursor {
        if self.is_last_staff() {
            Cursor::EndOfScore
        } else {
            Cursor::EndOfStaff
        }
    }

    fn go_to_end_of_score(&mut self) {
        if !self.staves.is_empty() {
            self.load_staff(self.staves.len() - 1);
        }
        self.cursor = Cursor::EndOfScore;
    }

    fn slot_entry(&self, slot: &Slot) -> Option<&'a Entry> {
        slot.position().and_then(|pos| self.timeline.entry_at(pos))
    }

    fn slot(&self, i: usize) -> Slot {
        self.view.slots()[i]
    }

    fn find_slot<F: Fn(&Slot) -> bool>(&self, pred: F) -> Option<usize> {
        self.view.slots().iter().position(|slot| pred(slot))
    }

    /// Slot of an event in the loaded view
    fn slot_of_event(&self, id: EventId) -> Option<usize> {
        let (instrument, staff) = self.current_staff();
        let on_staff = |pos: usize| {
            self.timeline
                .entry_at(pos)
                .map(|e| (e.instrument, e.staff) == (instrument, staff))
                .unwrap_or(false)
        };
        let position = match self.timeline.position_of(id) {
            Some(pos) if on_staff(pos) => Some(pos),
            _ => self.timeline.find_in_staff(id, instrument, staff),
        };
        position.and_then(|pos| self.view.slot_of(pos))
    }

    /// First slot at (time, measure) accepted by `pred`
    fn find_at_place<F: Fn(&Slot) -> bool>(&self, time: TimeUnits, measure: usize, pred: F) -> Option<usize> {
        self.view
            .at_place(time, measure)
            .iter()
            .copied()
            .find(|&i| pred(&self.view.slots()[i]))
    }

    /// Measure reported at the end positions
    fn end_measure(&self) -> usize {
        match self.view.slots().last() {
            Some(slot) => {
                let closes = self.slot_entry(slot).map(|e| e.is_barline()).unwrap_or(false);
                slot.measure() + usize::from(closes)
            }
            None => 0,
        }
    }

    /// At `EndOfScore` the time is the active voice's own end
    fn end_of_score_time(&self) -> TimeUnits {
        if self.staves.is_empty() {
            return 0.0;
        }
        let (instrument, staff) = self.current_staff();
        match self.filter {
            Some(voice) => self.timeline.voice_duration(instrument, staff, voice),
            None => self.timeline.total_duration(instrument, staff),
        }
    }

    // ---------------------------------------------------------------------
    // state

    /// Capture the current position
    pub fn get_state(&self) -> CursorState {
        let (instrument, staff) = self.current_staff();
        let (time, measure, pointed, ref_id) = match self.cursor {
            Cursor::Slot(i) => match self.slot(i) {
                Slot::Entry { position, time, measure } => {
                    let id = self.timeline.entry_at(position).map(|e| e.event_id);
                    match id {
                        Some(id) => (time, measure, Pointed::Real(id), Some(id)),
                        None => (time, measure, Pointed::EndOfScore, None),
                    }
                }
                Slot::Gap { time, measure, anchor } => (time, measure, Pointed::EmptyPlace, anchor),
            },
            Cursor::EndOfStaff => (
                self.timeline.total_duration(instrument, staff),
                self.end_measure(),
                Pointed::EndOfStaff,
                None,
            ),
            Cursor::EndOfScore => (self.end_of_score_time(), self.end_measure(), Pointed::EndOfScore, None),
        };
        CursorState {
            instrument,
            staff,
            measure,
            time,
            pointed,
            ref_id,
            voice: self.selected_voice,
            generation: self.timeline.generation(),
        }
    }

    /// Apply a state captured on this timeline generation
    pub fn restore_state(&mut self, state: &CursorState) {
        debug_assert_eq!(
            state.generation,
            self.timeline.generation(),
            "cursor state captured before the timeline was rebuilt"
        );
        self.selected_voice = state.voice;
        let Some(staff_idx) = self.staff_idx_of(state.instrument, state.staff) else {
            self.go_to_end_of_score();
            return;
        };
        self.load_staff(staff_idx);

        let found = match state.pointed {
            Pointed::Real(id) => self.slot_of_event(id),
            Pointed::EmptyPlace => self.find_at_place(state.time, state.measure, Slot::is_gap),
            Pointed::EndOfStaff => {
                self.cursor = Cursor::EndOfStaff;
                return;
            }
            Pointed::EndOfScore => {
                self.go_to_end_of_score();
                return;
            }
        };
        match found {
            Some(i) => self.cursor = Cursor::Slot(i),
            None => self.go_to_end_of_score(),
        }
    }

    // ---------------------------------------------------------------------
    // sequential movement

    /// Advance one position. No-op at `EndOfScore`.
    pub fn move_next(&mut self) {
        self.cursor = match self.cursor {
            Cursor::EndOfScore => Cursor::EndOfScore,
            Cursor::EndOfStaff => {
                self.load_staff(self.staff_idx + 1);
                Cursor::Slot(0)
            }
            Cursor::Slot(i) if i + 1 < self.view.len() => Cursor::Slot(i + 1),
            Cursor::Slot(_) => self.end_cursor(),
        };
        tracing::trace!("move_next -> {:?}", self.cursor);
    }

    /// Step back one position. No-op at the first position of the score.
    pub fn move_prev(&mut self) {
        self.cursor = match self.cursor {
            Cursor::EndOfScore | Cursor::EndOfStaff if self.view.is_empty() => self.cursor,
            Cursor::EndOfScore | Cursor::EndOfStaff => Cursor::Slot(self.view.len() - 1),
            Cursor::Slot(0) if self.staff_idx > 0 => {
                self.load_staff(self.staff_idx - 1);
                Cursor::EndOfStaff
            }
            Cursor::Slot(0) => Cursor::Slot(0),
            Cursor::Slot(i) => Cursor::Slot(i - 1),
        };
        tracing::trace!("move_prev -> {:?}", self.cursor);
    }

    // ---------------------------------------------------------------------
    // direct addressing

    /// Point to an event. Unknown ids land on `EndOfScore`.
    pub fn point_to(&mut self, id: EventId) {
        match self.timeline.position_of(id) {
            Some(pos) => self.point_to_position(pos),
            None => {
                tracing::trace!("point_to {}: not found", id);
                self.go_to_end_of_score();
            }
        }
    }

    /// Point to an event indexed once per staff (barlines, key and time
    /// signatures) on a given staff of its instrument
    pub fn point_to_barline(&mut self, id: EventId, staff: usize) {
        let position = self
            .timeline
            .find_by_id(id)
            .and_then(|entry| self.timeline.find_in_staff(id, entry.instrument, staff));
        match position {
            Some(pos) => self.point_to_position(pos),
            None => self.go_to_end_of_score(),
        }
    }

    fn point_to_position(&mut self, pos: usize) {
        let Some(entry) = self.timeline.entry_at(pos) else {
            self.go_to_end_of_score();
            return;
        };
        let Some(staff_idx) = self.staff_idx_of(entry.instrument, entry.staff) else {
            self.go_to_end_of_score();
            return;
        };
        if entry.voice != 0 {
            if let Some(filter) = self.effective_filter(entry.instrument, entry.staff) {
                if filter != entry.voice {
                    self.selected_voice = Some(entry.voice);
                }
            }
        }
        self.load_staff(staff_idx);
        match self.view.slot_of(pos) {
            Some(i) => self.cursor = Cursor::Slot(i),
            None => self.go_to_end_of_score(),
        }
    }

    /// First position of a 0-based measure in the current staff
    pub fn to_measure(&mut self, measure: usize) {
        let (instrument, staff) = self.current_staff();
        self.to_measure_in(measure, instrument, staff);
    }

    /// First position of a 0-based measure in the given staff.
    /// Past the last measure clamps to the staff's end; an unknown staff lands
    /// on `EndOfScore`.
    pub fn to_measure_in(&mut self, measure: usize, instrument: usize, staff: usize) {
        let Some(staff_idx) = self.staff_idx_of(instrument, staff) else {
            self.go_to_end_of_score();
            return;
        };
        self.load_staff(staff_idx);
        self.cursor = match self.find_slot(|slot| slot.measure() >= measure) {
            Some(i) => Cursor::Slot(i),
            None => self.end_cursor(),
        };
    }

    /// First position at or after `time` in the given staff
    pub fn to_time(&mut self, instrument: usize, staff: usize, time: TimeUnits) {
        let Some(staff_idx) = self.staff_idx_of(instrument, staff) else {
            self.go_to_end_of_score();
            return;
        };
        self.load_staff(staff_idx);
        self.cursor = match self.find_slot(|slot| compare_time(slot.time(), time) != Ordering::Less) {
            Some(i) => Cursor::Slot(i),
            None => self.end_cursor(),
        };
    }

    // ---------------------------------------------------------------------
    // voices

    /// Select a voice and re-resolve the current position against it
    pub fn change_voice_to(&mut self, voice: u8) {
        let before = self.get_state();
        self.selected_voice = Some(voice);
        if self.staves.is_empty() {
            return;
        }
        self.reload_staff();
        if !matches!(self.cursor, Cursor::Slot(_)) {
            return;
        }

        let found = before
            .id()
            .and_then(|id| self.slot_of_event(id))
            .or_else(|| {
                self.find_at_place(before.time, before.measure, |slot| {
                    self.slot_entry(slot).map(|e| e.voice == voice).unwrap_or(false)
                })
            })
            .or_else(|| self.find_at_place(before.time, before.measure, Slot::is_gap))
            .or_else(|| {
                self.find_slot(|slot| match compare_time(slot.time(), before.time) {
                    Ordering::Greater => true,
                    Ordering::Equal => slot.measure() >= before.measure,
                    Ordering::Less => false,
                })
            });

        self.cursor = match found {
            Some(i) => Cursor::Slot(i),
            None => self.end_cursor(),
        };
        tracing::trace!("change_voice_to {} -> {:?}", voice, self.cursor);
    }

    /// Voice filter in effect on the current staff (None = all voices)
    pub fn active_voice(&self) -> Option<u8> {
        self.filter
    }

    // ---------------------------------------------------------------------
    // re-acquisition after a rebuild

    /// Forget cached views and the voice selection, then point to `id`
    pub fn reset_and_point_to(&mut self, id: EventId) {
        self.reset();
        self.point_to(id);
    }

    /// Forget cached views and the voice selection, then point to the position
    /// that followed `id`: the next position when `id` still exists, else the
    /// first surviving event after it in its old staff.
    pub fn reset_and_point_after(&mut self, id: EventId) {
        self.reset();
        if let Some(pos) = self.timeline.position_of(id) {
            self.point_to_position(pos);
            self.move_next();
            return;
        }
        match self.timeline.successor_of_removed(id) {
            Some(Successor { instrument, staff, next: Some(next) }) => {
                match self.timeline.find_in_staff(next, instrument, staff) {
                    Some(pos) => self.point_to_position(pos),
                    None => self.point_to(next),
                }
            }
            Some(Successor { instrument, staff, next: None }) => match self.staff_idx_of(instrument, staff) {
                Some(staff_idx) => {
                    self.load_staff(staff_idx);
                    self.cursor = self.end_cursor();
                }
                None => self.go_to_end_of_score(),
            },
            None => self.go_to_end_of_score(),
        }
    }

    // ---------------------------------------------------------------------
    // queries

    pub fn is_at_end_of_score(&self) -> bool {
        self.cursor == Cursor::EndOfScore
    }

    pub fn is_at_end_of_staff(&self) -> bool {
        self.cursor == Cursor::EndOfStaff
    }

    pub fn is_at_empty_place(&self) -> bool {
        matches!(self.cursor, Cursor::Slot(i) if self.slot(i).is_gap())
    }

    /// Entry under the cursor, for real positions
    pub fn current_entry(&self) -> Option<&'a Entry> {
        match self.cursor {
            Cursor::Slot(i) => self.slot_entry(&self.view.slots()[i]),
            _ => None,
        }
    }

    pub fn current_time(&self) -> TimeUnits {
        self.get_state().time
    }

    pub fn current_measure(&self) -> usize {
        self.get_state().measure
    }
}
