//! Timeline entry and view type definitions

use crate::time::{compare_time, TimeUnits};
use crate::tree::{EventId, EventKind, TimeSignature};
use serde::Serialize;
use std::cmp::Ordering;

/// Rank of simultaneous entries.
///
/// Prolog objects come first (clef, then key, then time signature), then
/// notes, rests, directions and other objects, and the barline last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderPriority {
    Clef = 0,
    Key = 1,
    Time = 2,
    Content = 3,
    Barline = 4,
}

/// Lightweight copy of the indexed event's kind.
///
/// The time signature value is kept because timing queries need the meter
/// without going back to the tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Clef,
    Key,
    Time(TimeSignature),
    Note,
    Rest,
    Barline,
    Direction,
    Other,
}

impl EntryKind {
    /// `None` for pseudo-events, which are never indexed
    pub fn from_event(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Clef(_) => Some(EntryKind::Clef),
            EventKind::Key(_) => Some(EntryKind::Key),
            EventKind::Time(ts) => Some(EntryKind::Time(*ts)),
            EventKind::Note(_) => Some(EntryKind::Note),
            EventKind::Rest(_) => Some(EntryKind::Rest),
            EventKind::Barline(_) => Some(EntryKind::Barline),
            EventKind::Direction(_) => Some(EntryKind::Direction),
            EventKind::Other => Some(EntryKind::Other),
            EventKind::Shift(_) => None,
        }
    }

    pub fn priority(&self) -> OrderPriority {
        match self {
            EntryKind::Clef => OrderPriority::Clef,
            EntryKind::Key => OrderPriority::Key,
            EntryKind::Time(_) => OrderPriority::Time,
            EntryKind::Note | EntryKind::Rest | EntryKind::Direction | EntryKind::Other => {
                OrderPriority::Content
            }
            EntryKind::Barline => OrderPriority::Barline,
        }
    }
}

/// One indexed staff object
///
/// # Fields
/// - `time`: absolute start time in time units
/// - `measure`: 0-based measure; a barline carries the measure it closes
/// - `voice`: 0 for voice-independent objects
/// - `duration`: zero for everything but notes and rests
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub time: TimeUnits,
    pub measure: usize,
    pub instrument: usize,
    pub staff: usize,
    pub voice: u8,
    pub order_priority: OrderPriority,
    pub event_id: EventId,
    pub duration: TimeUnits,
    pub kind: EntryKind,
}

impl Entry {
    pub fn end_time(&self) -> TimeUnits {
        self.time + self.duration
    }

    pub fn is_barline(&self) -> bool {
        self.kind == EntryKind::Barline
    }

    pub fn time_signature(&self) -> Option<TimeSignature> {
        match self.kind {
            EntryKind::Time(ts) => Some(ts),
            _ => None,
        }
    }

    /// Timeline order: time, then measure (a barline closing a measure precedes
    /// whatever opens the next one at the same time), then priority,
    /// instrument and staff. Equal keys keep tree order (stable sort).
    pub fn order_cmp(&self, other: &Entry) -> Ordering {
        compare_time(self.time, other.time)
            .then(self.measure.cmp(&other.measure))
            .then(self.order_priority.cmp(&other.order_priority))
            .then(self.instrument.cmp(&other.instrument))
            .then(self.staff.cmp(&other.staff))
    }
}

/// One position of a staff's filtered view
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slot {
    /// A real entry; `position` indexes the timeline
    Entry {
        position: usize,
        time: TimeUnits,
        measure: usize,
    },
    /// A time where other voices have content but the filtered voice has none.
    /// `anchor` is the next real event of the voice (else the next
    /// voice-independent event). A trailing gap anchors to the closest real
    /// event before it; `None` only when the view has no real event.
    Gap {
        time: TimeUnits,
        measure: usize,
        anchor: Option<EventId>,
    },
}

impl Slot {
    pub fn time(&self) -> TimeUnits {
        match self {
            Slot::Entry { time, .. } | Slot::Gap { time, .. } => *time,
        }
    }

    pub fn measure(&self) -> usize {
        match self {
            Slot::Entry { measure, .. } | Slot::Gap { measure, .. } => *measure,
        }
    }

    pub fn position(&self) -> Option<usize> {
        match self {
            Slot::Entry { position, .. } => Some(*position),
            Slot::Gap { .. } => None,
        }
    }

    pub fn is_gap(&self) -> bool {
        matches!(self, Slot::Gap { .. })
    }
}

/// Where a removed event used to sit: its staff and the first event after it
/// that survived the rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Successor {
    pub instrument: usize,
    pub staff: usize,
    pub next: Option<EventId>,
}
