//! Cursor state value types

use crate::time::TimeUnits;
use crate::tree::EventId;
use serde::Serialize;

/// What the cursor points at
///
/// Sentinels are variants, never reserved id values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Pointed {
    /// A real event
    Real(EventId),
    /// A valid time for the active voice with no event; see `CursorState::ref_id`
    EmptyPlace,
    /// Past the last object of a staff; more staves follow
    EndOfStaff,
    /// Past the last object of the last staff
    EndOfScore,
}

/// Immutable snapshot of a navigator position.
///
/// States are cheap `Copy` values meant to be stored by an undo stack. They are
/// only valid on the timeline generation they were captured on.
///
/// # Fields
/// - `ref_id`: the pointed event for `Real`, the anchor (next real event of the
///   voice) for `EmptyPlace`, `None` at the end positions
/// - `voice`: voice selection active when the state was captured
/// - `generation`: timeline generation at capture time
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorState {
    pub instrument: usize,
    pub staff: usize,
    pub measure: usize,
    pub time: TimeUnits,
    pub pointed: Pointed,
    pub ref_id: Option<EventId>,
    pub voice: Option<u8>,
    pub generation: u64,
}

impl CursorState {
    /// Pointed event id, for real positions only
    pub fn id(&self) -> Option<EventId> {
        match self.pointed {
            Pointed::Real(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_real(&self) -> bool {
        matches!(self.pointed, Pointed::Real(_))
    }

    pub fn is_empty_place(&self) -> bool {
        self.pointed == Pointed::EmptyPlace
    }

    pub fn is_end_of_staff(&self) -> bool {
        self.pointed == Pointed::EndOfStaff
    }

    pub fn is_end_of_score(&self) -> bool {
        self.pointed == Pointed::EndOfScore
    }
}
