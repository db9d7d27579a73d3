//! # Tree Validation Module
//!
//! This module validates the structural correctness of an event tree before a
//! timeline is built from it.
//!
//! ## Validation Rules
//!
//! ### Bounds
//! - Every event's staff must be below the instrument's declared staff count
//! - Every event's voice must be at most the declared voice count
//! - Notes and rests belong to a voice (voice 0 is reserved for
//!   voice-independent objects)
//!
//! ### Relations
//! - A chord member is a note whose base is an earlier chord base of the same
//!   instrument
//! - A tie points at a later note of the same instrument
//!
//! ### Shifts
//! - Forward/back amounts are finite and non-negative
//!
//! ## Entry Point
//! `validate(tree: &EventTree) -> Result<(), TimelineError>`
//!
//! ## Example
//! ```rust
//! use gen_timeline::{load_tree, validate};
//!
//! let tree = load_tree("instruments:\n  - events:\n      - note: q\n        voice: 3\n")?;
//! assert!(validate(&tree).is_err());  // only one voice declared
//! # Ok::<(), gen_timeline::TimelineError>(())
//! ```

use crate::error::TimelineError;
use crate::tree::*;
use std::collections::HashMap;

/// Validate a tree for structural correctness
pub fn validate(tree: &EventTree) -> Result<(), TimelineError> {
    for (index, instrument) in tree.instruments().iter().enumerate() {
        validate_instrument(instrument, index)?;
    }
    Ok(())
}

/// Validate one instrument; the builder calls this for partial rebuilds
pub fn validate_instrument(instrument: &Instrument, index: usize) -> Result<(), TimelineError> {
    // id -> (position, is chord base, is note)
    let mut seen: HashMap<EventId, (usize, bool, bool)> = HashMap::new();
    for (pos, event) in instrument.events.iter().enumerate() {
        seen.insert(
            event.id,
            (pos, event.chord == ChordRole::Base, matches!(event.kind, EventKind::Note(_))),
        );
    }

    for (pos, event) in instrument.events.iter().enumerate() {
        let fail = |message: String| TimelineError::MalformedTree {
            instrument: index,
            event: event.id,
            message,
        };

        if event.staff >= instrument.num_staves {
            return Err(fail(format!(
                "staff {} is outside the {} declared staves",
                event.staff, instrument.num_staves
            )));
        }
        if event.voice > instrument.num_voices {
            return Err(fail(format!(
                "voice {} is outside the {} declared voices",
                event.voice, instrument.num_voices
            )));
        }

        match &event.kind {
            EventKind::Note(note) => {
                if event.voice == 0 {
                    return Err(fail("note without a voice".to_string()));
                }
                if let Some(target) = note.tie_next {
                    match seen.get(&target) {
                        Some(&(target_pos, _, true)) if target_pos > pos => {}
                        _ => return Err(fail(format!("tie to {} is not a later note", target))),
                    }
                }
            }
            EventKind::Rest(_) => {
                if event.voice == 0 {
                    return Err(fail("rest without a voice".to_string()));
                }
            }
            EventKind::Shift(TimeShift::Forward(units)) | EventKind::Shift(TimeShift::Back(units)) => {
                if !units.is_finite() || *units < 0.0 {
                    return Err(fail(format!("invalid shift amount {}", units)));
                }
            }
            _ => {}
        }

        if let ChordRole::Member { base } = event.chord {
            if !matches!(event.kind, EventKind::Note(_)) {
                return Err(fail("only notes can join a chord".to_string()));
            }
            match seen.get(&base) {
                Some(&(base_pos, true, _)) if base_pos < pos => {}
                _ => {
                    return Err(fail(format!(
                        "chord base {} is not an earlier chord base",
                        base
                    )))
                }
            }
        }
    }

    Ok(())
}
