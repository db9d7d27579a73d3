//! Filtered view of one staff, kept by the navigator between moves

use crate::time::{time_key, TimeUnits};
use crate::timeline::{Slot, Timeline};
use std::collections::HashMap;

/// Slots of a staff under one voice filter, with lookups from timeline
/// positions and (time, measure) places to slot indexes
#[derive(Debug, Clone, Default)]
pub(crate) struct StaffView {
    slots: Vec<Slot>,
    by_position: HashMap<usize, usize>,
    /// Slot indexes at each (time key, measure), in view order
    by_place: HashMap<(i64, usize), Vec<usize>>,
}

impl StaffView {
    pub(crate) fn new(timeline: &Timeline, instrument: usize, staff: usize, filter: Option<u8>) -> Self {
        let slots = timeline.entries_for(instrument, staff, filter);
        let mut by_position = HashMap::with_capacity(slots.len());
        let mut by_place: HashMap<(i64, usize), Vec<usize>> = HashMap::new();
        for (i, slot) in slots.iter().enumerate() {
            if let Some(pos) = slot.position() {
                by_position.insert(pos, i);
            }
            by_place
                .entry((time_key(slot.time()), slot.measure()))
                .or_default()
                .push(i);
        }
        tracing::trace!(
            "Loaded view of staff {}.{} (filter {:?}): {} slots",
            instrument,
            staff,
            filter,
            slots.len()
        );
        Self {
            slots,
            by_position,
            by_place,
        }
    }

    pub(crate) fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot holding a timeline position
    pub(crate) fn slot_of(&self, position: usize) -> Option<usize> {
        self.by_position.get(&position).copied()
    }

    /// Slots at a (time, measure) place
    pub(crate) fn at_place(&self, time: TimeUnits, measure: usize) -> &[usize] {
        self.by_place
            .get(&(time_key(time), measure))
            .map(|slots| slots.as_slice())
            .unwrap_or(&[])
    }
}
