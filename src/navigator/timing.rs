//! Timing snapshot at the cursor

use super::engine::Navigator;
use crate::time::{TimeUnits, TIME_TOLERANCE};
use serde::Serialize;

/// Timing of the current position, recomputed on every query
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeInfo {
    pub current_time: TimeUnits,
    /// Duration of the whole score (longest staff)
    pub total_duration: TimeUnits,
    /// Beat of the meter in effect; a dotted beat in compound meters
    pub beat_duration: TimeUnits,
    pub measure_start_time: TimeUnits,
}

impl TimeInfo {
    /// Beats elapsed since the start of the current measure
    pub fn beats_from_measure_start(&self) -> f64 {
        if self.beat_duration < TIME_TOLERANCE {
            return 0.0;
        }
        ((self.current_time - self.measure_start_time) / self.beat_duration).max(0.0)
    }
}

impl<'a> Navigator<'a> {
    /// Timing snapshot at the cursor
    pub fn get_time_info(&self) -> TimeInfo {
        let state = self.get_state();
        let timeline = self.timeline();
        let meter = timeline
            .time_signature_at(state.instrument, state.staff, state.time, state.measure)
            .unwrap_or(self.context().default_time_signature);

        TimeInfo {
            current_time: state.time,
            total_duration: timeline.score_duration(),
            beat_duration: meter.beat_duration(),
            measure_start_time: timeline.measure_start(state.instrument, state.staff, state.measure),
        }
    }
}
