//! # Navigator Module
//!
//! Cursor over a built [`Timeline`](crate::timeline::Timeline) for editing and
//! playback front ends.
//!
//! ## Purpose
//! The navigator walks the staff objects of a score one position at a time,
//! restricted to one voice per staff, and reports where it stands:
//! 1. **Real positions** - an indexed event
//! 2. **Empty places** - a time where another voice has content and the
//!    active voice has none
//! 3. **End positions** - past the last object of a staff, or of the score
//!
//! ## Sub-modules
//! - `state` - Pointed, CursorState value types
//! - `engine` - Navigator state machine
//! - `timing` - TimeInfo snapshot
//!
//! ## Example
//! ```rust
//! use gen_timeline::{index_score, Navigator, Pointed};
//!
//! let source = r#"
//! instruments:
//!   - events:
//!       - clef: G
//!       - time: 2/4
//!       - note: q
//!       - rest: q
//!       - barline: simple
//!       - note: q
//! "#;
//! let timeline = index_score(source)?;
//! let mut nav = Navigator::new(&timeline);
//!
//! nav.to_measure(1);
//! let state = nav.get_state();
//! assert_eq!(state.time, 128.0);
//! assert!(matches!(state.pointed, Pointed::Real(_)));
//!
//! nav.move_next();
//! assert!(nav.is_at_end_of_score());
//! assert_eq!(nav.get_time_info().current_time, 192.0);
//! # Ok::<(), gen_timeline::TimelineError>(())
//! ```
//!
//! ## Voice Selection
//!
//! The selected voice is sticky: it applies to every staff that uses it. A
//! staff without the selected voice shows the voice of its first event when it
//! has several, and every object when it has only one. Voice-independent objects (clefs,
//! signatures, barlines) are always visited.
//!
//! ## Lifecycle
//!
//! A navigator borrows its timeline, so the timeline cannot be rebuilt while a
//! navigator is alive. After a rebuild, create a fresh navigator and
//! re-acquire the old position with `reset_and_point_to` or
//! `reset_and_point_after`; a [`CursorState`] captured before the rebuild is
//! no longer valid.

mod engine;
mod state;
mod timing;
mod view;

#[cfg(test)]
mod tests;

pub use engine::Navigator;
pub use state::{CursorState, Pointed};
pub use timing::TimeInfo;
