//! # Timeline Module
//!
//! Index every staff object of an event tree by absolute time.
//!
//! ## Sub-modules
//! - `types` - Entry, EntryKind, OrderPriority, Slot, Successor
//! - `builder` - Tree walk assigning times and measures
//! - `store` - Timeline storage, per-staff indexes, filtered views, rebuilds
//!
//! ## Ordering
//!
//! Entries are sorted by time, then measure, then priority (clef, key, time
//! signature, content, barline), then instrument and staff. Simultaneous
//! entries with the same key keep their tree order.
//!
//! ## Shared Objects
//!
//! Key signatures, time signatures and barlines belong to the whole
//! instrument. They are indexed once per staff, so a two-staff instrument has
//! two entries for each of them, both with the same event id.
//!
//! ## Example
//! ```rust
//! use gen_timeline::{build, load_tree};
//!
//! let tree = load_tree(r#"
//! instruments:
//!   - name: Piano
//!     staves: 2
//!     voices: 2
//!     events:
//!       - clef: G
//!       - clef: F
//!         staff: 1
//!       - note: h
//!       - note: w
//!         staff: 1
//!         voice: 2
//!       - barline: simple
//! "#)?;
//! let timeline = build(&tree)?;
//!
//! // barline at the end of the longest staff, once on each staff
//! assert_eq!(timeline.total_duration(0, 0), 256.0);
//! assert_eq!(timeline.num_measures(0, 1), 1);
//! assert_eq!(timeline.staff_positions(0, 0).len(), 3);
//! # Ok::<(), gen_timeline::TimelineError>(())
//! ```

mod builder;
mod store;
mod types;


pub use builder::{build, build_with};
pub use store::Timeline;
pub use types::{Entry, EntryKind, OrderPriority, Slot, Successor};
