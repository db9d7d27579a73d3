pub mod context;
pub mod error;
pub mod loader;
pub mod navigator;
pub mod semantic;
pub mod time;
pub mod timeline;
pub mod tree;

pub use context::ScoreContext;
pub use error::*;
pub use loader::{load_score, load_tree, LoadedScore};
pub use navigator::{CursorState, Navigator, Pointed, TimeInfo};
pub use semantic::validate;
pub use time::TimeUnits;
pub use timeline::{build, build_with, Entry, EntryKind, OrderPriority, Slot, Successor, Timeline};
pub use tree::*;

/// Index a YAML tree description.
/// This is the main entry point for the library.
pub fn index_score(source: &str) -> Result<Timeline, TimelineError> {
    let loaded = load_score(source)?;
    build_with(&loaded.tree, &loaded.context)
}
