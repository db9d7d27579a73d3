//! # Error Types
//!
//! This module defines all error types for the timeline crate.
//!
//! Navigation never fails: a missing target id resolves to `EndOfScore` and an
//! out-of-range measure or time clamps to `EndOfStaff`/`EndOfScore`. The errors
//! here are reserved for input that cannot be indexed at all.
//!
//! ## Error Types
//! - `MalformedTree` - An event violates the declared bounds of its instrument
//! - `ConfigError` - Invalid YAML tree description or settings
//! - `UnknownEvent` - A tree edit referenced an id that is not in the tree
//!
//! ## Usage
//! ```rust
//! use gen_timeline::{index_score, TimelineError};
//!
//! let source = "instruments: []";
//! match index_score(source) {
//!     Ok(timeline) => println!("{} entries", timeline.len()),
//!     Err(TimelineError::MalformedTree { instrument, event, message }) => {
//!         eprintln!("Instrument {}, event {}: {}", instrument, event, message);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use crate::tree::EventId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimelineError {
    /// Structural error in the event tree.
    ///
    /// Occurs during validation or timeline construction when an event uses a
    /// staff or voice outside the instrument's declared range, or a relation
    /// (chord, tie) points at an event that cannot be its partner.
    ///
    /// # Example
    /// ```
    /// # use gen_timeline::{EventId, TimelineError};
    /// let err = TimelineError::MalformedTree {
    ///     instrument: 0,
    ///     event: EventId(7),
    ///     message: "staff 2 is outside the 2 declared staves".to_string(),
    /// };
    /// assert_eq!(
    ///     err.to_string(),
    ///     "Malformed tree in instrument 0 at event #7: staff 2 is outside the 2 declared staves"
    /// );
    /// ```
    #[error("Malformed tree in instrument {instrument} at event {event}: {message}")]
    MalformedTree {
        instrument: usize,
        event: EventId,
        message: String,
    },

    /// Invalid tree description or settings.
    ///
    /// # Example
    /// ```
    /// # use gen_timeline::TimelineError;
    /// let err = TimelineError::ConfigError("time signature must be in format N/D".to_string());
    /// assert_eq!(err.to_string(), "Invalid configuration: time signature must be in format N/D");
    /// ```
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// A tree edit referenced an event that does not exist.
    #[error("Unknown event {0}")]
    UnknownEvent(EventId),
}
