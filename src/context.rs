//! # Score Context
//!
//! Explicit settings handed to the timeline builder and the navigator. Nothing
//! in the crate reads global state; everything configurable lives here.
//!
//! The context is usually read from the `settings:` block of a YAML tree
//! description:
//!
//! ```yaml
//! settings:
//!   default-time-signature: 3/4
//!   initial-voice: 2
//! ```

use crate::error::TimelineError;
use crate::tree::TimeSignature;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreContext {
    /// Meter assumed for timing queries before any time signature is seen
    pub default_time_signature: TimeSignature,
    /// Voice the navigator starts filtered to (None = voice of each staff's first event)
    pub initial_voice: Option<u8>,
}

impl Default for ScoreContext {
    fn default() -> Self {
        Self {
            default_time_signature: TimeSignature::default(),
            initial_voice: None,
        }
    }
}

/// Raw settings for YAML deserialization
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RawSettings {
    pub default_time_signature: Option<String>,
    pub initial_voice: Option<u8>,
}

impl ScoreContext {
    pub fn from_raw(raw: &RawSettings) -> Result<Self, TimelineError> {
        let default_time_signature = match &raw.default_time_signature {
            Some(ts) => TimeSignature::from_str(ts).ok_or_else(|| {
                TimelineError::ConfigError(format!("Invalid time signature: {}", ts))
            })?,
            None => TimeSignature::default(),
        };
        Ok(Self {
            default_time_signature,
            initial_voice: raw.initial_voice,
        })
    }

    /// Parse a standalone settings document
    pub fn from_yaml(content: &str) -> Result<Self, TimelineError> {
        let raw: RawSettings = serde_yaml::from_str(content)
            .map_err(|e| TimelineError::ConfigError(e.to_string()))?;
        Self::from_raw(&raw)
    }
}
