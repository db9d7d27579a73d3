//! # YAML Tree Loader
//!
//! Builds an [`EventTree`] (plus its [`ScoreContext`]) from a YAML description.
//! The timeline itself never parses anything; this loader exists for the CLI
//! and for test fixtures.
//!
//! ## Format
//! ```yaml
//! settings:
//!   default-time-signature: 4/4
//! instruments:
//!   - name: Piano
//!     staves: 2
//!     voices: 2
//!     events:
//!       - clef: G
//!       - clef: F
//!         staff: 1
//!       - key: C
//!       - time: 2/4
//!       - note: q          # w h q e s t x o, dots, /3 for triplets
//!         pitch: C4
//!         label: first     # optional name, see LoadedScore::id
//!       - note: q
//!         pitch: E4
//!         chord: true      # joins the chord of the previous note
//!       - rest: q
//!       - shift: start     # start | forward <value> | back <value>
//!         voice: 2
//!       - barline: simple
//! ```
//!
//! Notes and rests default to voice 1, everything else to voice 0. Staff
//! defaults to 0. Exactly one kind field (`clef`, `key`, `time`, `note`,
//! `rest`, `barline`, `direction`, `shift`, `other`) must be present per event.

use crate::context::{RawSettings, ScoreContext};
use crate::error::TimelineError;
use crate::tree::*;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct RawScore {
    settings: Option<RawSettings>,
    #[serde(default)]
    instruments: Vec<RawInstrument>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct RawInstrument {
    #[serde(default)]
    name: String,
    staves: Option<u8>,
    voices: Option<u8>,
    #[serde(default)]
    events: Vec<RawEvent>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawEvent {
    clef: Option<String>,
    key: Option<String>,
    time: Option<String>,
    note: Option<String>,
    rest: Option<String>,
    barline: Option<String>,
    direction: Option<String>,
    shift: Option<String>,
    other: Option<serde_yaml::Value>,
    pitch: Option<String>,
    voice: Option<u8>,
    staff: Option<u8>,
    #[serde(default)]
    chord: bool,
    #[serde(default)]
    tie: bool,
    beam: Option<u32>,
    label: Option<String>,
}

/// A loaded tree with its settings and event labels
#[derive(Debug, Clone)]
pub struct LoadedScore {
    pub tree: EventTree,
    pub context: ScoreContext,
    pub labels: HashMap<String, EventId>,
}

impl LoadedScore {
    /// Id of a labelled event
    pub fn id(&self, label: &str) -> Option<EventId> {
        self.labels.get(label).copied()
    }
}

/// Parse a YAML tree description
pub fn load_score(source: &str) -> Result<LoadedScore, TimelineError> {
    let raw: RawScore =
        serde_yaml::from_str(source).map_err(|e| TimelineError::ConfigError(e.to_string()))?;

    let context = match &raw.settings {
        Some(settings) => ScoreContext::from_raw(settings)?,
        None => ScoreContext::default(),
    };

    let mut tree = EventTree::new();
    let mut labels = HashMap::new();

    for (index, raw_instr) in raw.instruments.iter().enumerate() {
        let name = if raw_instr.name.is_empty() {
            format!("Instrument {}", index + 1)
        } else {
            raw_instr.name.clone()
        };
        let instr = tree.add_instrument(
            &name,
            raw_instr.staves.unwrap_or(1),
            raw_instr.voices.unwrap_or(1),
        );

        // target of the next `chord: true`
        let mut last_note: Option<EventId> = None;
        let mut pending_ties: Vec<EventId> = Vec::new();

        for (pos, raw_event) in raw_instr.events.iter().enumerate() {
            let kind = parse_kind(raw_event, index, pos)?;
            let is_note = matches!(kind, EventKind::Note(_));
            let default_voice = if matches!(kind, EventKind::Note(_) | EventKind::Rest(_)) { 1 } else { 0 };
            let mut spec = EventSpec::new(kind)
                .voice(raw_event.voice.unwrap_or(default_voice))
                .staff(raw_event.staff.unwrap_or(0));

            if raw_event.chord {
                let prev = match (is_note, last_note) {
                    (true, Some(prev)) => prev,
                    _ => {
                        return Err(TimelineError::ConfigError(format!(
                            "Instrument {}, event {}: chord note must follow another note",
                            index + 1,
                            pos + 1
                        )))
                    }
                };
                let base = match tree.get(prev).map(|e| e.chord) {
                    Some(ChordRole::Member { base }) => base,
                    _ => prev,
                };
                if let Some(event) = tree.get_mut(base) {
                    event.chord = ChordRole::Base;
                }
                spec = spec.chord(ChordRole::Member { base });
            }

            let id = tree.append(instr, spec)?;
            if is_note {
                last_note = Some(id);
            }
            if raw_event.tie {
                pending_ties.push(id);
            }
            if let Some(label) = &raw_event.label {
                if labels.insert(label.clone(), id).is_some() {
                    return Err(TimelineError::ConfigError(format!("Duplicate label: {}", label)));
                }
            }
        }

        resolve_ties(&mut tree, instr, &pending_ties)?;
    }

    Ok(LoadedScore {
        tree,
        context,
        labels,
    })
}

/// Parse a YAML tree description, discarding settings and labels
pub fn load_tree(source: &str) -> Result<EventTree, TimelineError> {
    load_score(source).map(|loaded| loaded.tree)
}

/// `tie: true` ties a note to the next note of the same voice and staff
fn resolve_ties(tree: &mut EventTree, instr: usize, tied: &[EventId]) -> Result<(), TimelineError> {
    for &from in tied {
        let target = {
            let events = &tree.instruments()[instr].events;
            let pos = events.iter().position(|e| e.id == from);
            let source = pos.map(|p| &events[p]);
            match (pos, source) {
                (Some(p), Some(src)) if matches!(src.kind, EventKind::Note(_)) => events[p + 1..]
                    .iter()
                    .find(|e| {
                        matches!(e.kind, EventKind::Note(_))
                            && !e.is_chord_member()
                            && e.voice == src.voice
                            && e.staff == src.staff
                    })
                    .map(|e| e.id),
                _ => None,
            }
        };
        let target = target.ok_or_else(|| {
            TimelineError::ConfigError(format!("Tie from event {} has no following note", from))
        })?;
        if let Some(Event { kind: EventKind::Note(note), .. }) = tree.get_mut(from) {
            note.tie_next = Some(target);
        }
    }
    Ok(())
}

fn parse_kind(raw: &RawEvent, instrument: usize, pos: usize) -> Result<EventKind, TimelineError> {
    let err = |msg: String| {
        TimelineError::ConfigError(format!("Instrument {}, event {}: {}", instrument + 1, pos + 1, msg))
    };

    let mut kinds = Vec::new();

    if let Some(s) = &raw.clef {
        kinds.push(EventKind::Clef(
            Clef::from_str(s).ok_or_else(|| err(format!("Invalid clef: {}", s)))?,
        ));
    }
    if let Some(s) = &raw.key {
        kinds.push(EventKind::Key(
            KeySignature::from_str(s).ok_or_else(|| err(format!("Invalid key signature: {}", s)))?,
        ));
    }
    if let Some(s) = &raw.time {
        kinds.push(EventKind::Time(
            TimeSignature::from_str(s).ok_or_else(|| err(format!("Invalid time signature: {}", s)))?,
        ));
    }
    if let Some(s) = &raw.note {
        let value = NoteValue::from_code(s).ok_or_else(|| err(format!("Invalid note value: {}", s)))?;
        let pitch = match &raw.pitch {
            Some(p) => Some(Pitch::from_str(p).ok_or_else(|| err(format!("Invalid pitch: {}", p)))?),
            None => None,
        };
        kinds.push(EventKind::Note(Note {
            pitch,
            value,
            tie_next: None,
            beam: raw.beam,
        }));
    }
    if let Some(s) = &raw.rest {
        kinds.push(EventKind::Rest(
            NoteValue::from_code(s).ok_or_else(|| err(format!("Invalid rest value: {}", s)))?,
        ));
    }
    if let Some(s) = &raw.barline {
        kinds.push(EventKind::Barline(
            BarlineType::from_str(s).ok_or_else(|| err(format!("Invalid barline: {}", s)))?,
        ));
    }
    if let Some(s) = &raw.direction {
        kinds.push(EventKind::Direction(s.clone()));
    }
    if let Some(s) = &raw.shift {
        kinds.push(EventKind::Shift(
            parse_shift(s).ok_or_else(|| err(format!("Invalid shift: {}", s)))?,
        ));
    }
    if raw.other.is_some() {
        kinds.push(EventKind::Other);
    }

    if kinds.len() != 1 {
        return Err(err(format!("expected exactly one event kind, found {}", kinds.len())));
    }
    Ok(kinds.remove(0))
}

/// "start", "forward q", "forward 48", "back e."
fn parse_shift(s: &str) -> Option<TimeShift> {
    let mut parts = s.split_whitespace();
    let direction = parts.next()?;
    if direction == "start" {
        return parts.next().is_none().then_some(TimeShift::ToMeasureStart);
    }
    let amount = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    let units = match amount.parse::<f64>() {
        Ok(units) if units >= 0.0 => units,
        Ok(_) => return None,
        Err(_) => NoteValue::from_code(amount)?.duration(),
    };
    match direction {
        "forward" => Some(TimeShift::Forward(units)),
        "back" => Some(TimeShift::Back(units)),
        _ => None,
    }
}
