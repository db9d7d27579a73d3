//! # Event Tree Types
//!
//! This module defines the notated-event tree the timeline is built from.
//!
//! ## Type Hierarchy
//! ```text
//! EventTree
//!   ├── next_id (monotonic, ids are never reused)
//!   └── Vec<Instrument>
//!         ├── num_staves / num_voices (declared bounds)
//!         └── Vec<Event> (tree order)
//!               ├── id: EventId
//!               ├── voice: u8 (0 = voice-independent)
//!               ├── staff: u8 (0-based)
//!               ├── chord: ChordRole (None | Base | Member { base })
//!               └── kind: EventKind
//!                     ├── Clef | Key | Time        (prolog)
//!                     ├── Note | Rest              (timed content)
//!                     ├── Barline                  (closes a measure)
//!                     ├── Direction | Other        (zero duration)
//!                     └── Shift                    (pseudo-event, never indexed)
//! ```
//!
//! ## Key Concepts
//!
//! ### Durations
//! - A quarter note lasts 64 time units (see [`crate::time`])
//! - **Base value** + **dots** + **tuplet** = actual duration
//! - Example: Dotted quarter = `64 * 1.5 = 96`
//! - Example: Eighth note triplet = `32 * (2/3) = 21.33`
//!
//! ### Relations
//! Chords, ties and beams are plain id references. The tree resolves them
//! ([`EventTree::chord_members`], [`EventTree::tied_next`],
//! [`EventTree::beam_members`]); nothing holds pointers into the tree.
//!
//! ### Shared Events
//! Key signatures, time signatures and barlines apply to every staff of their
//! instrument. They live once in the tree and are indexed once per staff.

use crate::error::TimelineError;
use crate::time::*;
use serde::Serialize;
use std::fmt;

/// Stable identifier of an event in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Time signature (e.g., 4/4, 3/4, 6/8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSignature {
    pub beats: u8,
    pub beat_type: u8,
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self {
            beats: 4,
            beat_type: 4,
        }
    }
}

impl TimeSignature {
    pub fn new(beats: u8, beat_type: u8) -> Self {
        Self { beats, beat_type }
    }

    /// Parse "N/D", e.g. "3/4" or "6/8"
    pub fn from_str(s: &str) -> Option<Self> {
        let (beats, beat_type) = s.trim().split_once('/')?;
        let beats: u8 = beats.trim().parse().ok()?;
        let beat_type: u8 = beat_type.trim().parse().ok()?;
        if beats == 0 || beat_type == 0 || !beat_type.is_power_of_two() {
            return None;
        }
        Some(Self { beats, beat_type })
    }

    /// 6/8, 9/8, 12/8, 6/4 ... group the denominator unit in threes.
    pub fn is_compound(&self) -> bool {
        self.beats > 3 && self.beats % 3 == 0
    }

    /// Duration of one metrical beat.
    /// In 4/4 the beat is a quarter (64); in 6/8 it is a dotted quarter (96).
    pub fn beat_duration(&self) -> TimeUnits {
        let unit = TIME_WHOLE / self.beat_type as f64;
        if self.is_compound() {
            unit * 3.0
        } else {
            unit
        }
    }

    /// Nominal duration of a full measure.
    pub fn measure_duration(&self) -> TimeUnits {
        TIME_WHOLE * self.beats as f64 / self.beat_type as f64
    }
}

/// Mode for key signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Mode {
    #[default]
    Major,
    Minor,
}

/// Key signature (number of sharps/flats)
/// Positive = sharps, Negative = flats, Zero = C major / A minor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct KeySignature {
    pub fifths: i8, // -7 to +7 (flats to sharps)
    pub mode: Mode,
}

impl KeySignature {
    /// Parse a key name like "G", "Bb", "F#" or a minor key like "Am", "Ebm".
    pub fn from_str(s: &str) -> Option<Self> {
        let trimmed = s.trim();

        if trimmed.ends_with('m') && trimmed.len() > 1 {
            let fifths = match &trimmed[..trimmed.len() - 1] {
                "A" => 0,
                "E" => 1,
                "B" => 2,
                "F#" => 3,
                "C#" => 4,
                "G#" => 5,
                "D#" => 6,
                "A#" => 7,
                "D" => -1,
                "G" => -2,
                "C" => -3,
                "F" => -4,
                "Bb" => -5,
                "Eb" => -6,
                "Ab" => -7,
                _ => return None,
            };
            return Some(Self { fifths, mode: Mode::Minor });
        }

        let fifths = match trimmed {
            "C" => 0,
            "G" => 1,
            "D" => 2,
            "A" => 3,
            "E" => 4,
            "B" => 5,
            "F#" => 6,
            "C#" => 7,
            "F" => -1,
            "Bb" => -2,
            "Eb" => -3,
            "Ab" => -4,
            "Db" => -5,
            "Gb" => -6,
            "Cb" => -7,
            _ => return None,
        };
        Some(Self { fifths, mode: Mode::Major })
    }
}

/// Clef shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Clef {
    #[default]
    Treble,
    Bass,
    Alto,
    Tenor,
    Percussion,
}

impl Clef {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "g" | "treble" => Some(Clef::Treble),
            "f" | "bass" => Some(Clef::Bass),
            "c" | "alto" => Some(Clef::Alto),
            "tenor" => Some(Clef::Tenor),
            "percussion" | "perc" => Some(Clef::Percussion),
            _ => None,
        }
    }
}

/// Note names A through G
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum NoteName {
    #[default]
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

/// Sounding pitch of a note: step, chromatic alteration and octave (C4 = middle C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pitch {
    pub name: NoteName,
    pub alter: i8,
    pub octave: i8,
}

impl Pitch {
    /// Parse "C4", "F#5", "Bb3", "Ebb2"
    pub fn from_str(s: &str) -> Option<Self> {
        let mut chars = s.trim().chars().peekable();
        let name = match chars.next()?.to_ascii_uppercase() {
            'C' => NoteName::C,
            'D' => NoteName::D,
            'E' => NoteName::E,
            'F' => NoteName::F,
            'G' => NoteName::G,
            'A' => NoteName::A,
            'B' => NoteName::B,
            _ => return None,
        };
        let mut alter = 0i8;
        while let Some(&c) = chars.peek() {
            match c {
                '#' => alter += 1,
                'b' => alter -= 1,
                _ => break,
            }
            chars.next();
        }
        let octave: i8 = chars.collect::<String>().parse().ok()?;
        Some(Self { name, alter, octave })
    }
}

/// Written note value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum NoteType {
    Whole,
    Half,
    #[default]
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
    SixtyFourth,
    OneTwentyEighth,
}

impl NoteType {
    /// Undotted duration in time units
    pub fn base_duration(&self) -> TimeUnits {
        match self {
            NoteType::Whole => TIME_WHOLE,
            NoteType::Half => TIME_HALF,
            NoteType::Quarter => TIME_QUARTER,
            NoteType::Eighth => TIME_EIGHTH,
            NoteType::Sixteenth => TIME_16TH,
            NoteType::ThirtySecond => TIME_32ND,
            NoteType::SixtyFourth => TIME_64TH,
            NoteType::OneTwentyEighth => TIME_128TH,
        }
    }

    /// Single-letter code: w h q e s t x o
    pub fn from_code(c: char) -> Option<Self> {
        match c {
            'w' => Some(NoteType::Whole),
            'h' => Some(NoteType::Half),
            'q' => Some(NoteType::Quarter),
            'e' => Some(NoteType::Eighth),
            's' => Some(NoteType::Sixteenth),
            't' => Some(NoteType::ThirtySecond),
            'x' => Some(NoteType::SixtyFourth),
            'o' => Some(NoteType::OneTwentyEighth),
            _ => None,
        }
    }
}

/// Tuplet ratio (e.g., triplet = 3 notes in the time of 2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tuplet {
    pub actual_notes: u8,
    pub normal_notes: u8,
}

impl Tuplet {
    /// Standard tuplet: 3 in the time of 2, 5/6/7 in the time of 4
    pub fn new(actual_notes: u8) -> Self {
        let normal_notes = if actual_notes <= 4 {
            actual_notes.saturating_sub(1).max(1)
        } else {
            4
        };
        Self {
            actual_notes,
            normal_notes,
        }
    }
}

/// Note value with dots and tuplet modification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct NoteValue {
    pub note_type: NoteType,
    pub dots: u8,
    pub tuplet: Option<Tuplet>,
}

impl NoteValue {
    pub fn new(note_type: NoteType) -> Self {
        Self {
            note_type,
            dots: 0,
            tuplet: None,
        }
    }

    pub fn dotted(note_type: NoteType, dots: u8) -> Self {
        Self {
            note_type,
            dots,
            tuplet: None,
        }
    }

    /// Parse "q", "h.", "e..", "e/3" (eighth triplet)
    pub fn from_code(s: &str) -> Option<Self> {
        let s = s.trim();
        let (head, tuplet) = match s.split_once('/') {
            Some((head, t)) => (head, Some(Tuplet::new(t.parse().ok()?))),
            None => (s, None),
        };
        let mut chars = head.chars();
        let note_type = NoteType::from_code(chars.next()?)?;
        let rest: String = chars.collect();
        if !rest.chars().all(|c| c == '.') {
            return None;
        }
        Some(Self {
            note_type,
            dots: rest.len() as u8,
            tuplet,
        })
    }

    /// Actual duration including dots and tuplet ratio
    pub fn duration(&self) -> TimeUnits {
        let base = self.note_type.base_duration();
        let mut total = base;
        let mut add = base;
        for _ in 0..self.dots {
            add /= 2.0;
            total += add;
        }
        match self.tuplet {
            Some(t) if t.actual_notes > 0 => {
                total * t.normal_notes as f64 / t.actual_notes as f64
            }
            _ => total,
        }
    }
}

/// A note
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Note {
    pub pitch: Option<Pitch>,
    pub value: NoteValue,
    /// Note this one is tied to
    pub tie_next: Option<EventId>,
    /// Beam group, shared by all notes of one beam
    pub beam: Option<u32>,
}

impl Note {
    pub fn new(value: NoteValue) -> Self {
        Self {
            value,
            ..Default::default()
        }
    }
}

/// Barline styles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum BarlineType {
    #[default]
    Simple,
    Double,
    Final,
    StartRepeat,
    EndRepeat,
}

impl BarlineType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "simple" | "|" => Some(BarlineType::Simple),
            "double" | "||" => Some(BarlineType::Double),
            "final" | "|]" => Some(BarlineType::Final),
            "start-repeat" | "||:" => Some(BarlineType::StartRepeat),
            "end-repeat" | ":||" => Some(BarlineType::EndRepeat),
            _ => None,
        }
    }
}

/// Cursor adjustment pseudo-event (backup/forward)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeShift {
    /// Rewind the voice to the start of the current measure
    ToMeasureStart,
    /// Advance the voice, leaving a hole
    Forward(TimeUnits),
    /// Rewind the voice (never before the measure start)
    Back(TimeUnits),
}

/// What an event is
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Clef(Clef),
    Key(KeySignature),
    Time(TimeSignature),
    Note(Note),
    Rest(NoteValue),
    Barline(BarlineType),
    Direction(String),
    Shift(TimeShift),
    Other,
}

/// Chord membership
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChordRole {
    #[default]
    None,
    /// First note of a chord; the only one that is indexed
    Base,
    /// Other notes of the chord, sharing the base's time
    Member { base: EventId },
}

/// A notated event
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: EventId,
    pub kind: EventKind,
    pub voice: u8,
    pub staff: u8,
    pub chord: ChordRole,
}

impl Event {
    /// Duration in time units; zero for anything that is not a note or rest
    pub fn duration(&self) -> TimeUnits {
        match &self.kind {
            EventKind::Note(note) => note.value.duration(),
            EventKind::Rest(value) => value.duration(),
            _ => 0.0,
        }
    }

    pub fn is_measure_boundary(&self) -> bool {
        matches!(self.kind, EventKind::Barline(_))
    }

    /// Key, time and barline events apply to every staff of the instrument
    pub fn is_instrument_wide(&self) -> bool {
        matches!(
            self.kind,
            EventKind::Key(_) | EventKind::Time(_) | EventKind::Barline(_)
        )
    }

    pub fn is_chord_member(&self) -> bool {
        matches!(self.chord, ChordRole::Member { .. })
    }
}

/// Description of an event to add to the tree; the tree assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSpec {
    pub kind: EventKind,
    pub voice: u8,
    pub staff: u8,
    pub chord: ChordRole,
}

impl EventSpec {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            voice: 0,
            staff: 0,
            chord: ChordRole::None,
        }
    }

    pub fn note(value: NoteValue) -> Self {
        Self::new(EventKind::Note(Note::new(value))).voice(1)
    }

    pub fn rest(value: NoteValue) -> Self {
        Self::new(EventKind::Rest(value)).voice(1)
    }

    pub fn voice(mut self, voice: u8) -> Self {
        self.voice = voice;
        self
    }

    pub fn staff(mut self, staff: u8) -> Self {
        self.staff = staff;
        self
    }

    pub fn chord(mut self, chord: ChordRole) -> Self {
        self.chord = chord;
        self
    }
}

/// One instrument (part): declared bounds plus its events in tree order
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    pub name: String,
    pub num_staves: u8,
    /// Highest voice number allowed; voices run 1..=num_voices
    pub num_voices: u8,
    pub events: Vec<Event>,
}

/// The whole score
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventTree {
    instruments: Vec<Instrument>,
    next_id: u64,
}

impl EventTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an instrument and return its index
    pub fn add_instrument(&mut self, name: &str, num_staves: u8, num_voices: u8) -> usize {
        self.instruments.push(Instrument {
            name: name.to_string(),
            num_staves,
            num_voices,
            events: Vec::new(),
        });
        self.instruments.len() - 1
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn instrument(&self, index: usize) -> Option<&Instrument> {
        self.instruments.get(index)
    }

    fn allocate_id(&mut self) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        id
    }

    fn make_event(&mut self, spec: EventSpec) -> Event {
        Event {
            id: self.allocate_id(),
            kind: spec.kind,
            voice: spec.voice,
            staff: spec.staff,
            chord: spec.chord,
        }
    }

    /// Append an event at the end of an instrument
    pub fn append(&mut self, instrument: usize, spec: EventSpec) -> Result<EventId, TimelineError> {
        if instrument >= self.instruments.len() {
            return Err(TimelineError::ConfigError(format!(
                "Instrument {} does not exist",
                instrument
            )));
        }
        let event = self.make_event(spec);
        let id = event.id;
        self.instruments[instrument].events.push(event);
        Ok(id)
    }

    /// Insert an event right before `anchor`, in the anchor's instrument
    pub fn insert_before(&mut self, anchor: EventId, spec: EventSpec) -> Result<EventId, TimelineError> {
        let (instr, pos) = self.locate(anchor).ok_or(TimelineError::UnknownEvent(anchor))?;
        let event = self.make_event(spec);
        let id = event.id;
        self.instruments[instr].events.insert(pos, event);
        Ok(id)
    }

    /// Insert an event right after `anchor`, in the anchor's instrument
    pub fn insert_after(&mut self, anchor: EventId, spec: EventSpec) -> Result<EventId, TimelineError> {
        let (instr, pos) = self.locate(anchor).ok_or(TimelineError::UnknownEvent(anchor))?;
        let event = self.make_event(spec);
        let id = event.id;
        self.instruments[instr].events.insert(pos + 1, event);
        Ok(id)
    }

    /// Remove an event.
    ///
    /// Removing a chord base promotes its first member to base. Ties pointing
    /// at the removed event are cleared.
    pub fn remove(&mut self, id: EventId) -> Result<Event, TimelineError> {
        let (instr, pos) = self.locate(id).ok_or(TimelineError::UnknownEvent(id))?;
        let removed = self.instruments[instr].events.remove(pos);

        if removed.chord == ChordRole::Base {
            let mut new_base: Option<EventId> = None;
            for event in self.instruments[instr].events.iter_mut() {
                if event.chord == (ChordRole::Member { base: id }) {
                    match new_base {
                        None => {
                            event.chord = ChordRole::Base;
                            new_base = Some(event.id);
                        }
                        Some(base) => event.chord = ChordRole::Member { base },
                    }
                }
            }
            // a lone remaining note is no longer a chord
            if let Some(base) = new_base {
                let has_members = self.instruments[instr]
                    .events
                    .iter()
                    .any(|e| e.chord == ChordRole::Member { base });
                if !has_members {
                    if let Some(event) = self.instruments[instr].events.iter_mut().find(|e| e.id == base) {
                        event.chord = ChordRole::None;
                    }
                }
            }
        }

        for event in self.instruments[instr].events.iter_mut() {
            if let EventKind::Note(note) = &mut event.kind {
                if note.tie_next == Some(id) {
                    note.tie_next = None;
                }
            }
        }

        Ok(removed)
    }

    /// (instrument index, position in the instrument's events)
    pub fn locate(&self, id: EventId) -> Option<(usize, usize)> {
        self.instruments.iter().enumerate().find_map(|(i, instr)| {
            instr.events.iter().position(|e| e.id == id).map(|pos| (i, pos))
        })
    }

    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.locate(id).map(|(i, pos)| &self.instruments[i].events[pos])
    }

    pub fn get_mut(&mut self, id: EventId) -> Option<&mut Event> {
        self.locate(id).map(move |(i, pos)| &mut self.instruments[i].events[pos])
    }

    /// Non-base notes of the chord whose base is `base`, in tree order
    pub fn chord_members(&self, base: EventId) -> Vec<EventId> {
        match self.locate(base) {
            Some((instr, _)) => self.instruments[instr]
                .events
                .iter()
                .filter(|e| e.chord == ChordRole::Member { base })
                .map(|e| e.id)
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn tied_next(&self, id: EventId) -> Option<EventId> {
        match &self.get(id)?.kind {
            EventKind::Note(note) => note.tie_next,
            _ => None,
        }
    }

    /// Notes of one beam group within an instrument, in tree order
    pub fn beam_members(&self, instrument: usize, beam: u32) -> Vec<EventId> {
        self.instruments
            .get(instrument)
            .map(|instr| {
                instr
                    .events
                    .iter()
                    .filter(|e| matches!(&e.kind, EventKind::Note(n) if n.beam == Some(beam)))
                    .map(|e| e.id)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Total number of events, chord members and shifts included
    pub fn num_events(&self) -> usize {
        self.instruments.iter().map(|i| i.events.len()).sum()
    }
}
