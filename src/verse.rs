//! The result of scanning one line.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which path produced a record's scansion, or why none was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Note {
    Positionally,
    TooShort,
    TooLong,
    InvalidSyllables,
    InvertedAmphibrachs,
    InvalidStart,
    InvalidFifthFoot,
    FeetToSpondees,
    ClosestPattern,
    AllDactyls,
    AllSpondees,
    FifthFootDactyl,
    DactylChain,
    OptionalTransform,
    NoRepair,
}

impl Note {
    pub fn message(&self) -> &'static str {
        match self {
            Note::Positionally => "Valid by positional stresses.",
            Note::TooShort => "Line too short: fewer than 12 syllables.",
            Note::TooLong => "Line too long: more than 17 syllables.",
            Note::InvalidSyllables => "Stress positions collide; invalid syllables.",
            Note::InvertedAmphibrachs => "Inverted amphibrachs corrected.",
            Note::InvalidStart => "Invalid hexameter start corrected.",
            Note::InvalidFifthFoot => "Invalid 5th foot corrected.",
            Note::FeetToSpondees => "Invalid feet corrected to spondees.",
            Note::ClosestPattern => "Corrected to the closest valid pattern.",
            Note::AllDactyls => "17 syllables, all dactyls.",
            Note::AllSpondees => "12 syllables, all spondees.",
            Note::FifthFootDactyl => "13 syllables, spondees with a 5th-foot dactyl.",
            Note::DactylChain => "Dactyl chain smoothed.",
            Note::OptionalTransform => "Optional i to j transformation applied.",
            Note::NoRepair => "No repair succeeded.",
        }
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Field tuple of a [`VerseRecord`], in declaration order.
pub type VerseParts = (
    String,
    String,
    Vec<String>,
    usize,
    String,
    bool,
    String,
    Vec<String>,
);

/// Immutable scan result.
///
/// `scansion` is aligned character for character with `working_line`, and
/// both are as long as `original`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerseRecord {
    original: String,
    working_line: String,
    syllables: Vec<String>,
    syllable_count: usize,
    scansion: String,
    valid: bool,
    accented: String,
    notes: Vec<String>,
}

impl VerseRecord {
    pub(crate) fn new(
        original: String,
        working_line: String,
        syllables: Vec<String>,
        scansion: String,
        valid: bool,
        accented: String,
        notes: &[Note],
    ) -> Self {
        Self {
            original,
            working_line,
            syllable_count: syllables.len(),
            syllables,
            scansion,
            valid,
            accented,
            notes: notes.iter().map(|n| n.message().to_string()).collect(),
        }
    }

    pub fn from_parts(parts: VerseParts) -> Self {
        let (original, working_line, syllables, syllable_count, scansion, valid, accented, notes) =
            parts;
        Self {
            original,
            working_line,
            syllables,
            syllable_count,
            scansion,
            valid,
            accented,
            notes,
        }
    }

    pub fn into_parts(self) -> VerseParts {
        (
            self.original,
            self.working_line,
            self.syllables,
            self.syllable_count,
            self.scansion,
            self.valid,
            self.accented,
            self.notes,
        )
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    /// The line after punctuation removal, i→j, elision and accenting.
    pub fn working_line(&self) -> &str {
        &self.working_line
    }

    pub fn syllables(&self) -> &[String] {
        &self.syllables
    }

    pub fn syllable_count(&self) -> usize {
        self.syllable_count
    }

    pub fn scansion(&self) -> &str {
        &self.scansion
    }

    pub fn valid(&self) -> bool {
        self.valid
    }

    pub fn accented(&self) -> &str {
        &self.accented
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn has_note(&self, note: Note) -> bool {
        self.notes.iter().any(|n| n == note.message())
    }
}
