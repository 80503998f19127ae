//! The hexameter scanning pipeline.
//!
//! A line goes through punctuation removal, consonantal i, elision and
//! length by position, then syllabification. Known long syllables seed a
//! candidate scansion, which is validated and, if needed, passed through a
//! fixed cascade of repairs. A line the cascade cannot fix is scanned once
//! more with the permissive i→j rewrite and dactyl-chain smoothing.

use crate::constants::{default_constants, MetricalConstants};
use crate::error::ConfigError;
use crate::formatter::ScansionFormatter;
use crate::repair::ScansionRepairer;
use crate::syllabifier::Syllabifier;
use crate::text::{punctuation_to_spaces, stress_positions};
use crate::transform::LineTransformer;
use crate::validator::{MetricalValidator, MAX_HEXAMETER_LENGTH, MIN_HEXAMETER_LENGTH};
use crate::verse::{Note, VerseRecord};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, trace};
use unicode_normalization::UnicodeNormalization;

/// Fifth-foot positions a 13-syllable line leaves short.
const FIFTH_FOOT_SHORTS: [usize; 2] = [9, 10];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Settled,
    Exhausted,
}

/// Everything a single pass knows about the line.
struct Pass<'a> {
    original: &'a str,
    working: String,
    syllables: Vec<String>,
    offsets: Vec<Option<usize>>,
    stresses: BTreeSet<usize>,
    notes: Vec<Note>,
}

#[derive(Debug, Clone)]
pub struct HexameterScanner {
    constants: Arc<MetricalConstants>,
    syllabifier: Syllabifier,
    validator: MetricalValidator,
    transformer: LineTransformer,
    repairer: ScansionRepairer,
    formatter: ScansionFormatter,
}

impl Default for HexameterScanner {
    fn default() -> Self {
        Self {
            constants: default_constants(),
            syllabifier: Syllabifier::default(),
            validator: MetricalValidator::default(),
            transformer: LineTransformer::default(),
            repairer: ScansionRepairer::default(),
            formatter: ScansionFormatter::default(),
        }
    }
}

impl HexameterScanner {
    pub fn new(constants: Arc<MetricalConstants>) -> Result<Self, ConfigError> {
        Ok(Self {
            syllabifier: Syllabifier::new(Arc::clone(&constants))?,
            validator: MetricalValidator::new(Arc::clone(&constants))?,
            transformer: LineTransformer::new(Arc::clone(&constants))?,
            repairer: ScansionRepairer::new(Arc::clone(&constants))?,
            formatter: ScansionFormatter::new(Arc::clone(&constants))?,
            constants,
        })
    }

    pub fn syllabifier(&self) -> &Syllabifier {
        &self.syllabifier
    }

    pub fn validator(&self) -> &MetricalValidator {
        &self.validator
    }

    pub fn formatter(&self) -> &ScansionFormatter {
        &self.formatter
    }

    /// Scan one line of hexameter.
    ///
    /// `optional_transform` selects the permissive i→j rewrite from the
    /// start; `dactyl_smoothing` enables the last repair of the cascade.
    pub fn scan(&self, line: &str, optional_transform: bool, dactyl_smoothing: bool) -> VerseRecord {
        let original: String = line.nfc().collect();
        let (record, outcome) = self.scan_pass(&original, optional_transform, dactyl_smoothing);

        if outcome == Outcome::Exhausted && !optional_transform {
            debug!(line = %original, "retrying with permissive i to j and dactyl smoothing");
            return self.scan_pass(&original, true, true).0;
        }
        record
    }

    pub fn scan_many<'a>(
        &self,
        lines: impl IntoIterator<Item = &'a str>,
        optional_transform: bool,
        dactyl_smoothing: bool,
    ) -> Vec<VerseRecord> {
        lines
            .into_iter()
            .map(|line| self.scan(line, optional_transform, dactyl_smoothing))
            .collect()
    }

    fn scan_pass(
        &self,
        original: &str,
        permissive: bool,
        dactyl_smoothing: bool,
    ) -> (VerseRecord, Outcome) {
        let mut pass = self.prepare(original, permissive);
        let count = pass.syllables.len();

        if !(MIN_HEXAMETER_LENGTH..=MAX_HEXAMETER_LENGTH).contains(&count) {
            let note = if count < MIN_HEXAMETER_LENGTH {
                Note::TooShort
            } else {
                Note::TooLong
            };
            pass.notes.push(note);
            let blank = " ".repeat(pass.working.chars().count());
            return (self.finish(pass, blank, false), Outcome::Settled);
        }

        pass.stresses = self.seed_stresses(&pass.syllables);
        pass.offsets = self.offset_map(&pass.working, &pass.syllables);
        self.evaluate(pass, dactyl_smoothing)
    }

    /// Normalize and syllabify the line.
    fn prepare<'a>(&self, original: &'a str, permissive: bool) -> Pass<'a> {
        let spaced = punctuation_to_spaces(original);
        let working = if permissive {
            self.transformer.permissive_i_to_j(&spaced)
        } else {
            self.transformer.conservative_i_to_j(&spaced)
        };
        let working = self.transformer.elide(&working);
        let working = self.transformer.accent_by_position(&working);
        trace!(working = %working, "working line");

        let syllables = self
            .syllabifier
            .merge_lone_consonants(&self.syllabifier.syllabify(&working));

        Pass {
            original,
            offsets: Vec::new(),
            stresses: BTreeSet::new(),
            notes: if permissive {
                vec![Note::OptionalTransform]
            } else {
                Vec::new()
            },
            working,
            syllables,
        }
    }

    /// Build the candidate scansion from the seeded stresses, then validate
    /// and repair it.
    fn evaluate(&self, mut pass: Pass<'_>, dactyl_smoothing: bool) -> (VerseRecord, Outcome) {
        let candidate = self.produce_scansion(&pass, &pass.stresses);
        let marked = stress_positions(self.constants.stressed, &candidate).len();
        if marked != pass.stresses.len() {
            pass.notes.push(Note::InvalidSyllables);
            return (self.finish(pass, candidate, false), Outcome::Settled);
        }

        if self.validator.is_valid_hexameter(&candidate) {
            pass.notes.push(Note::Positionally);
            return (self.finish(pass, candidate, true), Outcome::Settled);
        }

        self.repair(pass, candidate, dactyl_smoothing)
    }

    fn repair(
        &self,
        mut pass: Pass<'_>,
        mut scansion: String,
        dactyl_smoothing: bool,
    ) -> (VerseRecord, Outcome) {
        type Repair = fn(&ScansionRepairer, &str) -> String;
        let notes_before_repair = pass.notes.len();
        let cascade: [(Repair, Note); 5] = [
            (ScansionRepairer::correct_inverted_amphibrachs, Note::InvertedAmphibrachs),
            (ScansionRepairer::correct_invalid_start, Note::InvalidStart),
            (ScansionRepairer::correct_invalid_fifth_foot, Note::InvalidFifthFoot),
            (ScansionRepairer::correct_invalid_feet, Note::FeetToSpondees),
            (ScansionRepairer::correct_inverted_amphibrachs, Note::InvertedAmphibrachs),
        ];

        for (repair, note) in cascade {
            let repaired = repair(&self.repairer, &scansion);
            if repaired != scansion {
                debug!(repair = %note, from = %scansion, to = %repaired, "repair applied");
                pass.notes.push(note);
                scansion = repaired;
            }
            if self.validator.is_valid_hexameter(&scansion) {
                return (self.finish(pass, scansion, true), Outcome::Settled);
            }
        }

        if let Some(closest) = self.repairer.closest_single_substitution(&scansion) {
            if self.validator.is_valid_hexameter(&closest) {
                debug!(from = %scansion, to = %closest, "closest template");
                pass.notes.push(Note::ClosestPattern);
                return (self.finish(pass, closest, true), Outcome::Settled);
            }
        }

        if let Some((candidate, note)) = self.syllable_count_case(&pass) {
            if self.validator.is_valid_hexameter(&candidate) {
                debug!(repair = %note, "syllable count template");
                // The template replaces every earlier repair's output.
                pass.notes.truncate(notes_before_repair);
                pass.notes.push(note);
                return (self.finish(pass, candidate, true), Outcome::Settled);
            }
        }

        if dactyl_smoothing {
            let smoothed = self.repairer.smooth_dactyl_chain(&scansion);
            if smoothed != scansion {
                debug!(from = %scansion, to = %smoothed, "dactyl chain smoothed");
                pass.notes.push(Note::DactylChain);
                scansion = smoothed;
            }
            if self.validator.is_valid_hexameter(&scansion) {
                return (self.finish(pass, scansion, true), Outcome::Settled);
            }
        }

        pass.notes.push(Note::NoRepair);
        (self.finish(pass, scansion, false), Outcome::Exhausted)
    }

    /// Line shapes fixed by their syllable count alone.
    fn syllable_count_case(&self, pass: &Pass<'_>) -> Option<(String, Note)> {
        let count = pass.syllables.len();
        let stresses: BTreeSet<usize> = match count {
            17 => self.validator.hexameter_known_stresses().into_iter().collect(),
            12 => (0..count).collect(),
            13 if FIFTH_FOOT_SHORTS
                .iter()
                .all(|idx| !pass.stresses.contains(idx)) =>
            {
                (0..count)
                    .filter(|idx| !FIFTH_FOOT_SHORTS.contains(idx))
                    .collect()
            }
            _ => return None,
        };
        let note = match count {
            17 => Note::AllDactyls,
            12 => Note::AllSpondees,
            _ => Note::FifthFootDactyl,
        };
        Some((self.produce_scansion(pass, &stresses), note))
    }

    /// Syllables known to be long before any metrical reasoning: those with a
    /// diphthong or a macron, the first, and the penultimate.
    fn seed_stresses(&self, syllables: &[String]) -> BTreeSet<usize> {
        let c = &self.constants;
        let mut stresses: BTreeSet<usize> = syllables
            .iter()
            .enumerate()
            .filter(|(_, syllable)| {
                let chars: Vec<char> = syllable.chars().collect();
                let has_diphthong = chars.windows(2).enumerate().any(|(idx, pair)| {
                    let opens_with_glide = idx > 0 && c.is_labiovelar(chars[idx - 1], pair[0]);
                    c.is_diphthong(pair[0], pair[1]) && !opens_with_glide
                });
                has_diphthong || chars.iter().any(|&ch| c.is_accented_vowel(ch))
            })
            .map(|(idx, _)| idx)
            .collect();

        stresses.insert(0);
        if let Some(penultimate) = syllables.len().checked_sub(2) {
            stresses.insert(penultimate);
        }
        stresses
    }

    /// Working-line position of each syllable's nucleus: its last vowel,
    /// ignoring the glide of `qu`.
    fn offset_map(&self, working: &str, syllables: &[String]) -> Vec<Option<usize>> {
        let line: Vec<char> = working.chars().collect();
        let mut cursor = 0;

        syllables
            .iter()
            .map(|syllable| {
                let mut nucleus = None;
                let mut prev = None;
                for ch in syllable.chars() {
                    while cursor < line.len() && line[cursor].is_whitespace() {
                        cursor += 1;
                    }
                    let glide = prev.is_some_and(|p| self.constants.is_labiovelar(p, ch));
                    if self.constants.is_vowel(ch) && !glide {
                        nucleus = Some(cursor);
                    }
                    prev = Some(ch);
                    cursor += 1;
                }
                nucleus.filter(|&pos| pos < line.len())
            })
            .collect()
    }

    /// Short marks on every nucleus, long marks on the given syllables.
    fn produce_scansion(&self, pass: &Pass<'_>, stresses: &BTreeSet<usize>) -> String {
        let mut marks = vec![' '; pass.working.chars().count()];
        for pos in pass.offsets.iter().flatten() {
            marks[*pos] = self.constants.unstressed;
        }
        for idx in stresses {
            if let Some(Some(pos)) = pass.offsets.get(*idx) {
                marks[*pos] = self.constants.stressed;
            }
        }
        marks.into_iter().collect()
    }

    fn finish(&self, pass: Pass<'_>, scansion: String, valid: bool) -> VerseRecord {
        let accented = self.formatter.merge_line_scansion(pass.original, &scansion);
        // A repair that fires twice in the cascade is noted once.
        let mut notes: Vec<Note> = Vec::with_capacity(pass.notes.len());
        for note in pass.notes {
            if !notes.contains(&note) {
                notes.push(note);
            }
        }
        VerseRecord::new(
            pass.original.to_string(),
            pass.working,
            pass.syllables,
            scansion,
            valid,
            accented,
            &notes,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMPULERIT: &str = "impulerit. Tantaene animis caelestibus irae?";

    fn scanner() -> HexameterScanner {
        HexameterScanner::default()
    }

    // ─────────────────────────────────────────────────────────────
    // Positional scansion
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn scans_by_position() {
        let record = scanner().scan(IMPULERIT, false, false);
        assert!(record.valid());
        assert_eq!(record.syllable_count(), 15);
        assert_eq!(record.scansion(), "-  U U -    -   -   U U -    - -  U U  -  - ");
        assert_eq!(record.accented(), "īmpulerīt. Tāntaene animīs caelēstibus īrae?");
        assert_eq!(record.notes(), ["Valid by positional stresses."]);
    }

    #[test]
    fn records_the_working_line_and_syllables() {
        let record = scanner().scan(IMPULERIT, false, false);
        assert_eq!(record.working_line(), "īmpulerīt  Tāntaen  animīs caelēstibus irae ");
        assert_eq!(
            record.syllables(),
            [
                "īm", "pu", "le", "rīt", "Tān", "taen", "a", "ni", "mīs", "cae", "lēs", "ti",
                "bus", "i", "rae"
            ]
        );
        assert_eq!(record.original(), IMPULERIT);
    }

    #[test]
    fn scansion_is_aligned_with_the_line() {
        let record = scanner().scan(IMPULERIT, false, false);
        let len = record.original().chars().count();
        assert_eq!(record.scansion().chars().count(), len);
        assert_eq!(record.working_line().chars().count(), len);
        assert_eq!(record.accented().chars().count(), len);
    }

    #[test]
    fn rescanning_the_accented_line_is_stable() {
        let s = scanner();
        let first = s.scan(IMPULERIT, false, false);
        let second = s.scan(first.accented(), false, false);
        assert!(second.valid());
        assert_eq!(second.scansion(), first.scansion());
    }

    #[test]
    fn decomposed_macrons_are_normalized() {
        let decomposed = "i\u{0304}mpulerit. Tantaene animis caelestibus irae?";
        let record = scanner().scan(decomposed, false, false);
        assert!(record.original().starts_with('ī'));
        assert!(record.valid());
    }

    #[test]
    fn tabs_between_words_keep_marks_aligned() {
        let record = scanner().scan("impulerit.\tTantaene animis caelestibus irae?", false, false);
        assert!(record.valid());
        assert_eq!(record.scansion(), "-  U U -    -   -   U U -    - -  U U  -  - ");
        assert_eq!(record.accented(), "īmpulerīt.\tTāntaene animīs caelēstibus īrae?");
    }

    // ─────────────────────────────────────────────────────────────
    // Structural rejection
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn short_line_is_rejected_without_repair() {
        let record = scanner().scan("pauca verba", false, false);
        assert!(!record.valid());
        assert!(record.has_note(Note::TooShort));
        assert_eq!(record.notes().len(), 1);
        assert_eq!(record.accented(), "pauca verba");
    }

    #[test]
    fn long_line_is_rejected_without_repair() {
        let line = "pater pater pater pater pater pater pater pater pater";
        let record = scanner().scan(line, false, false);
        assert!(!record.valid());
        assert_eq!(record.syllable_count(), 18);
        assert!(record.has_note(Note::TooLong));
        assert_eq!(record.notes().len(), 1);
    }

    #[test]
    fn empty_line() {
        let record = scanner().scan("", false, false);
        assert!(!record.valid());
        assert_eq!(record.syllable_count(), 0);
        assert!(record.has_note(Note::TooShort));
    }

    // ─────────────────────────────────────────────────────────────
    // Repairs and retry
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn valid_records_hold_a_template() {
        let s = scanner();
        let lines = [
            IMPULERIT,
            "Arma virumque cano, Troiae qui primus ab oris",
            "litora, multum ille et terris iactatus et alto",
        ];
        for record in s.scan_many(lines, false, false) {
            if record.valid() {
                assert!(s.validator().is_valid_hexameter(record.scansion()));
                assert!(!record.has_note(Note::NoRepair));
            }
        }
    }

    #[test]
    fn optional_transform_is_noted() {
        let record = scanner().scan(IMPULERIT, true, false);
        assert_eq!(record.notes()[0], Note::OptionalTransform.message());
        assert!(record.valid());
    }

    #[test]
    fn unrepairable_line_is_retried_once() {
        let line = "cano cano cano cano cano cano cano";
        let record = scanner().scan(line, false, false);
        assert!(!record.valid());
        assert_eq!(record.syllable_count(), 14);
        assert!(record.has_note(Note::OptionalTransform));
        assert!(record.has_note(Note::DactylChain));
        assert!(record.has_note(Note::NoRepair));
    }

    #[test]
    fn invalid_start_is_repaired() {
        let record = scanner().scan("ventus sola ventus ventus montes montes", false, false);
        assert!(record.valid());
        assert_eq!(record.scansion(), " -  -   - -  -  -   -  -   -  -   -  U ");
        assert_eq!(record.notes(), [Note::InvalidStart.message()]);
    }

    #[test]
    fn single_substitution_reaches_the_closest_template() {
        let line = "virum montes fata pater cano ventus terra";
        let record = scanner().scan(line, false, false);
        assert!(record.valid());
        assert_eq!(record.syllable_count(), 14);
        assert_eq!(record.scansion(), " - -   -  -   - U  U -   U U  -  -   -  U");
        assert_eq!(record.notes(), [Note::ClosestPattern.message()]);
    }

    // ─────────────────────────────────────────────────────────────
    // Syllable-count templates
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn twelve_syllables_are_all_spondees() {
        let record = scanner().scan("cano cano cano cano cano cano", false, false);
        assert!(record.valid());
        assert_eq!(record.scansion(), " - -  - -  - -  - -  - -  - -");
        assert_eq!(record.notes(), [Note::AllSpondees.message()]);
    }

    #[test]
    fn thirteen_syllables_take_a_fifth_foot_dactyl() {
        let record = scanner().scan("cano cano cano cano cano cano ca", false, false);
        assert!(record.valid());
        assert_eq!(record.scansion(), " - -  - -  - -  - -  - U  U -  -");
        assert_eq!(record.notes(), [Note::FifthFootDactyl.message()]);
    }

    #[test]
    fn seventeen_syllables_are_all_dactyls() {
        let line = "pater pater pater pater pater pater pater pater pa";
        let record = scanner().scan(line, false, false);
        assert!(record.valid());
        assert_eq!(record.syllable_count(), 17);
        assert_eq!(
            record.scansion(),
            " - U   U -   U U   - U   U -   U U   - U   U -   U"
        );
        // Earlier repairs were discarded along with their scansion.
        assert_eq!(record.notes(), [Note::AllDactyls.message()]);
    }

    #[test]
    fn colliding_stresses_are_invalid_syllables() {
        let s = scanner();
        let mut pass = s.prepare(IMPULERIT, false);
        pass.stresses = s.seed_stresses(&pass.syllables);
        pass.offsets = s.offset_map(&pass.working, &pass.syllables);
        // Syllable 1 lands on the first syllable's vowel.
        pass.offsets[1] = pass.offsets[0];
        pass.stresses.insert(1);

        let (record, outcome) = s.evaluate(pass, false);
        assert_eq!(outcome, Outcome::Settled);
        assert!(!record.valid());
        assert_eq!(record.notes(), [Note::InvalidSyllables.message()]);
    }

    #[test]
    fn records_round_trip_through_parts() {
        let record = scanner().scan(IMPULERIT, false, false);
        assert_eq!(VerseRecord::from_parts(record.clone().into_parts()), record);
    }

    #[test]
    fn custom_constants_are_validated() {
        let mut constants = MetricalConstants::default();
        constants.unstressed = '-';
        assert!(HexameterScanner::new(Arc::new(constants)).is_err());
    }
}
