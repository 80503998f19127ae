//! Latin syllabification by onset maximization.
//!
//! Words are split into tokens (single letters, merged diphthongs and the
//! protected `qu` unit), consonant-only tokens at the word edges are folded
//! into their neighbours, and the remaining consonants are resolved one at a
//! time by a fixed list of exception rules.

use crate::constants::{default_constants, MetricalConstants};
use crate::error::ConfigError;
use crate::text::remove_punctuation;
use std::sync::Arc;
use tracing::error;

// First private-use stand-in for a glide unit such as `qu`, so the pair
// moves through the tokenizer as one consonant.
const GLIDE_BASE: u32 = 0xE000;

#[derive(Debug, Clone)]
pub struct Syllabifier {
    constants: Arc<MetricalConstants>,
    diphthongs: Vec<String>,
    glides: Vec<(String, char)>,
}

impl Default for Syllabifier {
    fn default() -> Self {
        Self::build(default_constants())
    }
}

impl Syllabifier {
    pub fn new(constants: Arc<MetricalConstants>) -> Result<Self, ConfigError> {
        constants.validate()?;
        Ok(Self::build(constants))
    }

    fn build(constants: Arc<MetricalConstants>) -> Self {
        let diphthongs = constants.syllabifier_diphthongs();
        let glides = (GLIDE_BASE..)
            .zip(&constants.labiovelars)
            .filter_map(|(code, unit)| char::from_u32(code).map(|c| (unit.clone(), c)))
            .collect();
        Self {
            constants,
            diphthongs,
            glides,
        }
    }

    /// Split a word or a space-separated phrase into syllables.
    ///
    /// Input containing a character outside the configured alphabet is logged
    /// and returned unsplit, as a single item.
    pub fn syllabify(&self, text: &str) -> Vec<String> {
        let cleaned = remove_punctuation(text);
        let protected = self.protect_glides(&cleaned);

        if let Some(bad) = protected
            .chars()
            .find(|&c| !c.is_whitespace() && !self.is_letter(c))
        {
            error!(character = %bad, text = %text, "unsupported character, input left unsplit");
            return vec![cleaned];
        }

        protected
            .split_whitespace()
            .flat_map(|word| self.syllabify_word(word))
            .map(|syllable| self.restore_glides(&syllable))
            .collect()
    }

    /// Syllable count after folding lone consonants into their neighbours.
    pub fn get_syllable_count(&self, syllables: &[String]) -> usize {
        self.merge_lone_consonants(syllables).len()
    }

    /// Fold every syllable without a vowel nucleus into the following
    /// syllable, or into the preceding one when it is the last.
    ///
    /// Elision can leave such fragments behind (`atque` before a vowel
    /// becomes `atqu`, and a bare `qu` may survive on its own).
    pub fn merge_lone_consonants(&self, syllables: &[String]) -> Vec<String> {
        let mut merged: Vec<String> = Vec::with_capacity(syllables.len());
        let mut pending = String::new();

        for syllable in syllables {
            if self.has_nucleus(syllable) {
                pending.push_str(syllable);
                merged.push(std::mem::take(&mut pending));
            } else {
                pending.push_str(syllable);
            }
        }

        if !pending.is_empty() {
            match merged.last_mut() {
                Some(last) => last.push_str(&pending),
                None => merged.push(pending),
            }
        }

        merged
    }

    /// Word-initial `i` before a vowel is consonantal: `iam` → `jam`.
    pub fn convert_consonantal_i(&self, word: &str) -> String {
        let mut chars = word.chars();
        let (Some(first), Some(second)) = (chars.next(), chars.next()) else {
            return word.to_string();
        };
        let vowels_wo_i = self.constants.vowels_wo_i();
        if !vowels_wo_i.contains(second) {
            return word.to_string();
        }
        let replacement = match first {
            'i' | 'ī' => 'j',
            'I' | 'Ī' => 'J',
            _ => return word.to_string(),
        };
        let mut converted = String::with_capacity(word.len());
        converted.push(replacement);
        converted.push(second);
        converted.extend(chars);
        converted
    }

    /// True when the syllable holds a vowel other than the `u` of `qu`.
    pub fn has_nucleus(&self, syllable: &str) -> bool {
        let mut prev = None;
        for c in syllable.chars() {
            let glide = prev.is_some_and(|p| self.constants.is_labiovelar(p, c));
            if self.constants.is_vowel(c) && !glide {
                return true;
            }
            prev = Some(c);
        }
        false
    }

    // ─────────────────────────────────────────────────────────────
    // Per-word algorithm
    // ─────────────────────────────────────────────────────────────

    fn syllabify_word(&self, word: &str) -> Vec<String> {
        if word.chars().count() == 1 {
            return vec![word.to_string()];
        }

        let word = self.convert_consonantal_i(word);
        let mut tokens = self.tokenize(&word);

        if !tokens.iter().any(|t| self.has_vowel(t)) {
            return vec![word];
        }

        // Leading consonants open the first syllable
        while let Some(pos) = self.edge_consonant(tokens.iter().enumerate()) {
            let consonant = tokens.remove(pos);
            tokens[pos].insert_str(0, &consonant);
        }

        // Trailing consonants close the last one
        while let Some(pos) = self.edge_consonant(tokens.iter().enumerate().rev()) {
            let consonant = tokens.remove(pos);
            tokens[pos - 1].push_str(&consonant);
        }

        while let Some(pos) = self.next_unresolved(&tokens) {
            if pos == 0 || pos + 1 >= tokens.len() {
                break;
            }
            self.resolve(&mut tokens, pos);
        }

        tokens
            .into_iter()
            .filter(|t| !t.trim().is_empty())
            .collect()
    }

    /// Boundary-padded tokens with diphthongs merged.
    fn tokenize(&self, word: &str) -> Vec<String> {
        let chars: Vec<char> = word.chars().collect();
        let mut tokens = vec![" ".to_string()];

        let mut idx = 0;
        while idx < chars.len() {
            if let Some(&next) = chars.get(idx + 1) {
                if self.is_syllabifier_diphthong(chars[idx], next) {
                    tokens.push([chars[idx], next].iter().collect());
                    idx += 2;
                    continue;
                }
            }
            tokens.push(chars[idx].to_string());
            idx += 1;
        }

        tokens.push(" ".to_string());
        tokens
    }

    /// First consonant-only token reached from one edge before any vowel.
    fn edge_consonant<'a>(
        &self,
        mut tokens: impl Iterator<Item = (usize, &'a String)>,
    ) -> Option<usize> {
        tokens.find_map(|(idx, token)| {
            if self.has_vowel(token) {
                Some(None)
            } else if self.has_consonant(token) {
                Some(Some(idx))
            } else {
                None
            }
        })?
    }

    /// A solo consonant first, otherwise the first vowelless cluster.
    fn next_unresolved(&self, tokens: &[String]) -> Option<usize> {
        let solo = tokens.iter().position(|t| {
            let mut chars = t.chars();
            matches!((chars.next(), chars.next()), (Some(c), None) if self.is_consonant_unit(c))
        });
        solo.or_else(|| {
            tokens
                .iter()
                .position(|t| self.has_consonant(t) && !self.has_vowel(t))
        })
    }

    fn resolve(&self, tokens: &mut Vec<String>, pos: usize) {
        let consonant = tokens.remove(pos);
        if self.attaches_left(&tokens[pos - 1], &consonant, &tokens[pos]) {
            tokens[pos - 1].push_str(&consonant);
        } else {
            tokens[pos].insert_str(0, &consonant);
        }
    }

    fn attaches_left(&self, prev: &str, consonant: &str, next: &str) -> bool {
        let c = &self.constants;
        let prev_last = prev.chars().last();
        let next_first = next.chars().next();
        let cons_first = consonant.chars().next();
        let cons_last = consonant.chars().last();
        let solo = consonant.chars().count() == 1;

        let (Some(next_first), Some(cons_first), Some(cons_last)) =
            (next_first, cons_first, cons_last)
        else {
            return false;
        };

        if c.is_vowel(next_first) {
            return false;
        }
        if solo {
            if let Some(prev_last) = prev_last {
                if c.is_aspirate(prev_last, cons_first) {
                    return true;
                }
            }
            if c.is_aspirate(cons_first, next_first) {
                return false;
            }
        }
        if next_first == cons_last {
            return true;
        }
        if c.is_mute(cons_last)
            && c.is_onset_liquid(next_first)
            && !c.is_mute_liquid_exception(cons_last, next_first)
        {
            return false;
        }
        if matches!(cons_last, 'k' | 'K') && matches!(next_first, 'w' | 'W') {
            return false;
        }
        if self.is_consonant_unit(next_first) && prev_last.is_some_and(|p| c.is_vowel(p)) {
            return true;
        }
        false
    }

    // ─────────────────────────────────────────────────────────────
    // Character classes
    // ─────────────────────────────────────────────────────────────

    fn is_letter(&self, c: char) -> bool {
        self.constants.is_vowel(c) || self.is_consonant_unit(c)
    }

    fn is_consonant_unit(&self, c: char) -> bool {
        self.glides.iter().any(|&(_, stand_in)| stand_in == c) || self.constants.is_consonant(c)
    }

    fn has_vowel(&self, token: &str) -> bool {
        token.chars().any(|c| self.constants.is_vowel(c))
    }

    fn has_consonant(&self, token: &str) -> bool {
        token.chars().any(|c| self.is_consonant_unit(c))
    }

    fn is_syllabifier_diphthong(&self, first: char, second: char) -> bool {
        self.diphthongs.iter().any(|d| {
            let mut chars = d.chars();
            chars.next() == Some(first) && chars.next() == Some(second)
        })
    }

    fn protect_glides(&self, text: &str) -> String {
        self.glides
            .iter()
            .fold(text.to_string(), |acc, (unit, stand_in)| {
                acc.replace(unit.as_str(), &stand_in.to_string())
            })
    }

    fn restore_glides(&self, text: &str) -> String {
        self.glides
            .iter()
            .fold(text.to_string(), |acc, (unit, stand_in)| {
                acc.replace(*stand_in, unit)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syllables(text: &str) -> Vec<String> {
        Syllabifier::default().syllabify(text)
    }

    // ─────────────────────────────────────────────────────────────
    // Onset maximization and exceptions
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn mute_liquid_moves_together() {
        assert_eq!(syllables("contra"), vec!["con", "tra"]);
        assert_eq!(syllables("patrem"), vec!["pa", "trem"]);
    }

    #[test]
    fn excepted_mute_liquid_splits() {
        assert_eq!(syllables("publica"), vec!["pub", "li", "ca"]);
    }

    #[test]
    fn mute_before_nasal_splits() {
        assert_eq!(syllables("magnus"), vec!["mag", "nus"]);
    }

    #[test]
    fn doubled_consonant_splits() {
        assert_eq!(syllables("siccus"), vec!["sic", "cus"]);
        assert_eq!(syllables("terris"), vec!["ter", "ris"]);
    }

    #[test]
    fn consonant_cluster_goes_to_next_syllable() {
        assert_eq!(syllables("sanctus"), vec!["san", "ctus"]);
    }

    #[test]
    fn aspirates_never_split() {
        assert_eq!(syllables("pulcher"), vec!["pul", "cher"]);
        assert_eq!(syllables("philosophia"), vec!["phi", "lo", "so", "phi", "a"]);
    }

    #[test]
    fn consonantal_i_at_word_start() {
        assert_eq!(syllables("iaculum"), vec!["ja", "cu", "lum"]);
        assert_eq!(syllables("Iuno"), vec!["Ju", "no"]);
    }

    #[test]
    fn diphthongs_stay_together() {
        assert_eq!(syllables("caelum"), vec!["cae", "lum"]);
        assert_eq!(syllables("poena"), vec!["poe", "na"]);
    }

    #[test]
    fn ui_is_split_by_the_syllabifier() {
        assert_eq!(syllables("fuit"), vec!["fu", "it"]);
    }

    #[test]
    fn qu_is_an_atomic_unit() {
        assert_eq!(syllables("atque"), vec!["at", "que"]);
        assert_eq!(syllables("aqua"), vec!["a", "qua"]);
        assert_eq!(syllables("Quisque"), vec!["Quis", "que"]);
    }

    #[test]
    fn phrase_keeps_word_order() {
        assert_eq!(
            syllables("arma virumque cano"),
            vec!["ar", "ma", "vi", "rum", "que", "ca", "no"]
        );
    }

    #[test]
    fn macrons_count_as_vowels() {
        assert_eq!(syllables("caelēstibus"), vec!["cae", "lēs", "ti", "bus"]);
    }

    // ─────────────────────────────────────────────────────────────
    // Degenerate input
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn single_letter_word() {
        assert_eq!(syllables("a"), vec!["a"]);
        assert_eq!(syllables("t"), vec!["t"]);
    }

    #[test]
    fn vowelless_remnant_is_one_fragment() {
        assert_eq!(syllables("st"), vec!["st"]);
        assert_eq!(syllables("qu"), vec!["qu"]);
    }

    #[test]
    fn unsupported_characters_leave_input_unsplit() {
        assert_eq!(syllables("arma 42 cano"), vec!["arma 42 cano"]);
        assert_eq!(syllables("arma, 42"), vec!["arma 42"]);
    }

    #[test]
    fn punctuation_is_stripped() {
        assert_eq!(syllables("cano,"), vec!["ca", "no"]);
    }

    // ─────────────────────────────────────────────────────────────
    // Counting
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn lone_consonants_merge_forward() {
        let s = Syllabifier::default();
        let input: Vec<String> = ["at", "qu", "et"].iter().map(|s| s.to_string()).collect();
        assert_eq!(s.merge_lone_consonants(&input), vec!["at", "quet"]);
        assert_eq!(s.get_syllable_count(&input), 2);
    }

    #[test]
    fn trailing_lone_consonant_merges_back() {
        let s = Syllabifier::default();
        let input: Vec<String> = ["mul", "t"].iter().map(|s| s.to_string()).collect();
        assert_eq!(s.merge_lone_consonants(&input), vec!["mult"]);
    }

    #[test]
    fn only_consonants_stay_as_one() {
        let s = Syllabifier::default();
        let input: Vec<String> = ["st"].iter().map(|s| s.to_string()).collect();
        assert_eq!(s.merge_lone_consonants(&input), vec!["st"]);
    }

    #[test]
    fn qu_is_not_a_nucleus() {
        let s = Syllabifier::default();
        assert!(!s.has_nucleus("qu"));
        assert!(s.has_nucleus("que"));
        assert!(s.has_nucleus("cu"));
    }

    #[test]
    fn convert_consonantal_i_only_before_vowels() {
        let s = Syllabifier::default();
        assert_eq!(s.convert_consonantal_i("iam"), "jam");
        assert_eq!(s.convert_consonantal_i("Iulus"), "Julus");
        assert_eq!(s.convert_consonantal_i("ira"), "ira");
        assert_eq!(s.convert_consonantal_i("i"), "i");
    }

    #[test]
    fn invalid_constants_are_rejected() {
        let mut constants = MetricalConstants::default();
        constants.consonants.clear();
        assert!(Syllabifier::new(Arc::new(constants)).is_err());
    }
}
