//! Length-preserving rewrites of a working line: consonantal `i`, elision
//! and length by position.
//!
//! Each rewrite scans an indexed [`LineBuffer`], collects [`Edit`]s and
//! applies them at the end, so character offsets never shift.

use crate::constants::{default_constants, MetricalConstants};
use crate::error::ConfigError;
use crate::text::{match_char_spans, Edit, LineBuffer};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::Arc;

fn char_class(chars: &str) -> String {
    format!("[{}]", regex::escape(chars))
}

#[derive(Debug, Clone)]
pub struct LineTransformer {
    constants: Arc<MetricalConstants>,
    vowels_wo_i: String,
    initial_i: Regex,
    initial_cap_i: Regex,
    intervocalic_i: Regex,
    consonant_i: Regex,
    liquid_i: Regex,
}

impl Default for LineTransformer {
    fn default() -> Self {
        // Built-in constants always compile.
        Self::compile(default_constants()).unwrap()
    }
}

impl LineTransformer {
    pub fn new(constants: Arc<MetricalConstants>) -> Result<Self, ConfigError> {
        constants.validate()?;
        Self::compile(constants)
    }

    fn compile(constants: Arc<MetricalConstants>) -> Result<Self, ConfigError> {
        let vowels_wo_i = constants.vowels_wo_i();
        let all_vowels = format!("{}{}", constants.vowels, constants.accented_vowels);
        let stops: String = constants
            .consonants_wo_h
            .chars()
            .filter(|&c| !constants.is_liquid(c))
            .collect();

        let following = char_class(&vowels_wo_i);
        Ok(Self {
            initial_i: Regex::new(&format!(r"\b[iī]{}", following))?,
            initial_cap_i: Regex::new(&format!(r"\b[IĪ]{}", following))?,
            intervocalic_i: Regex::new(&format!(
                "{}i{}",
                char_class(&vowels_wo_i),
                char_class(&all_vowels)
            ))?,
            consonant_i: Regex::new(&format!("{}i{}", char_class(&stops), following))?,
            liquid_i: Regex::new(&format!(
                "{}[iI]{}",
                char_class(&constants.liquids),
                following
            ))?,
            vowels_wo_i,
            constants,
        })
    }

    // ─────────────────────────────────────────────────────────────
    // Consonantal i
    // ─────────────────────────────────────────────────────────────

    /// Rewrite only the unambiguous consonantal `i`: after a prefix, at the
    /// start of a word, and between vowels.
    pub fn conservative_i_to_j(&self, line: &str) -> String {
        let mut buffer = LineBuffer::new(line);
        let edits = self.prefix_edits(&buffer);
        buffer.apply_all(edits);

        for (re, with) in [(&self.initial_i, 'j'), (&self.initial_cap_i, 'J')] {
            let text = buffer.to_string();
            let edits: Vec<Edit> = match_char_spans(re, &text)
                .into_iter()
                .map(|(start, _)| Edit::Replace { at: start, with })
                .collect();
            buffer.apply_all(edits);
        }

        let text = buffer.to_string();
        let edits: Vec<Edit> = match_char_spans(&self.intervocalic_i, &text)
            .into_iter()
            .filter(|&(start, _)| !self.is_u_of_qu(&buffer, start))
            .map(|(start, _)| Edit::Replace {
                at: start + 1,
                with: 'j',
            })
            .collect();
        buffer.apply_all(edits);

        buffer.to_string()
    }

    /// The conservative rewrite plus `i` after a stop or liquid and before a
    /// vowel (`Lavinia` → `Lavinja`).
    pub fn permissive_i_to_j(&self, line: &str) -> String {
        let mut buffer = LineBuffer::new(&self.conservative_i_to_j(line));

        for re in [&self.consonant_i, &self.liquid_i] {
            let text = buffer.to_string();
            let edits: Vec<Edit> = match_char_spans(re, &text)
                .into_iter()
                .map(|(start, _)| {
                    let with = if buffer.get(start + 1) == Some('I') { 'J' } else { 'j' };
                    Edit::Replace { at: start + 1, with }
                })
                .collect();
            buffer.apply_all(edits);
        }

        buffer.to_string()
    }

    fn prefix_edits(&self, buffer: &LineBuffer) -> Vec<Edit> {
        let chars = buffer.chars();
        let mut edits = Vec::new();

        let mut start = 0;
        while start < chars.len() {
            if chars[start].is_whitespace() {
                start += 1;
                continue;
            }
            let end = (start..chars.len())
                .find(|&idx| chars[idx].is_whitespace())
                .unwrap_or(chars.len());
            let word = &chars[start..end];

            let prefix = self.constants.prefixes.iter().find(|prefix| {
                let prefix: Vec<char> = prefix.chars().collect();
                word.len() > prefix.len()
                    && word
                        .iter()
                        .zip(&prefix)
                        .all(|(a, b)| a.eq_ignore_ascii_case(b))
            });
            if let Some(prefix) = prefix {
                let at = start + prefix.chars().count();
                let followed_by_vowel = chars
                    .get(at + 1)
                    .is_some_and(|&c| self.vowels_wo_i.contains(c));
                match chars[at] {
                    'i' if followed_by_vowel => edits.push(Edit::Replace { at, with: 'j' }),
                    'I' if followed_by_vowel => edits.push(Edit::Replace { at, with: 'J' }),
                    _ => {}
                }
            }

            start = end;
        }

        edits
    }

    fn is_u_of_qu(&self, buffer: &LineBuffer, at: usize) -> bool {
        match (at.checked_sub(1).and_then(|prev| buffer.get(prev)), buffer.get(at)) {
            (Some(first), Some(second)) => self.constants.is_labiovelar(first, second),
            _ => false,
        }
    }

    /// Second vowel of a diphthong, not counting the `u` of `qu`.
    fn closes_diphthong(&self, buffer: &LineBuffer, at: usize) -> bool {
        if at == 0 {
            return false;
        }
        match (buffer.get(at - 1), buffer.get(at)) {
            (Some(first), Some(second)) => {
                self.constants.is_diphthong(first, second) && !self.is_u_of_qu(buffer, at - 1)
            }
            _ => false,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Elision
    // ─────────────────────────────────────────────────────────────

    /// Erase every elided vowel, diphthong or `-am`/`-um` ending.
    ///
    /// Candidates from all rules are merged: a position is blank when any
    /// rule erases it. An elided long vowel or diphthong lengthens the vowel
    /// that absorbs it.
    pub fn elide(&self, line: &str) -> String {
        let mut buffer = LineBuffer::new(line);
        let c = &self.constants;
        let mut erased: BTreeSet<usize> = BTreeSet::new();
        let mut promoted: BTreeSet<usize> = BTreeSet::new();

        for idx in 0..buffer.len() {
            let Some(ch) = buffer.get(idx) else { break };
            if !c.is_vowel(ch) {
                continue;
            }

            // Word-final vowel before a vowel or h
            if buffer.get(idx + 1).is_some_and(char::is_whitespace) {
                let next_idx = buffer.skip_spaces(idx + 1);
                if let Some(next) = buffer.get(next_idx) {
                    let next_is_vowel = c.is_vowel(next);
                    if next_is_vowel || c.is_aspirate_letter(next) {
                        if self.closes_diphthong(&buffer, idx) {
                            erased.insert(idx - 1);
                            erased.insert(idx);
                            if next_is_vowel {
                                promoted.insert(next_idx);
                            }
                        } else {
                            erased.insert(idx);
                            if next_is_vowel && c.is_accented_vowel(ch) {
                                promoted.insert(next_idx);
                            }
                        }
                    }
                }
            }

            // -am / -um before a vowel
            let nasal_ending = buffer
                .get(idx + 1)
                .is_some_and(|next| c.is_elided_nasal_ending(ch, next));
            if nasal_ending && buffer.get(idx + 2).is_some_and(char::is_whitespace) {
                let next_idx = buffer.skip_spaces(idx + 2);
                if buffer.get(next_idx).is_some_and(|next| c.is_vowel(next)) {
                    erased.insert(idx);
                    erased.insert(idx + 1);
                }
            }
        }

        let mut edits: Vec<Edit> = promoted
            .iter()
            .filter(|idx| !erased.contains(idx))
            .filter_map(|&idx| {
                let long = buffer.get(idx).and_then(|v| c.macron(v))?;
                Some(Edit::Replace { at: idx, with: long })
            })
            .collect();
        edits.extend(erased.iter().map(|&start| Edit::Erase { start, len: 1 }));
        buffer.apply_all(edits);

        buffer.to_string()
    }

    // ─────────────────────────────────────────────────────────────
    // Length by position
    // ─────────────────────────────────────────────────────────────

    /// Macronize every plain vowel long by position: before two consonants
    /// (within a word or across a word boundary) or before x/z.
    pub fn accent_by_position(&self, line: &str) -> String {
        let mut buffer = LineBuffer::new(line);
        let c = &self.constants;
        let mut edits = Vec::new();

        for idx in 0..buffer.len() {
            let Some(vowel) = buffer.get(idx) else { break };
            if !c.is_plain_vowel(vowel) || self.closes_diphthong(&buffer, idx) {
                continue;
            }
            let Some(long) = c.macron(vowel) else { continue };

            let next = buffer.get(idx + 1);
            let consonant_then_cluster = next.is_some_and(|n| c.is_consonant(n))
                && buffer
                    .get(buffer.skip_spaces(idx + 2))
                    .is_some_and(|n| c.is_consonant_wo_h(n));

            let after_spaces = buffer.skip_spaces(idx + 1);
            let cluster_after_spaces = buffer.get(after_spaces).is_some_and(|n| c.is_consonant(n))
                && buffer
                    .get(after_spaces + 1)
                    .is_some_and(|n| c.is_consonant_wo_h(n));

            let double = next.is_some_and(|n| c.is_double_consonant(n));

            if consonant_then_cluster || cluster_after_spaces || double {
                edits.push(Edit::Replace { at: idx, with: long });
            }
        }

        buffer.apply_all(edits);
        buffer.to_string()
    }
}
