//! Metrical constants shared by every component of the pipeline.
//!
//! Character classes are stored as plain strings of graphemes (single-char
//! classes) or lists of two-letter strings (diphthongs, aspirates). The
//! default instance describes classical Latin; an alternate instance can be
//! deserialized from YAML and must pass [`MetricalConstants::validate`]
//! before any component accepts it.

use crate::error::ConfigError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

static DEFAULT_CONSTANTS: Lazy<Arc<MetricalConstants>> =
    Lazy::new(|| Arc::new(MetricalConstants::default()));

/// Shared read-only Latin constants.
pub fn default_constants() -> Arc<MetricalConstants> {
    Arc::clone(&DEFAULT_CONSTANTS)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricalConstants {
    // Scansion alphabet
    pub stressed: char,
    pub unstressed: char,
    pub optional_ending: char,
    pub foot_separator: char,

    // Character classes
    pub vowels: String,
    pub accented_vowels: String,
    pub consonants: String,
    pub consonants_wo_h: String,
    pub liquids: String,
    /// Liquids that join a preceding mute as the onset of the next syllable.
    pub onset_liquids: String,
    pub mutes: String,
    /// Consonants that count as two for position (x = ks, z = dz).
    pub double_consonants: String,

    // Digraph lists
    pub diphthongs: Vec<String>,
    /// Diphthongs the syllabifier leaves split (`fu-it`, not `fuit`).
    pub syllabifier_diphthong_exclusions: Vec<String>,
    pub aspirates: Vec<String>,
    /// Mute + liquid pairs that do not form a shared onset.
    pub mute_liquid_exceptions: Vec<String>,
    /// Consonant + `u` units whose `u` is a glide, not a vowel.
    pub labiovelars: Vec<String>,
    /// Word endings elided before a following vowel.
    pub elided_nasal_endings: Vec<String>,

    /// Word-class prefixes after which a vowel-initial `i` is consonantal
    /// (`con-iunx`, `ad-iuvo`).
    pub prefixes: Vec<String>,

    /// Plain vowel to macronized vowel.
    pub macrons: BTreeMap<char, char>,
}

impl Default for MetricalConstants {
    fn default() -> Self {
        let vowels = "aeiouyAEIOUY";
        let accented = "āēīōūȳĀĒĪŌŪȲ";
        let macrons = vowels.chars().zip(accented.chars()).collect();

        Self {
            stressed: '-',
            unstressed: 'U',
            optional_ending: 'x',
            foot_separator: '|',
            vowels: vowels.to_string(),
            accented_vowels: accented.to_string(),
            consonants: "bcdfghjklmnpqrstvwxzBCDFGHJKLMNPQRSTVWXZ".to_string(),
            consonants_wo_h: "bcdfgjklmnpqrstvwxzBCDFGJKLMNPQRSTVWXZ".to_string(),
            liquids: "lmnrLMNR".to_string(),
            onset_liquids: "lrLR".to_string(),
            mutes: "bcdgptBCDGPT".to_string(),
            double_consonants: "xzXZ".to_string(),
            diphthongs: strings(&[
                "ae", "au", "ei", "oe", "ui", "Ae", "Au", "Ei", "Oe", "Ui", "AE", "AU", "OE",
            ]),
            syllabifier_diphthong_exclusions: strings(&["ui", "Ui"]),
            aspirates: strings(&["ch", "ph", "th", "Ch", "Ph", "Th"]),
            mute_liquid_exceptions: strings(&["gl", "bl"]),
            labiovelars: strings(&["qu", "Qu", "QU"]),
            elided_nasal_endings: strings(&["am", "um", "ām", "ūm"]),
            prefixes: strings(&["ab", "ad", "con", "dis", "in", "ob", "per", "sub"]),
            macrons,
        }
    }
}

impl MetricalConstants {
    /// Parse constants from YAML. Missing fields take their Latin defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let constants: MetricalConstants = serde_yaml::from_str(yaml)?;
        constants.validate()?;
        Ok(constants)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Reject constants the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let classes: [(&'static str, &str); 8] = [
            ("vowels", self.vowels.as_str()),
            ("accented_vowels", self.accented_vowels.as_str()),
            ("consonants", self.consonants.as_str()),
            ("consonants_wo_h", self.consonants_wo_h.as_str()),
            ("liquids", self.liquids.as_str()),
            ("onset_liquids", self.onset_liquids.as_str()),
            ("mutes", self.mutes.as_str()),
            ("double_consonants", self.double_consonants.as_str()),
        ];
        for (name, class) in classes {
            if class.is_empty() {
                return Err(ConfigError::EmptyClass(name));
            }
        }
        if self.diphthongs.is_empty() {
            return Err(ConfigError::EmptyClass("diphthongs"));
        }

        let symbols = [
            self.stressed,
            self.unstressed,
            self.optional_ending,
            self.foot_separator,
        ];
        let distinct = symbols
            .iter()
            .enumerate()
            .all(|(i, a)| symbols[i + 1..].iter().all(|b| a != b));
        if !distinct || symbols.iter().any(|c| c.is_whitespace()) {
            return Err(ConfigError::InvalidSymbols(symbols));
        }

        for vowel in self.vowels.chars() {
            if !self.macrons.contains_key(&vowel) {
                return Err(ConfigError::MissingMacron(vowel));
            }
        }

        for diphthong in &self.diphthongs {
            let chars: Vec<char> = diphthong.chars().collect();
            if chars.len() != 2 || !chars.iter().all(|&c| self.is_vowel(c)) {
                return Err(ConfigError::InvalidDiphthong(diphthong.clone()));
            }
        }

        let digraph_lists: [(&'static str, &[String]); 4] = [
            ("aspirates", self.aspirates.as_slice()),
            ("mute_liquid_exceptions", self.mute_liquid_exceptions.as_slice()),
            ("labiovelars", self.labiovelars.as_slice()),
            ("elided_nasal_endings", self.elided_nasal_endings.as_slice()),
        ];
        for (name, list) in digraph_lists {
            if let Some(bad) = list.iter().find(|d| d.chars().count() != 2) {
                return Err(ConfigError::InvalidDigraph(bad.clone(), name));
            }
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // Character classification
    // ─────────────────────────────────────────────────────────────

    pub fn is_plain_vowel(&self, c: char) -> bool {
        self.vowels.contains(c)
    }

    pub fn is_accented_vowel(&self, c: char) -> bool {
        self.accented_vowels.contains(c)
    }

    /// Plain or macronized vowel.
    pub fn is_vowel(&self, c: char) -> bool {
        self.is_plain_vowel(c) || self.is_accented_vowel(c)
    }

    pub fn is_consonant(&self, c: char) -> bool {
        self.consonants.contains(c)
    }

    pub fn is_consonant_wo_h(&self, c: char) -> bool {
        self.consonants_wo_h.contains(c)
    }

    pub fn is_liquid(&self, c: char) -> bool {
        self.liquids.contains(c)
    }

    pub fn is_onset_liquid(&self, c: char) -> bool {
        self.onset_liquids.contains(c)
    }

    pub fn is_mute(&self, c: char) -> bool {
        self.mutes.contains(c)
    }

    pub fn is_double_consonant(&self, c: char) -> bool {
        self.double_consonants.contains(c)
    }

    /// The breathing `h`: a consonant that does not make position.
    pub fn is_aspirate_letter(&self, c: char) -> bool {
        self.is_consonant(c) && !self.is_consonant_wo_h(c)
    }

    /// Vowels (plain and macronized) other than any form of `i`.
    pub fn vowels_wo_i(&self) -> String {
        self.vowels
            .chars()
            .chain(self.accented_vowels.chars())
            .filter(|&c| !matches!(c, 'i' | 'I' | 'ī' | 'Ī'))
            .collect()
    }

    pub fn is_diphthong(&self, first: char, second: char) -> bool {
        digraph_in(&self.diphthongs, first, second)
    }

    pub fn is_aspirate(&self, first: char, second: char) -> bool {
        digraph_in(&self.aspirates, first, second)
    }

    pub fn is_mute_liquid_exception(&self, first: char, second: char) -> bool {
        digraph_in(&self.mute_liquid_exceptions, first, second)
    }

    /// `second` is the glide of a unit such as `qu`.
    pub fn is_labiovelar(&self, first: char, second: char) -> bool {
        digraph_in(&self.labiovelars, first, second)
    }

    pub fn is_elided_nasal_ending(&self, vowel: char, nasal: char) -> bool {
        digraph_in(&self.elided_nasal_endings, vowel, nasal)
    }

    /// Diphthongs the syllabifier merges into a single nucleus.
    pub fn syllabifier_diphthongs(&self) -> Vec<String> {
        self.diphthongs
            .iter()
            .filter(|d| !self.syllabifier_diphthong_exclusions.contains(d))
            .cloned()
            .collect()
    }

    pub fn macron(&self, vowel: char) -> Option<char> {
        self.macrons.get(&vowel).copied()
    }

    // ─────────────────────────────────────────────────────────────
    // Foot shapes
    // ─────────────────────────────────────────────────────────────

    pub fn dactyl(&self) -> String {
        [self.stressed, self.unstressed, self.unstressed].iter().collect()
    }

    pub fn spondee(&self) -> String {
        [self.stressed, self.stressed].iter().collect()
    }

    pub fn iamb(&self) -> String {
        [self.unstressed, self.stressed].iter().collect()
    }

    pub fn trochee(&self) -> String {
        [self.stressed, self.unstressed].iter().collect()
    }

    /// Closing foot of every hexameter template: a long plus the anceps.
    pub fn hexameter_ending(&self) -> String {
        [self.stressed, self.optional_ending].iter().collect()
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn digraph_in(list: &[String], first: char, second: char) -> bool {
    list.iter().any(|d| {
        let mut chars = d.chars();
        chars.next() == Some(first) && chars.next() == Some(second)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_constants_validate() {
        assert!(MetricalConstants::default().validate().is_ok());
    }

    #[test]
    fn every_vowel_has_a_macron() {
        let c = MetricalConstants::default();
        assert_eq!(c.macron('a'), Some('ā'));
        assert_eq!(c.macron('Y'), Some('Ȳ'));
        assert_eq!(c.macron('b'), None);
    }

    #[test]
    fn glides_breathing_and_nasal_endings() {
        let c = MetricalConstants::default();
        assert!(c.is_labiovelar('q', 'u'));
        assert!(c.is_labiovelar('Q', 'U'));
        assert!(!c.is_labiovelar('g', 'u'));
        assert!(c.is_aspirate_letter('h'));
        assert!(!c.is_aspirate_letter('t'));
        assert!(c.is_elided_nasal_ending('ū', 'm'));
        assert!(!c.is_elided_nasal_ending('e', 'm'));
    }

    #[test]
    fn custom_glides_replace_qu() {
        let c = MetricalConstants::from_yaml("labiovelars: [gu]\n").unwrap();
        assert!(c.is_labiovelar('g', 'u'));
        assert!(!c.is_labiovelar('q', 'u'));
    }

    #[test]
    fn vowels_without_i() {
        let c = MetricalConstants::default();
        let v = c.vowels_wo_i();
        assert!(v.contains('a'));
        assert!(v.contains('ū'));
        assert!(!v.contains('i'));
        assert!(!v.contains('Ī'));
    }

    #[test]
    fn syllabifier_excludes_ui() {
        let c = MetricalConstants::default();
        let d = c.syllabifier_diphthongs();
        assert!(d.contains(&"ae".to_string()));
        assert!(!d.contains(&"ui".to_string()));
        assert!(c.is_diphthong('u', 'i'));
    }

    #[test]
    fn foot_shapes() {
        let c = MetricalConstants::default();
        assert_eq!(c.dactyl(), "-UU");
        assert_eq!(c.spondee(), "--");
        assert_eq!(c.iamb(), "U-");
        assert_eq!(c.trochee(), "-U");
        assert_eq!(c.hexameter_ending(), "-x");
    }

    #[test]
    fn yaml_overrides_merge_with_defaults() {
        let yaml = "stressed: \"S\"\nunstressed: \"s\"\n";
        let c = MetricalConstants::from_yaml(yaml).unwrap();
        assert_eq!(c.stressed, 'S');
        assert_eq!(c.unstressed, 's');
        assert_eq!(c.vowels, "aeiouyAEIOUY");
    }

    #[test]
    fn empty_class_is_rejected() {
        let result = MetricalConstants::from_yaml("vowels: \"\"\n");
        assert!(matches!(result, Err(ConfigError::EmptyClass("vowels"))));
    }

    #[test]
    fn colliding_symbols_are_rejected() {
        let result = MetricalConstants::from_yaml("stressed: \"U\"\n");
        assert!(matches!(result, Err(ConfigError::InvalidSymbols(_))));
    }

    #[test]
    fn vowel_without_macron_is_rejected() {
        let mut c = MetricalConstants::default();
        c.vowels.push('w');
        assert!(matches!(c.validate(), Err(ConfigError::MissingMacron('w'))));
    }

    #[test]
    fn malformed_diphthong_is_rejected() {
        let mut c = MetricalConstants::default();
        c.diphthongs.push("aeu".to_string());
        assert!(matches!(c.validate(), Err(ConfigError::InvalidDiphthong(_))));
    }

    #[test]
    fn shared_default_is_the_same_instance() {
        let a = default_constants();
        let b = default_constants();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
