//! User-facing renderings of a scansion.

use crate::constants::{default_constants, MetricalConstants};
use crate::error::ConfigError;
use crate::text::compact;
use crate::validator::MetricalValidator;
use std::sync::Arc;
use tracing::error;

#[derive(Debug, Clone)]
pub struct ScansionFormatter {
    constants: Arc<MetricalConstants>,
    validator: MetricalValidator,
}

impl Default for ScansionFormatter {
    fn default() -> Self {
        Self {
            constants: default_constants(),
            validator: MetricalValidator::default(),
        }
    }
}

impl ScansionFormatter {
    pub fn new(constants: Arc<MetricalConstants>) -> Result<Self, ConfigError> {
        let validator = MetricalValidator::new(Arc::clone(&constants))?;
        Ok(Self {
            constants,
            validator,
        })
    }

    /// Macronize the vowels of `line` that the scansion marks long.
    ///
    /// The second vowel of a diphthong keeps its plain form; a long mark on a
    /// non-vowel is logged and skipped.
    pub fn merge_line_scansion(&self, line: &str, scansion: &str) -> String {
        let c = &self.constants;
        let mut chars: Vec<char> = line.chars().collect();

        for (idx, symbol) in scansion.chars().enumerate() {
            if symbol != c.stressed {
                continue;
            }
            let Some(&ch) = chars.get(idx) else {
                error!(position = idx, line = %line, "scansion is longer than the line");
                break;
            };
            if c.is_accented_vowel(ch) {
                continue;
            }
            if !c.is_plain_vowel(ch) {
                error!(position = idx, character = %ch, line = %line, "long mark on a non-vowel");
                continue;
            }
            let after_qu = idx >= 2 && c.is_labiovelar(chars[idx - 2], chars[idx - 1]);
            if idx > 0 && c.is_diphthong(chars[idx - 1], ch) && !after_qu {
                continue;
            }
            if let Some(long) = c.macron(ch) {
                chars[idx] = long;
            }
        }

        chars.into_iter().collect()
    }

    /// Foot-separated scansion with the anceps on the last syllable, such as
    /// `-UU|--|-UU|--|-UU|-x`. Unparseable scansions come back compacted.
    pub fn hexameter_feet_display(&self, scansion: &str) -> String {
        let c = &self.constants;
        let Some(feet) = self.validator.hexameter_feet(scansion) else {
            return compact(scansion);
        };

        let mut feet: Vec<String> = feet.iter().map(|foot| compact(foot)).collect();
        if let Some(last) = feet.last_mut() {
            last.pop();
            last.push(c.optional_ending);
        }
        feet.join(&c.foot_separator.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macrons_follow_long_marks() {
        let f = ScansionFormatter::default();
        let line = "impulerit. Tantaene animis caelestibus irae?";
        let scansion = "-  U U -    -   -   U U -    - -  U U  -  - ";
        assert_eq!(
            f.merge_line_scansion(line, scansion),
            "īmpulerīt. Tāntaene animīs caelēstibus īrae?"
        );
    }

    #[test]
    fn diphthong_second_vowel_stays_plain() {
        let f = ScansionFormatter::default();
        assert_eq!(f.merge_line_scansion("caelum", "  -   "), "caelum");
        assert_eq!(f.merge_line_scansion("caelum", " -    "), "cāelum");
    }

    #[test]
    fn u_of_qu_does_not_open_a_diphthong() {
        let f = ScansionFormatter::default();
        assert_eq!(f.merge_line_scansion("quis", "  - "), "quīs");
    }

    #[test]
    fn long_mark_on_consonant_is_skipped() {
        let f = ScansionFormatter::default();
        assert_eq!(f.merge_line_scansion("arma", " -  "), "arma");
    }

    #[test]
    fn existing_macrons_are_kept() {
        let f = ScansionFormatter::default();
        assert_eq!(f.merge_line_scansion("ārma", "-  U"), "ārma");
    }

    #[test]
    fn feet_display() {
        let f = ScansionFormatter::default();
        assert_eq!(
            f.hexameter_feet_display("-  U U -    -   -   U U -    - -  U U  -  - "),
            "-UU|--|-UU|--|-UU|-x"
        );
    }

    #[test]
    fn unparseable_display_is_compacted() {
        let f = ScansionFormatter::default();
        assert_eq!(f.hexameter_feet_display("U U U -"), "UUU-");
    }
}
