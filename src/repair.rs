//! Local corrections applied to a scansion that fails validation.
//!
//! Every repair takes the spaced scansion and returns a new one with the same
//! spacing; only the symbols at mark positions change.

use crate::constants::{default_constants, MetricalConstants};
use crate::error::ConfigError;
use crate::text::{compact, differences, match_char_spans, rebuild};
use crate::validator::MetricalValidator;
use regex::Regex;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ScansionRepairer {
    constants: Arc<MetricalConstants>,
    validator: MetricalValidator,
    inverted_amphibrach: Regex,
}

impl Default for ScansionRepairer {
    fn default() -> Self {
        let constants = default_constants();
        // Built-in symbols always compile.
        let inverted_amphibrach = amphibrach_pattern(&constants).unwrap();
        Self {
            constants,
            validator: MetricalValidator::default(),
            inverted_amphibrach,
        }
    }
}

fn amphibrach_pattern(constants: &MetricalConstants) -> Result<Regex, regex::Error> {
    let stressed = regex::escape(&constants.stressed.to_string());
    let unstressed = regex::escape(&constants.unstressed.to_string());
    Regex::new(&format!(r"{stressed}\s*{unstressed}\s*{stressed}"))
}

impl ScansionRepairer {
    pub fn new(constants: Arc<MetricalConstants>) -> Result<Self, ConfigError> {
        let validator = MetricalValidator::new(Arc::clone(&constants))?;
        let inverted_amphibrach = amphibrach_pattern(&constants)?;
        Ok(Self {
            constants,
            validator,
            inverted_amphibrach,
        })
    }

    /// Lengthen the short middle of every long-short-long run, matching
    /// again after each pass until none is left.
    pub fn correct_inverted_amphibrachs(&self, scansion: &str) -> String {
        let mut current = scansion.to_string();
        loop {
            let spans = match_char_spans(&self.inverted_amphibrach, &current);
            if spans.is_empty() {
                return current;
            }
            let mut chars: Vec<char> = current.chars().collect();
            for (start, end) in spans {
                if let Some(middle) =
                    (start + 1..end - 1).find(|&idx| chars[idx] == self.constants.unstressed)
                {
                    chars[middle] = self.constants.stressed;
                }
            }
            current = chars.into_iter().collect();
        }
    }

    /// A line opening with a spondee cannot continue with a lone short, and
    /// after three longs a short must be followed by another short.
    pub fn correct_invalid_start(&self, scansion: &str) -> String {
        let s = self.constants.stressed;
        let u = self.constants.unstressed;
        let mut symbols: Vec<char> = compact(scansion).chars().collect();

        if symbols.starts_with(&[s, s, u]) {
            symbols[2] = s;
        }
        if symbols.starts_with(&[s, s, s, u, s]) {
            symbols[3] = s;
        }

        rebuild(scansion, &symbols.into_iter().collect::<String>())
    }

    /// A fifth foot shaped `- U U U -` before the close becomes a spondee
    /// followed by a dactyl.
    pub fn correct_invalid_fifth_foot(&self, scansion: &str) -> String {
        let s = self.constants.stressed;
        let u = self.constants.unstressed;
        let mut symbols: Vec<char> = compact(scansion).chars().collect();
        let len = symbols.len();

        if len >= 6 && symbols[len - 6..len - 1] == [s, u, u, u, s] {
            symbols[len - 5] = s;
        }

        rebuild(scansion, &symbols.into_iter().collect::<String>())
    }

    /// Turn every iamb or trochee outside the closing foot into a spondee.
    /// Scansions with no parse are returned unchanged.
    pub fn correct_invalid_feet(&self, scansion: &str) -> String {
        let Some(spans) = self.validator.hexameter_foot_spans(scansion) else {
            return scansion.to_string();
        };
        let iamb: Vec<char> = self.constants.iamb().chars().collect();
        let trochee: Vec<char> = self.constants.trochee().chars().collect();
        let mut symbols: Vec<char> = compact(scansion).chars().collect();

        let inner = spans.len().saturating_sub(1);
        for span in spans.into_iter().take(inner) {
            let foot = &symbols[span.clone()];
            if foot == iamb.as_slice() || foot == trochee.as_slice() {
                for slot in &mut symbols[span] {
                    *slot = self.constants.stressed;
                }
            }
        }

        rebuild(scansion, &symbols.into_iter().collect::<String>())
    }

    /// The single nearest template, when there is exactly one and it differs
    /// by one symbol.
    pub fn closest_single_substitution(&self, scansion: &str) -> Option<String> {
        let candidates = self.validator.closest_hexameter_patterns(scansion);
        let [candidate] = candidates.as_slice() else {
            return None;
        };
        if differences(&compact(scansion), candidate).len() != 1 {
            return None;
        }
        Some(rebuild(scansion, candidate))
    }

    /// Rebuild the line foot by foot from the end, keeping the final two
    /// symbols. Dactyls and spondees stand, a run of three shorts becomes a
    /// dactyl, and anything else becomes a spondee.
    pub fn smooth_dactyl_chain(&self, scansion: &str) -> String {
        let s = self.constants.stressed;
        let u = self.constants.unstressed;
        let symbols: Vec<char> = compact(scansion).chars().collect();
        if symbols.len() < 2 {
            return scansion.to_string();
        }

        let body = &symbols[..symbols.len() - 2];
        let mut reversed: Vec<char> = symbols[body.len()..].iter().rev().copied().collect();

        let mut remaining = body.len();
        while remaining > 0 {
            let idx = remaining - 1;
            if idx == 0 {
                reversed.push(s);
                remaining -= 1;
                continue;
            }
            let one = body[idx];
            let two = body[idx - 1];
            let three = idx.checked_sub(2).map(|i| body[i]);

            if one == u && two == u && three == Some(s) {
                reversed.extend([u, u, s]);
                remaining -= 3;
            } else if one == s && two == s {
                reversed.extend([s, s]);
                remaining -= 2;
            } else if one == u && two == u && three == Some(u) {
                reversed.extend([u, u, s]);
                remaining -= 3;
            } else {
                reversed.extend([s, s]);
                remaining -= 2;
            }
        }

        let smoothed: String = reversed.into_iter().rev().collect();
        rebuild(scansion, &smoothed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repairer() -> ScansionRepairer {
        ScansionRepairer::default()
    }

    // ─────────────────────────────────────────────────────────────
    // Pattern repairs
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn inverted_amphibrach_middle_lengthens() {
        let r = repairer();
        assert_eq!(r.correct_inverted_amphibrachs("-U-"), "---");
        assert_eq!(r.correct_inverted_amphibrachs("-  U  -"), "-  -  -");
        assert_eq!(r.correct_inverted_amphibrachs("-UU-"), "-UU-");
    }

    #[test]
    fn inverted_amphibrach_runs_are_all_lengthened() {
        let r = repairer();
        assert_eq!(r.correct_inverted_amphibrachs("-U-U-"), "-----");
        assert_eq!(r.correct_inverted_amphibrachs("- U - U - UU"), "- - - - - UU");
    }

    #[test]
    fn invalid_start() {
        let r = repairer();
        assert_eq!(r.correct_invalid_start("--U-UU"), "----UU");
        assert_eq!(r.correct_invalid_start("---U-UU"), "-----UU");
        assert_eq!(r.correct_invalid_start("-UU--"), "-UU--");
    }

    #[test]
    fn invalid_start_keeps_spacing() {
        assert_eq!(repairer().correct_invalid_start("- -  U -"), "- -  - -");
    }

    #[test]
    fn invalid_fifth_foot() {
        let r = repairer();
        assert_eq!(
            r.correct_invalid_fifth_foot("-UU---UU----UUU--"),
            "-UU---UU-----UU--"
        );
        assert_eq!(r.correct_invalid_fifth_foot("-UU--"), "-UU--");
    }

    #[test]
    fn invalid_feet_become_spondees() {
        let r = repairer();
        assert_eq!(r.correct_invalid_feet("U--U-UU-U"), "-----UU-U");
        assert_eq!(r.correct_invalid_feet("UUU-"), "UUU-");
    }

    #[test]
    fn closing_foot_is_left_alone() {
        assert_eq!(repairer().correct_invalid_feet("-UU-U"), "-UU-U");
    }

    // ─────────────────────────────────────────────────────────────
    // Template repairs
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn single_substitution_to_nearest_template() {
        let repaired = repairer().closest_single_substitution("-UU-U-UU---UU--");
        assert_eq!(repaired.as_deref(), Some("-UU---UU---UU--"));
    }

    #[test]
    fn ties_are_not_repaired() {
        assert_eq!(repairer().closest_single_substitution("-UUU-UU-UU-UU-U"), None);
    }

    #[test]
    fn repairs_needing_more_than_one_change_are_skipped() {
        assert_eq!(repairer().closest_single_substitution("UUUUUUUUUUUUUU"), None);
    }

    #[test]
    fn dactyl_chain() {
        let r = repairer();
        assert_eq!(r.smooth_dactyl_chain("-UU-UUU-UU-UU-U"), "-----UU-UU-UU-U");
        assert_eq!(r.smooth_dactyl_chain("-U-UU-UU-UU-U-U"), "---UU-UU-UU---U");
        assert_eq!(r.smooth_dactyl_chain("UU-UU-UU-UU-UU-U"), "---UU-UU-UU-UU-U");
    }

    #[test]
    fn dactyl_chain_keeps_spacing() {
        assert_eq!(repairer().smooth_dactyl_chain("U U -  U"), "- - -  U");
    }

    #[test]
    fn dactyl_chain_keeps_valid_lines() {
        let line = "-UU---UU---UU--";
        assert_eq!(repairer().smooth_dactyl_chain(line), line);
    }
}
