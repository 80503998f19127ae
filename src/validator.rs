//! Hexameter templates, validation, foot parsing and nearest-template search.

use crate::constants::{default_constants, MetricalConstants};
use crate::error::ConfigError;
use crate::text::edit_distance;
use std::collections::HashSet;
use std::ops::Range;
use std::sync::Arc;

/// Fewest symbols a hexameter can have: six spondees.
pub const MIN_HEXAMETER_LENGTH: usize = 12;
/// Most symbols a hexameter can have: five dactyls and the close.
pub const MAX_HEXAMETER_LENGTH: usize = 17;

#[derive(Debug, Clone)]
pub struct MetricalValidator {
    constants: Arc<MetricalConstants>,
    templates: Vec<String>,
    template_set: HashSet<String>,
}

impl Default for MetricalValidator {
    fn default() -> Self {
        Self::build(default_constants())
    }
}

impl MetricalValidator {
    pub fn new(constants: Arc<MetricalConstants>) -> Result<Self, ConfigError> {
        constants.validate()?;
        Ok(Self::build(constants))
    }

    fn build(constants: Arc<MetricalConstants>) -> Self {
        let dactyl = constants.dactyl();
        let spondee = constants.spondee();
        let ending = constants.hexameter_ending();

        // 32..63 have six binary digits; the five after the leading 1 choose
        // spondee (1) or dactyl (0) for feet one to five.
        let templates: Vec<String> = (32u32..64)
            .map(|value| {
                let mut template: String = (0..5)
                    .rev()
                    .map(|bit| {
                        if value & (1 << bit) != 0 {
                            spondee.as_str()
                        } else {
                            dactyl.as_str()
                        }
                    })
                    .collect();
                template.push_str(&ending);
                template
            })
            .collect();
        let template_set = templates.iter().cloned().collect();

        Self {
            constants,
            templates,
            template_set,
        }
    }

    /// The 32 legal hexameter templates, all-dactyl first.
    pub fn templates(&self) -> &[String] {
        &self.templates
    }

    pub fn is_valid_hexameter(&self, scansion: &str) -> bool {
        let mut symbols = self.symbols(scansion);
        if symbols.chars().count() < MIN_HEXAMETER_LENGTH {
            return false;
        }
        symbols.pop();
        symbols.push(self.constants.optional_ending);
        self.template_set.contains(&symbols)
    }

    /// Parse a scansion into feet, working back from the close. Each foot
    /// keeps the spacing found between its symbols.
    ///
    /// Returns `None` when no consistent division into feet exists.
    pub fn hexameter_feet(&self, scansion: &str) -> Option<Vec<String>> {
        let chars: Vec<char> = scansion.chars().collect();
        let positions: Vec<usize> = chars
            .iter()
            .enumerate()
            .filter(|&(_, &c)| self.is_symbol(c))
            .map(|(idx, _)| idx)
            .collect();

        let spans = self.hexameter_foot_spans(scansion)?;
        Some(
            spans
                .into_iter()
                .map(|span| {
                    let start = positions[span.start];
                    let end = positions[span.end - 1];
                    chars[start..=end].iter().collect()
                })
                .collect(),
        )
    }

    /// Foot boundaries as ranges over the compacted symbol sequence.
    pub fn hexameter_foot_spans(&self, scansion: &str) -> Option<Vec<Range<usize>>> {
        let symbols: Vec<char> = self.symbols(scansion).chars().collect();
        if symbols.is_empty() {
            return None;
        }

        let stressed = self.constants.stressed;
        let unstressed = self.constants.unstressed;
        let anceps = self.constants.optional_ending;

        let mut spans = Vec::new();
        let mut end = symbols.len();
        while end > 0 {
            if end == 1 {
                return None;
            }
            let pair = (symbols[end - 2], symbols[end - 1]);
            let is_pair_foot = pair.0 == stressed
                && (pair.1 == anceps || pair.1 == stressed || pair.1 == unstressed)
                || pair == (unstressed, stressed);
            if is_pair_foot {
                spans.push(end - 2..end);
                end -= 2;
            } else if pair == (unstressed, unstressed) && end >= 3 && symbols[end - 3] == stressed
            {
                spans.push(end - 3..end);
                end -= 3;
            } else if pair == (unstressed, unstressed) && end >= 4 {
                // No long to complete the dactyl: keep the two shorts as a
                // foot and pair the preceding short with the symbol before it.
                spans.push(end - 2..end);
                spans.push(end - 4..end - 2);
                end -= 4;
            } else {
                return None;
            }
        }

        spans.reverse();
        Some(spans)
    }

    /// All templates at minimum edit distance from the scansion, each with the
    /// scansion's own final symbol in place of the anceps.
    pub fn closest_hexameter_patterns(&self, scansion: &str) -> Vec<String> {
        let mut symbols = self.symbols(scansion);
        let Some(true_ending) = symbols.pop() else {
            return vec![];
        };
        symbols.push(self.constants.optional_ending);
        let length = symbols.chars().count();

        let distances: Vec<(usize, &String)> = self
            .templates
            .iter()
            .filter(|t| t.chars().count() == length)
            .map(|t| (edit_distance(&symbols, t), t))
            .collect();
        let Some(best) = distances.iter().map(|(d, _)| *d).min() else {
            return vec![];
        };

        distances
            .into_iter()
            .filter(|(d, _)| *d == best)
            .map(|(_, t)| {
                let mut pattern: String = t.chars().take(length - 1).collect();
                pattern.push(true_ending);
                pattern
            })
            .collect()
    }

    /// Syllable indices that are long in an all-dactyl line.
    pub fn hexameter_known_stresses(&self) -> Vec<usize> {
        (0..MAX_HEXAMETER_LENGTH).step_by(3).collect()
    }

    /// Syllable indices that may be short in a 17-syllable line.
    pub fn hexameter_possible_unstresses(&self) -> Vec<usize> {
        let known = self.hexameter_known_stresses();
        (0..MAX_HEXAMETER_LENGTH)
            .filter(|idx| !known.contains(idx))
            .collect()
    }

    fn is_symbol(&self, c: char) -> bool {
        !c.is_whitespace() && c != self.constants.foot_separator
    }

    fn symbols(&self, scansion: &str) -> String {
        scansion.chars().filter(|&c| self.is_symbol(c)).collect()
    }
}
