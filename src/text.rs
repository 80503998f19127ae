//! Indexed line buffer and the string/offset helpers shared across the
//! pipeline.
//!
//! Every transform is length-preserving at the `char` level, so the original
//! line, the working line and the scansion string stay aligned position for
//! position. Transforms describe their changes as [`Edit`]s applied to a
//! [`LineBuffer`] instead of rewriting strings piecemeal.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref PUNCTUATION: Regex = Regex::new(r"[\p{P}\p{S}]").unwrap();
    static ref SEPARATORS: Regex = Regex::new(r"[\p{P}\p{S}\s]").unwrap();
}

/// Replace each punctuation or whitespace character (tabs, no-break spaces)
/// with a single plain space.
pub fn punctuation_to_spaces(line: &str) -> String {
    SEPARATORS.replace_all(line, " ").into_owned()
}

pub fn remove_punctuation(text: &str) -> String {
    PUNCTUATION.replace_all(text, "").into_owned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Line buffer
// ─────────────────────────────────────────────────────────────────────────────

/// A single length-preserving change to a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    /// Overwrite one character.
    Replace { at: usize, with: char },
    /// Blank out `len` characters starting at `start`.
    Erase { start: usize, len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineBuffer {
    chars: Vec<char>,
}

impl LineBuffer {
    pub fn new(line: &str) -> Self {
        Self {
            chars: line.chars().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn get(&self, idx: usize) -> Option<char> {
        self.chars.get(idx).copied()
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Apply an edit. Positions past the end of the line are ignored.
    pub fn apply(&mut self, edit: Edit) {
        match edit {
            Edit::Replace { at, with } => {
                if let Some(slot) = self.chars.get_mut(at) {
                    *slot = with;
                }
            }
            Edit::Erase { start, len } => {
                let end = (start + len).min(self.chars.len());
                for slot in self.chars.iter_mut().take(end).skip(start) {
                    *slot = ' ';
                }
            }
        }
    }

    pub fn apply_all(&mut self, edits: impl IntoIterator<Item = Edit>) {
        for edit in edits {
            self.apply(edit);
        }
    }

    /// Index of the first non-space character at or after `from`.
    pub fn skip_spaces(&self, from: usize) -> usize {
        let mut idx = from;
        while idx < self.chars.len() && self.chars[idx].is_whitespace() {
            idx += 1;
        }
        idx
    }
}

impl std::fmt::Display for LineBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for c in &self.chars {
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

/// Char-index spans `(start, end)` of every non-overlapping match.
pub fn match_char_spans(re: &Regex, text: &str) -> Vec<(usize, usize)> {
    let byte_spans: Vec<(usize, usize)> = re.find_iter(text).map(|m| (m.start(), m.end())).collect();
    if byte_spans.is_empty() {
        return vec![];
    }

    // One pass over the text maps byte offsets to char offsets
    let mut char_at_byte = vec![0usize; text.len() + 1];
    let mut count = 0;
    for (byte_idx, c) in text.char_indices() {
        for slot in &mut char_at_byte[byte_idx..byte_idx + c.len_utf8()] {
            *slot = count;
        }
        count += 1;
    }
    char_at_byte[text.len()] = count;

    byte_spans
        .into_iter()
        .map(|(start, end)| (char_at_byte[start], char_at_byte[end]))
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Scansion strings
// ─────────────────────────────────────────────────────────────────────────────

/// Positions of the non-space marks in a scansion string.
pub fn mark_positions(scansion: &str) -> Vec<usize> {
    scansion
        .chars()
        .enumerate()
        .filter(|(_, c)| !c.is_whitespace())
        .map(|(idx, _)| idx)
        .collect()
}

/// Scansion with all spacing removed.
pub fn compact(scansion: &str) -> String {
    scansion.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Write the symbols of `compacted` back onto the mark positions of
/// `scansion`, keeping its spacing.
pub fn rebuild(scansion: &str, compacted: &str) -> String {
    let mut chars: Vec<char> = scansion.chars().collect();
    for (pos, symbol) in mark_positions(scansion).into_iter().zip(compacted.chars()) {
        chars[pos] = symbol;
    }
    chars.into_iter().collect()
}

/// Positions at which two strings differ; surplus length counts as difference.
pub fn differences(a: &str, b: &str) -> Vec<usize> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    (0..a.len().max(b.len()))
        .filter(|&idx| a.get(idx) != b.get(idx))
        .collect()
}

/// Positions holding the stressed symbol.
pub fn stress_positions(stressed: char, scansion: &str) -> Vec<usize> {
    scansion
        .chars()
        .enumerate()
        .filter(|&(_, c)| c == stressed)
        .map(|(idx, _)| idx)
        .collect()
}

/// Levenshtein distance over chars.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let above = row[j + 1];
            let substitution = diagonal + usize::from(ca != cb);
            row[j + 1] = substitution.min(above + 1).min(row[j] + 1);
            diagonal = above;
        }
    }

    row[b.len()]
}
