//! Latin dactylic hexameter scansion.
//!
//! [`HexameterScanner::scan`] takes a line of verse and returns a
//! [`VerseRecord`] holding its syllables, a long/short scansion aligned with
//! the line, a macronized rendering and notes on how the scansion was found.
//! The [`Syllabifier`] and [`MetricalValidator`] are usable on their own.
//!
//! All components share one read-only [`MetricalConstants`] and hold no
//! mutable state, so a scanner can be shared across threads.

pub mod constants;
pub mod error;
pub mod formatter;
pub mod repair;
pub mod scanner;
pub mod syllabifier;
mod text;
pub mod transform;
pub mod validator;
pub mod verse;

pub use constants::{default_constants, MetricalConstants};
pub use error::ConfigError;
pub use formatter::ScansionFormatter;
pub use scanner::HexameterScanner;
pub use syllabifier::Syllabifier;
pub use validator::MetricalValidator;
pub use verse::{Note, VerseRecord};
