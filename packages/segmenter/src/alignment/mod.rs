//! Sentence alignment.
//!
//! Sentences are found over the joined content lines of a division and
//! linked back to every line they touch with a line-local character range.

mod aligner;
mod types;

pub use aligner::SentenceAligner;
pub use types::{LineSentenceLink, Sentence};
