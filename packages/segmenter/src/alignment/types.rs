//! Sentence records and their line links.

use serde::{Deserialize, Serialize};

use crate::types::LineId;

/// The part of a line a sentence covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSentenceLink {
    pub line_id: LineId,

    /// Start of the range in line characters (inclusive).
    pub start: usize,

    /// End of the range in line characters (exclusive).
    pub end: usize,

    /// Character offset in the sentence content where this range begins.
    pub sentence_offset: usize,
}

impl LineSentenceLink {
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Whether a sentence-relative offset falls inside this range.
    #[must_use]
    pub fn contains_sentence_offset(&self, offset: usize) -> bool {
        offset >= self.sentence_offset && offset < self.sentence_offset + self.len()
    }
}

/// A sentence derived from one division's lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    /// Position of the sentence within the work, from 0.
    pub index: usize,

    /// Position of the owning division in the work tree.
    pub division: usize,

    pub content: String,

    /// Contributing lines in encounter order.
    pub source_line_ids: Vec<LineId>,

    /// Offset of the sentence start in its first line.
    pub start_offset: usize,

    /// Offset of the sentence end in its last line (exclusive).
    pub end_offset: usize,

    pub links: Vec<LineSentenceLink>,
}

impl Sentence {
    /// Length of the content in characters.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}
