//! Annotation tokens and their sentence and line projections.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::LineId;

/// A labelled token returned by the annotation engine.
///
/// Offsets are character offsets into the annotated text, half-open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lemma: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub char_start: usize,
    pub char_end: usize,
}

impl Token {
    #[must_use]
    pub fn new(text: impl Into<String>, char_start: usize, char_end: usize) -> Self {
        Self {
            text: text.into(),
            lemma: None,
            pos: None,
            category: None,
            char_start,
            char_end,
        }
    }

    #[must_use]
    pub fn with_lemma(mut self, lemma: impl Into<String>) -> Self {
        self.lemma = Some(lemma.into());
        self
    }

    #[must_use]
    pub fn with_pos(mut self, pos: impl Into<String>) -> Self {
        self.pos = Some(pos.into());
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// The category label, if present and non-empty.
    #[must_use]
    pub fn category_label(&self) -> Option<&str> {
        self.category.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }
}

/// Union of token categories, ignoring empty labels.
#[must_use]
pub fn category_set<'a>(tokens: impl IntoIterator<Item = &'a Token>) -> BTreeSet<String> {
    tokens
        .into_iter()
        .filter_map(Token::category_label)
        .map(String::from)
        .collect()
}

/// Sentence-level annotation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceAnnotation {
    pub sentence_index: usize,
    pub tokens: Vec<Token>,
    pub categories: BTreeSet<String>,
}

/// The share of one sentence's annotation that falls on one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineProjection {
    pub line_id: LineId,
    pub sentence_index: usize,

    /// Tokens with offsets re-expressed in line characters.
    pub tokens: Vec<Token>,
    pub categories: BTreeSet<String>,
}

/// Result of projecting one sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    pub sentence: SentenceAnnotation,

    /// One entry per linked line, in link order.
    pub lines: Vec<LineProjection>,
}

/// Line-level summary over all sentences currently projected onto a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAnnotation {
    pub line_id: LineId,
    pub tokens: Vec<Token>,
    pub categories: BTreeSet<String>,
}
