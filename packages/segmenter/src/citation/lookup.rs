//! Author/work index and canonical citations.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::tag::ReferenceTag;
use crate::config::{CorpusConfig, UNKNOWN};

/// Resolved, human-readable citation.
///
/// Formats as `Author, Work (level value, level value)`, followed by
/// `[unmatched: …]` when some level values could not be placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalCitation {
    pub author: String,
    pub work: String,

    /// Ordered (level name, value) pairs.
    pub levels: Vec<(String, String)>,

    /// Raw values that could not be matched to a level, kept verbatim.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unmatched: Vec<String>,
}

impl CanonicalCitation {
    #[must_use]
    pub fn new(
        author: impl Into<String>,
        work: impl Into<String>,
        levels: Vec<(String, String)>,
    ) -> Self {
        Self {
            author: author.into(),
            work: work.into(),
            levels,
            unmatched: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_unmatched(mut self, unmatched: Vec<String>) -> Self {
        self.unmatched = unmatched;
        self
    }

    /// Value of a named level, if present.
    #[must_use]
    pub fn level(&self, name: &str) -> Option<&str> {
        self.levels
            .iter()
            .find(|(level, _)| level == name)
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Display for CanonicalCitation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.author, self.work)?;
        if !self.levels.is_empty() {
            let levels = self
                .levels
                .iter()
                .map(|(name, value)| format!("{name} {value}"))
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, " ({levels})")?;
        }
        if !self.unmatched.is_empty() {
            write!(f, " [unmatched: {}]", self.unmatched.join(" "))?;
        }
        Ok(())
    }
}

/// Author index plus a nested work index keyed by author, then work.
///
/// Loaded once and shared read-only between workers.
#[derive(Debug, Clone, Default)]
pub struct CitationIndex {
    authors: HashMap<String, String>,
    works: HashMap<String, HashMap<String, String>>,
}

impl CitationIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from the corpus configuration.
    #[must_use]
    pub fn from_config(config: &CorpusConfig) -> Self {
        let authors = config
            .authors
            .iter()
            .map(|(id, name)| (id.clone(), name.clone()))
            .collect();
        let works = config
            .works
            .iter()
            .map(|(author, works)| {
                let works = works
                    .iter()
                    .map(|(id, name)| (id.clone(), name.clone()))
                    .collect();
                (author.clone(), works)
            })
            .collect();
        Self { authors, works }
    }

    /// Add an author entry.
    #[must_use]
    pub fn with_author(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.authors.insert(id.into(), name.into());
        self
    }

    /// Add a work entry under an author.
    #[must_use]
    pub fn with_work(
        mut self,
        author_id: impl Into<String>,
        work_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.works
            .entry(author_id.into())
            .or_default()
            .insert(work_id.into(), name.into());
        self
    }

    /// Display name of an author, or [`UNKNOWN`].
    #[must_use]
    pub fn author_name(&self, author_id: Option<&str>) -> &str {
        author_id
            .and_then(|id| self.authors.get(id))
            .map_or(UNKNOWN, String::as_str)
    }

    /// Display name of a work, or [`UNKNOWN`].
    #[must_use]
    pub fn work_name(&self, author_id: Option<&str>, work_id: Option<&str>) -> &str {
        match (author_id, work_id) {
            (Some(author), Some(work)) => self
                .works
                .get(author)
                .and_then(|works| works.get(work))
                .map_or(UNKNOWN, String::as_str),
            _ => UNKNOWN,
        }
    }

    /// Canonicalize a tag using its positional level labels.
    #[must_use]
    pub fn canonicalize(&self, tag: &ReferenceTag) -> CanonicalCitation {
        let author = tag.author_id.as_deref();
        let work = tag.work_id.as_deref();

        let author_name = self.author_name(author);
        if author_name == UNKNOWN {
            tracing::debug!(author = ?author, "author not in index, using sentinel");
        }

        let levels = tag
            .levels
            .components
            .iter()
            .map(|c| (c.slot.as_str().to_string(), c.value.clone()))
            .collect();

        CanonicalCitation::new(author_name, self.work_name(author, work), levels)
            .with_unmatched(tag.levels.overflow.clone())
    }
}
