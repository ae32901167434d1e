//! Core data types for the corpus tree.
//!
//! A work is segmented into an ordered list of [`Division`]s, each holding
//! an ordered list of [`Line`]s. Sentences and annotations refer back to
//! lines through their [`LineId`].

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SegmenterError};

/// Identifier of a line, unique within one work and assigned in source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(pub usize);

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Stored division field a citation level can map onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DivisionField {
    Volume,
    Chapter,
    Section,
    Fragment,
    Title,
}

impl DivisionField {
    /// Column / YAML key name of this field.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Volume => "volume",
            Self::Chapter => "chapter",
            Self::Section => "section",
            Self::Fragment => "fragment",
            Self::Title => "title",
        }
    }
}

impl fmt::Display for DivisionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ancestor citation values stored on a division.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DivisionFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fragment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl DivisionFields {
    /// Get the value stored in a field.
    #[must_use]
    pub fn get(&self, field: DivisionField) -> Option<&str> {
        match field {
            DivisionField::Volume => self.volume.as_deref(),
            DivisionField::Chapter => self.chapter.as_deref(),
            DivisionField::Section => self.section.as_deref(),
            DivisionField::Fragment => self.fragment.as_deref(),
            DivisionField::Title => self.title.as_deref(),
        }
    }

    /// Set a field value.
    pub fn set(&mut self, field: DivisionField, value: impl Into<String>) {
        let slot = match field {
            DivisionField::Volume => &mut self.volume,
            DivisionField::Chapter => &mut self.chapter,
            DivisionField::Section => &mut self.section,
            DivisionField::Fragment => &mut self.fragment,
            DivisionField::Title => &mut self.title,
        };
        *slot = Some(value.into());
    }

    /// True when no field carries a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.volume.is_none()
            && self.chapter.is_none()
            && self.section.is_none()
            && self.fragment.is_none()
            && self.title.is_none()
    }
}

/// A single line of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub id: LineId,

    /// Line number within the division; `None` for title lines.
    pub number: Option<u32>,

    /// Text content with all citation markup removed.
    pub content: String,

    /// Title/heading line flagged by the converter.
    pub is_title: bool,

    /// Canonical citation of the reference tag that opened this line, if any.
    ///
    /// Level values that could not be placed in the work's schema are kept
    /// here verbatim.
    pub citation: Option<String>,
}

impl Line {
    /// Length of the content in characters.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// A node in the citation hierarchy below a work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Division {
    pub author_id: String,
    pub work_id: String,
    pub fields: DivisionFields,

    /// Canonical citation of the division itself (author, work, ancestor levels).
    pub citation: String,

    pub lines: Vec<Line>,
}

impl Division {
    /// Create a division without lines.
    #[must_use]
    pub fn new(
        author_id: impl Into<String>,
        work_id: impl Into<String>,
        fields: DivisionFields,
        citation: impl Into<String>,
    ) -> Self {
        Self {
            author_id: author_id.into(),
            work_id: work_id.into(),
            fields,
            citation: citation.into(),
            lines: Vec::new(),
        }
    }

    /// Non-title lines in line-number order.
    #[must_use]
    pub fn content_lines(&self) -> Vec<&Line> {
        let mut lines: Vec<&Line> = self.lines.iter().filter(|l| !l.is_title).collect();
        lines.sort_by_key(|l| (l.number, l.id));
        lines
    }

    /// Check the division's own invariants.
    ///
    /// A division must hold at least one line and numbered lines must carry
    /// distinct numbers.
    pub fn validate(&self) -> Result<()> {
        if self.lines.is_empty() {
            return Err(SegmenterError::EmptyDivision {
                citation: self.citation.clone(),
            });
        }

        let mut seen = HashSet::new();
        for line in &self.lines {
            if let Some(number) = line.number {
                if !seen.insert(number) {
                    return Err(SegmenterError::DuplicateLineNumber {
                        citation: self.citation.clone(),
                        number,
                    });
                }
            }
        }

        Ok(())
    }
}

/// Raw input for one work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkInput {
    pub author_id: String,
    pub work_id: String,

    /// Tag-annotated text as produced by the converter.
    pub text: String,
}

impl WorkInput {
    #[must_use]
    pub fn new(
        author_id: impl Into<String>,
        work_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            author_id: author_id.into(),
            work_id: work_id.into(),
            text: text.into(),
        }
    }
}

/// The ordered division tree of a single work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkTree {
    pub author_id: String,
    pub work_id: String,
    pub author_name: String,
    pub work_name: String,

    /// Level names of the structure schema the tree was built with.
    pub schema: Vec<String>,

    pub divisions: Vec<Division>,
}

impl WorkTree {
    /// Total number of lines across all divisions.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.divisions.iter().map(|d| d.lines.len()).sum()
    }

    /// Look up a line by id.
    #[must_use]
    pub fn line(&self, id: LineId) -> Option<&Line> {
        self.divisions
            .iter()
            .flat_map(|d| d.lines.iter())
            .find(|l| l.id == id)
    }

    /// Validate every division of the tree.
    pub fn validate(&self) -> Result<()> {
        self.divisions.iter().try_for_each(Division::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: usize, number: Option<u32>, content: &str) -> Line {
        Line {
            id: LineId(id),
            number,
            content: content.to_string(),
            is_title: number.is_none(),
            citation: None,
        }
    }

    #[test]
    fn test_division_fields_get_set() {
        let mut fields = DivisionFields::default();
        assert!(fields.is_empty());

        fields.set(DivisionField::Chapter, "3");
        assert_eq!(fields.get(DivisionField::Chapter), Some("3"));
        assert_eq!(fields.get(DivisionField::Volume), None);
        assert!(!fields.is_empty());
    }

    #[test]
    fn test_line_char_len_counts_characters() {
        let l = line(0, Some(1), "λόγος");
        assert_eq!(l.char_len(), 5);
        assert_eq!(l.content.len(), 10);
    }

    #[test]
    fn test_content_lines_skip_titles_and_sort() {
        let mut division = Division::new("1", "1", DivisionFields::default(), "c");
        division.lines = vec![
            line(0, None, "ΠΟΛΙΤΕΙΑ"),
            line(2, Some(2), "second"),
            line(1, Some(1), "first"),
        ];

        let contents: Vec<&str> = division
            .content_lines()
            .iter()
            .map(|l| l.content.as_str())
            .collect();
        assert_eq!(contents, vec!["first", "second"]);
    }

    #[test]
    fn test_validate_empty_division() {
        let division = Division::new("1", "1", DivisionFields::default(), "Plato, Respublica");
        let err = division.validate().unwrap_err();
        assert!(matches!(err, SegmenterError::EmptyDivision { .. }));
    }

    #[test]
    fn test_validate_duplicate_line_numbers() {
        let mut division = Division::new("1", "1", DivisionFields::default(), "c");
        division.lines = vec![line(0, Some(1), "a"), line(1, Some(1), "b")];
        let err = division.validate().unwrap_err();
        assert!(matches!(
            err,
            SegmenterError::DuplicateLineNumber { number: 1, .. }
        ));
    }

    #[test]
    fn test_line_id_display() {
        assert_eq!(LineId(12).to_string(), "L12");
    }
}
