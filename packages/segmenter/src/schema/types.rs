//! Structure schemas and the level-name to division-field mapping.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::{DEFAULT_SCHEMA, LINE_LEVEL};
use crate::error::{Result, SegmenterError};
use crate::types::DivisionField;

/// Fields assigned to ancestor levels with names outside the known vocabulary.
const POSITIONAL_FIELDS: [DivisionField; 4] = [
    DivisionField::Volume,
    DivisionField::Chapter,
    DivisionField::Section,
    DivisionField::Fragment,
];

/// Ordered citation levels of a work, outermost first.
///
/// Always contains exactly one [`LINE_LEVEL`]; the levels before it are the
/// ancestors used for division grouping and ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureSchema {
    levels: Vec<String>,
    line_position: usize,
}

impl StructureSchema {
    /// Build and validate a schema.
    ///
    /// A missing `line` level is appended. Empty schemas, duplicate level
    /// names, several `line` levels, and two levels sharing a division field
    /// are rejected.
    pub fn new(author_id: &str, work_id: &str, levels: Vec<String>) -> Result<Self> {
        let invalid = |reason: String| SegmenterError::InvalidSchema {
            author_id: author_id.to_string(),
            work_id: work_id.to_string(),
            reason,
        };

        let mut levels: Vec<String> = levels.into_iter().map(|l| l.trim().to_string()).collect();
        if levels.is_empty() {
            return Err(invalid("no levels".to_string()));
        }
        if levels.iter().any(String::is_empty) {
            return Err(invalid("empty level name".to_string()));
        }

        let mut seen = HashSet::new();
        for level in &levels {
            if !seen.insert(level.to_lowercase()) {
                return Err(invalid(format!("level '{level}' appears more than once")));
            }
        }

        let line_positions: Vec<usize> = levels
            .iter()
            .enumerate()
            .filter(|(_, l)| is_line_level(l))
            .map(|(i, _)| i)
            .collect();
        let line_position = match line_positions.as_slice() {
            [] => {
                levels.push(LINE_LEVEL.to_string());
                levels.len() - 1
            }
            [position] => *position,
            _ => return Err(invalid(format!("more than one '{LINE_LEVEL}' level"))),
        };

        let schema = Self {
            levels,
            line_position,
        };

        let mut fields = HashSet::new();
        for level in schema.ancestors() {
            if let Some(field) = level_to_field(level, &schema) {
                if !fields.insert(field) {
                    return Err(invalid(format!(
                        "level '{level}' maps to field '{field}' which is already taken"
                    )));
                }
            }
        }

        Ok(schema)
    }

    /// The schema used for works without a registered structure.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            levels: DEFAULT_SCHEMA.iter().map(|l| (*l).to_string()).collect(),
            line_position: DEFAULT_SCHEMA.len() - 1,
        }
    }

    #[must_use]
    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Levels above `line`, outermost first.
    #[must_use]
    pub fn ancestors(&self) -> &[String] {
        &self.levels[..self.line_position]
    }

    /// The level immediately preceding `line`; `None` if `line` comes first.
    #[must_use]
    pub fn principal_level(&self) -> Option<&str> {
        self.ancestors().last().map(String::as_str)
    }

    /// Division fields to sort by: principal level, then chapter, then the
    /// first level. Duplicates are removed, so the list may be shorter.
    #[must_use]
    pub fn ordering_fields(&self) -> Vec<DivisionField> {
        let Some(principal) = self
            .principal_level()
            .and_then(|level| level_to_field(level, self))
        else {
            return Vec::new();
        };

        let mut fields = vec![principal];
        let first = self.levels.first().and_then(|level| level_to_field(level, self));
        for field in [Some(DivisionField::Chapter), first].into_iter().flatten() {
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
        fields
    }
}

/// A resolved schema, tagged with whether it came from the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedSchema {
    Registered(Arc<StructureSchema>),
    Fallback(Arc<StructureSchema>),
}

impl ResolvedSchema {
    #[must_use]
    pub fn schema(&self) -> &StructureSchema {
        match self {
            Self::Registered(schema) | Self::Fallback(schema) => schema,
        }
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

fn is_line_level(level: &str) -> bool {
    level.eq_ignore_ascii_case(LINE_LEVEL)
}

/// Map a level name to the division field it is stored in.
///
/// Known names map by vocabulary; other ancestor levels map by position.
/// `line`, levels after it, and levels not in the schema map to `None`.
///
/// # Examples
/// ```
/// use textus_segmenter::schema::{level_to_field, StructureSchema};
/// use textus_segmenter::DivisionField;
///
/// let levels = vec!["book".to_string(), "card".to_string(), "line".to_string()];
/// let schema = StructureSchema::new("0012", "001", levels).unwrap();
/// assert_eq!(level_to_field("book", &schema), Some(DivisionField::Volume));
/// assert_eq!(level_to_field("card", &schema), Some(DivisionField::Chapter));
/// assert_eq!(level_to_field("line", &schema), None);
/// ```
#[must_use]
pub fn level_to_field(level: &str, schema: &StructureSchema) -> Option<DivisionField> {
    let position = schema
        .ancestors()
        .iter()
        .position(|l| l.eq_ignore_ascii_case(level))?;

    let known = match level.to_lowercase().as_str() {
        "volume" | "book" | "part" | "tome" => Some(DivisionField::Volume),
        "chapter" | "poem" | "letter" | "speech" | "oration" | "dialogue" => {
            Some(DivisionField::Chapter)
        }
        "section" | "paragraph" | "subsection" | "verse" => Some(DivisionField::Section),
        "fragment" | "frag" => Some(DivisionField::Fragment),
        "title" | "heading" => Some(DivisionField::Title),
        _ => None,
    };

    known.or_else(|| {
        if schema.ancestors().len() == 1 {
            Some(DivisionField::Chapter)
        } else {
            POSITIONAL_FIELDS.get(position).copied()
        }
    })
}
