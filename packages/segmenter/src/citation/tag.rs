//! Reference tag parsing.
//!
//! A tag body has the shape `PREFIX LEVELVALUES`, where `PREFIX` is a run of
//! bracketed codes (`[author][work][...]`) and `LEVELVALUES` is a dotted
//! sequence of up to three components, e.g. `[0059][030] 1.327.a`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::MAX_LEVEL_COMPONENTS;

/// Positional label of a level-value component.
///
/// Components are right-aligned, so a single component is always a `Line`
/// and two components are `Subdivision` + `Line`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelSlot {
    Volume,
    Subdivision,
    Line,
}

impl LevelSlot {
    const ORDER: [LevelSlot; MAX_LEVEL_COMPONENTS] =
        [LevelSlot::Volume, LevelSlot::Subdivision, LevelSlot::Line];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Volume => "volume",
            Self::Subdivision => "subdivision",
            Self::Line => "line",
        }
    }
}

impl fmt::Display for LevelSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single labelled component of a level-value field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelValue {
    pub slot: LevelSlot,
    pub value: String,
}

/// Parsed level-value field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelValues {
    /// Kept components, outermost first; the last one is always the `Line` slot.
    pub components: Vec<LevelValue>,

    /// Components that did not fit into the three positional slots, in source order.
    pub overflow: Vec<String>,
}

impl LevelValues {
    /// Component values in order, without labels.
    #[must_use]
    pub fn values(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.value.as_str()).collect()
    }

    /// Value carried in a given slot.
    #[must_use]
    pub fn get(&self, slot: LevelSlot) -> Option<&str> {
        self.components
            .iter()
            .find(|c| c.slot == slot)
            .map(|c| c.value.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

/// Parse a dotted level-value field.
///
/// Empty and non-alphanumeric components are dropped; the remaining ones are
/// labelled by position from the right.
///
/// # Examples
/// ```
/// use textus_segmenter::citation::{parse_level_values, LevelSlot};
///
/// let levels = parse_level_values("2.3");
/// assert_eq!(levels.get(LevelSlot::Subdivision), Some("2"));
/// assert_eq!(levels.get(LevelSlot::Line), Some("3"));
/// assert_eq!(levels.get(LevelSlot::Volume), None);
/// ```
#[must_use]
pub fn parse_level_values(field: &str) -> LevelValues {
    let mut kept: Vec<String> = field
        .split('.')
        .map(str::trim)
        .filter(|c| !c.is_empty() && c.chars().all(char::is_alphanumeric))
        .map(String::from)
        .collect();

    let overflow = if kept.len() > MAX_LEVEL_COMPONENTS {
        kept.drain(..kept.len() - MAX_LEVEL_COMPONENTS).collect()
    } else {
        Vec::new()
    };

    let offset = MAX_LEVEL_COMPONENTS - kept.len();
    let components = kept
        .into_iter()
        .enumerate()
        .map(|(i, value)| LevelValue {
            slot: LevelSlot::ORDER[offset + i],
            value,
        })
        .collect();

    LevelValues {
        components,
        overflow,
    }
}

/// A parsed inline citation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceTag {
    pub author_id: Option<String>,
    pub work_id: Option<String>,

    /// Bracketed codes after author and work; carried along, never interpreted.
    pub extra_codes: Vec<String>,

    pub levels: LevelValues,

    /// The complete matched span, markers included.
    pub raw: String,
}

impl ReferenceTag {
    /// Parse a tag body (the text between the tag markers).
    ///
    /// Parsing never fails: missing codes become `None` and unusable level
    /// components are dropped.
    #[must_use]
    pub fn parse(body: &str, raw: impl Into<String>) -> Self {
        let mut codes: Vec<String> = Vec::new();
        let mut rest = body.trim_start();

        while let Some(after_open) = rest.strip_prefix('[') {
            let Some(close) = after_open.find(']') else {
                break;
            };
            codes.push(after_open[..close].trim().to_string());
            rest = after_open[close + 1..].trim_start();
        }

        let mut words = rest.split_whitespace();
        let mut levels = words.next().map(parse_level_values).unwrap_or_default();
        levels.overflow.extend(words.map(String::from));

        let mut codes = codes.into_iter().map(|c| (!c.is_empty()).then_some(c));
        let author_id = codes.next().flatten();
        let work_id = codes.next().flatten();
        let extra_codes = codes.flatten().collect();

        Self {
            author_id,
            work_id,
            extra_codes,
            levels,
            raw: raw.into(),
        }
    }
}
