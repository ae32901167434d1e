//! Configuration constants, the corpus configuration file and identifier
//! validation.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SegmenterError};

/// Sentinel display name for author or work identifiers missing from the index.
pub const UNKNOWN: &str = "Unknown";

/// Opening marker of an inline reference tag.
pub const TAG_OPEN: &str = "<tag>";

/// Closing marker of an inline reference tag.
pub const TAG_CLOSE: &str = "</tag>";

/// Opening marker the converter puts around title lines.
pub const TITLE_OPEN: &str = "<title>";

/// Closing marker the converter puts around title lines.
pub const TITLE_CLOSE: &str = "</title>";

/// Name of the schema level addressed by individual lines.
pub const LINE_LEVEL: &str = "line";

/// Schema used for works without a registered structure.
pub const DEFAULT_SCHEMA: [&str; 2] = ["chapter", LINE_LEVEL];

/// Sort value used for divisions that lack their ordering key.
pub const ABSENT_SORT_KEY: &str = "1";

/// Maximum number of dotted components in a level-value field.
pub const MAX_LEVEL_COMPONENTS: usize = 3;

/// Sentence-terminal delimiters used when the configuration sets none.
///
/// U+037E is the Greek question mark, which renders like a semicolon.
pub const DEFAULT_SENTENCE_DELIMITERS: [char; 5] = ['.', ';', '\u{037E}', '?', '!'];

/// Default output directory for YAML exports.
pub const DEFAULT_OUTPUT_DIR: &str = "corpus";

/// Author and work identifiers: short ASCII alphanumerics (TLG style "0059", "030").
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static IDENTIFIER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{1,16}$").expect("valid regex"));

/// Validate an author or work identifier.
///
/// # Examples
/// ```
/// use textus_segmenter::config::validate_identifier;
///
/// assert!(validate_identifier("0059").is_ok());
/// assert!(validate_identifier("../etc").is_err());
/// ```
pub fn validate_identifier(id: &str) -> Result<()> {
    if IDENTIFIER_PATTERN.is_match(id) {
        Ok(())
    } else {
        Err(SegmenterError::InvalidIdentifier(id.to_string()))
    }
}

/// Structure schema registered for a single work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaEntry {
    pub author: String,
    pub work: String,
    pub levels: Vec<String>,
}

/// Corpus configuration loaded once per process.
///
/// ```yaml
/// authors:
///   "0059": Plato
/// works:
///   "0059":
///     "030": Respublica
/// schemas:
///   - author: "0059"
///     work: "030"
///     levels: [book, section, line]
/// sentence_delimiters: [".", ";"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorpusConfig {
    /// Author identifier to display name.
    #[serde(default)]
    pub authors: BTreeMap<String, String>,

    /// Author identifier to (work identifier to display name).
    #[serde(default)]
    pub works: BTreeMap<String, BTreeMap<String, String>>,

    /// Per-work structure schemas.
    #[serde(default)]
    pub schemas: Vec<SchemaEntry>,

    /// Sentence-terminal delimiters; defaults to [`DEFAULT_SENTENCE_DELIMITERS`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentence_delimiters: Option<Vec<char>>,
}

impl CorpusConfig {
    /// Parse a configuration from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&content)?;
        tracing::debug!(
            path = %path.display(),
            authors = config.authors.len(),
            schemas = config.schemas.len(),
            "loaded corpus configuration"
        );
        Ok(config)
    }

    /// Sentence-terminal delimiters in effect.
    #[must_use]
    pub fn delimiters(&self) -> Vec<char> {
        match &self.sentence_delimiters {
            Some(custom) if !custom.is_empty() => custom.clone(),
            _ => DEFAULT_SENTENCE_DELIMITERS.to_vec(),
        }
    }
}
