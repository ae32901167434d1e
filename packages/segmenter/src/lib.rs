//! Textus Segmenter - Citation-aware structural segmentation and sentence
//! alignment for ancient-language corpora.
//!
//! The crate turns the output of a beta-code converter (plain text with
//! inline `<tag>[author][work] 1.2.3</tag>` reference tags) into an ordered
//! tree of divisions and lines, derives a sentence layer on top of it, and
//! projects sentence-level annotations back onto the lines.
//!
//! # Example
//!
//! ```
//! use textus_segmenter::{Corpus, CorpusConfig, WorkInput};
//!
//! let config = CorpusConfig::from_yaml_str(
//!     "schemas:\n  - {author: A, work: B, levels: [volume, chapter, section, line]}",
//! )
//! .unwrap();
//! let corpus = Corpus::from_config(&config).unwrap();
//!
//! let work = corpus
//!     .segment_work(&WorkInput::new("A", "B", "[A][B][C][D] 1.2.3 πρῶτον.\n δεύτερον. τρίτον."))
//!     .unwrap();
//! assert_eq!(work.tree.divisions.len(), 1);
//! assert_eq!(work.line_count(), 2);
//! assert_eq!(work.sentence_count(), 3);
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Constants, corpus configuration and identifier validation
//! - [`types`]: Core data types (WorkTree, Division, Line, ...)
//! - [`error`]: Error types and Result alias
//! - [`text`]: Source text normalization
//! - [`citation`]: Reference tag parsing, canonicalization and stripping
//! - [`schema`]: Per-work structure schemas
//! - [`segmentation`]: Tag stream to ordered divisions and lines
//! - [`alignment`]: Sentence splitting and line links
//! - [`annotation`]: Projection of sentence annotations onto lines
//! - [`yaml`]: YAML export
//! - [`cli`]: Command-line interface
//! - [`corpus`]: Main segmentation service

pub mod alignment;
pub mod annotation;
pub mod citation;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod error;
pub mod schema;
pub mod segmentation;
pub mod text;
pub mod types;
pub mod yaml;

// Re-export main entry points
pub use corpus::{Corpus, SegmentedWork};
pub use segmentation::Segmenter;

// Re-export commonly used items
pub use alignment::{LineSentenceLink, Sentence, SentenceAligner};
pub use annotation::{project, LineIndex, Projection, Token};
pub use citation::{CanonicalCitation, CitationIndex, ReferenceTag};
pub use config::{validate_identifier, CorpusConfig};
pub use error::{Result, SegmenterError};
pub use schema::{level_to_field, ResolvedSchema, SchemaRegistry, StructureSchema};
pub use types::{Division, DivisionField, DivisionFields, Line, LineId, WorkInput, WorkTree};
