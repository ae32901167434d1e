//! Error types for the segmenter.
//!
//! Recoverable formatting anomalies (malformed tags, missing lookups,
//! unmatched level values) never surface here; they are absorbed with
//! fallback values and a log line. The variants below are the hard
//! failures that abort ingestion of a single work.

use thiserror::Error;

use crate::types::LineId;

/// Main error type for the segmenter library.
#[derive(Debug, Error)]
pub enum SegmenterError {
    /// Invalid author or work identifier.
    #[error("Invalid identifier: '{0}'. Expected 1-16 ASCII letters or digits (e.g., 0059)")]
    InvalidIdentifier(String),

    /// Structure schema configuration is inconsistent.
    #[error("Invalid structure schema for {author_id}/{work_id}: {reason}")]
    InvalidSchema {
        author_id: String,
        work_id: String,
        reason: String,
    },

    /// A division ended up without any lines.
    #[error("Division {citation} has no lines")]
    EmptyDivision { citation: String },

    /// Two numbered lines of one division share a number.
    #[error("Line number {number} appears twice in division {citation}")]
    DuplicateLineNumber { citation: String, number: u32 },

    /// A computed line-sentence range does not fit inside its line.
    #[error(
        "Sentence {sentence} links line {line} at {start}..{end}, but the line has {line_len} characters"
    )]
    LinkOutOfRange {
        sentence: usize,
        line: LineId,
        start: usize,
        end: usize,
        line_len: usize,
    },

    /// A sentence refers to a line that is not part of its division.
    #[error("Sentence {sentence} refers to unknown line {line}")]
    UnknownLine { sentence: usize, line: LineId },

    /// Annotation token offsets fall outside the sentence text.
    #[error("Token {index} spans {start}..{end}, but sentence {sentence} has {len} characters")]
    TokenOutOfRange {
        sentence: usize,
        index: usize,
        start: usize,
        end: usize,
        len: usize,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML (de)serialization error.
    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

/// Result type alias for segmenter operations.
pub type Result<T> = std::result::Result<T, SegmenterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SegmenterError::InvalidIdentifier("bad id".to_string());
        assert!(err.to_string().contains("bad id"));
        assert!(err.to_string().contains("0059"));
    }

    #[test]
    fn test_link_out_of_range_display() {
        let err = SegmenterError::LinkOutOfRange {
            sentence: 2,
            line: LineId(7),
            start: 3,
            end: 12,
            line_len: 10,
        };
        assert_eq!(
            err.to_string(),
            "Sentence 2 links line L7 at 3..12, but the line has 10 characters"
        );
    }

    #[test]
    fn test_invalid_schema_display() {
        let err = SegmenterError::InvalidSchema {
            author_id: "0059".to_string(),
            work_id: "030".to_string(),
            reason: "more than one 'line' level".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid structure schema for 0059/030: more than one 'line' level"
        );
    }
}
