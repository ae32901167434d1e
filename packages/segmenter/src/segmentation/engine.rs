//! Structural segmentation of one work.

use std::sync::Arc;

use super::ordering::order_divisions;
use super::state::{SegmentContext, SegmentState};
use crate::citation::{prepare_markup, tokenize, CitationIndex};
use crate::config::validate_identifier;
use crate::error::Result;
use crate::schema::SchemaRegistry;
use crate::text::normalize;
use crate::types::{WorkInput, WorkTree};

/// Turns tag-annotated source text into an ordered [`WorkTree`].
///
/// Holds the shared lookup tables; segmenting different works from several
/// threads only needs a clone.
#[derive(Debug, Clone)]
pub struct Segmenter {
    index: Arc<CitationIndex>,
    schemas: Arc<SchemaRegistry>,
}

impl Segmenter {
    #[must_use]
    pub fn new(index: Arc<CitationIndex>, schemas: Arc<SchemaRegistry>) -> Self {
        Self { index, schemas }
    }

    /// Segment a work into divisions and lines.
    ///
    /// The input is normalized, bare citations are wrapped and split words
    /// repaired before the tag stream is scanned. The resulting divisions are
    /// ordered by the work's schema and validated.
    pub fn segment(&self, input: &WorkInput) -> Result<WorkTree> {
        validate_identifier(&input.author_id)?;
        validate_identifier(&input.work_id)?;

        let resolved = self.schemas.resolve(&input.author_id, &input.work_id);
        if resolved.is_fallback() {
            tracing::debug!(
                author_id = %input.author_id,
                work_id = %input.work_id,
                "no registered schema, using fallback"
            );
        }
        let schema = resolved.schema();

        let text = normalize(&input.text);
        let markup = prepare_markup(&text);

        let ctx = SegmentContext {
            author_id: &input.author_id,
            work_id: &input.work_id,
            schema,
            index: &self.index,
        };
        let mut divisions = tokenize(&markup)
            .into_iter()
            .fold(SegmentState::new(ctx), SegmentState::step)
            .finish();
        order_divisions(&mut divisions, schema);

        let tree = WorkTree {
            author_id: input.author_id.clone(),
            work_id: input.work_id.clone(),
            author_name: self.index.author_name(Some(&input.author_id)).to_string(),
            work_name: self
                .index
                .work_name(Some(&input.author_id), Some(&input.work_id))
                .to_string(),
            schema: schema.levels().to_vec(),
            divisions,
        };
        tree.validate()?;

        tracing::debug!(
            author_id = %tree.author_id,
            work_id = %tree.work_id,
            divisions = tree.divisions.len(),
            lines = tree.line_count(),
            "segmented work"
        );

        Ok(tree)
    }
}
