//! Main segmentation service.
//!
//! Ties the shared lookup tables, the segmenter and the aligner together so
//! callers can turn one work's source text into lines and sentences with a
//! single call.

use std::sync::Arc;

use crate::alignment::{Sentence, SentenceAligner};
use crate::citation::CitationIndex;
use crate::config::CorpusConfig;
use crate::error::Result;
use crate::schema::SchemaRegistry;
use crate::segmentation::Segmenter;
use crate::types::{WorkInput, WorkTree};

/// A work split into its division tree and sentence layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentedWork {
    pub tree: WorkTree,
    pub sentences: Vec<Sentence>,
}

impl SegmentedWork {
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.tree.line_count()
    }

    #[must_use]
    pub fn sentence_count(&self) -> usize {
        self.sentences.len()
    }
}

/// Loaded corpus configuration, shareable across threads.
#[derive(Debug, Clone)]
pub struct Corpus {
    segmenter: Segmenter,
    aligner: SentenceAligner,
}

impl Corpus {
    #[must_use]
    pub fn new(
        index: Arc<CitationIndex>,
        schemas: Arc<SchemaRegistry>,
        aligner: SentenceAligner,
    ) -> Self {
        Self {
            segmenter: Segmenter::new(index, schemas),
            aligner,
        }
    }

    /// Build the lookup tables from a corpus configuration.
    pub fn from_config(config: &CorpusConfig) -> Result<Self> {
        let index = CitationIndex::from_config(config);
        let schemas = SchemaRegistry::from_config(config)?;
        Ok(Self::new(
            Arc::new(index),
            Arc::new(schemas),
            SentenceAligner::new(config.delimiters()),
        ))
    }

    #[must_use]
    pub fn aligner(&self) -> &SentenceAligner {
        &self.aligner
    }

    /// Segment a work and align its sentences.
    pub fn segment_work(&self, input: &WorkInput) -> Result<SegmentedWork> {
        let tree = self.segmenter.segment(input)?;
        let sentences = self.aligner.align_work(&tree)?;

        tracing::info!(
            author_id = %tree.author_id,
            work_id = %tree.work_id,
            divisions = tree.divisions.len(),
            lines = tree.line_count(),
            sentences = sentences.len(),
            "segmented and aligned work"
        );

        Ok(SegmentedWork { tree, sentences })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::normalize;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_config_and_segment_work() {
        let config = CorpusConfig::from_yaml_str(
            r#"
authors: {"0059": Plato}
works: {"0059": {"030": Respublica}}
schemas:
  - {author: "0059", work: "030", levels: [book, section, line]}
"#,
        )
        .unwrap();
        let corpus = Corpus::from_config(&config).unwrap();

        let work = corpus
            .segment_work(&WorkInput::new(
                "0059",
                "030",
                "<tag>[0059][030] 1.327</tag>Κατέβην χθὲς εἰς Πειραιᾶ.\nΠροσευξάμενος δέ\n",
            ))
            .unwrap();

        assert_eq!(work.line_count(), 2);
        assert_eq!(work.sentence_count(), 2);
        assert_eq!(work.sentences[1].content, normalize("Προσευξάμενος δέ"));
        assert_eq!(work.tree.divisions[0].citation, "Plato, Respublica (book 1, section 327)");
    }

    #[test]
    fn test_from_config_invalid_schema() {
        let config = CorpusConfig::from_yaml_str(
            "schemas:\n  - {author: \"1\", work: \"1\", levels: [line, line]}",
        )
        .unwrap();
        assert!(Corpus::from_config(&config).is_err());
    }
}
