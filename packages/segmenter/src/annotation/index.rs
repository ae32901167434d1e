//! Line-level category index derived from sentence projections.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::types::{LineAnnotation, LineProjection, Projection};
use crate::types::LineId;

/// Derived per-line view over the current sentence projections.
///
/// Projections are stored per (line, sentence). Applying a projection first
/// invalidates everything the same sentence contributed before, so
/// re-annotating a sentence overwrites its share and applying the same
/// projection twice is a no-op. Line summaries are always recomputed from the
/// stored projections, never merged incrementally.
#[derive(Debug, Clone, Default)]
pub struct LineIndex {
    by_line: BTreeMap<LineId, BTreeMap<usize, LineProjection>>,
    lines_by_sentence: HashMap<usize, Vec<LineId>>,
}

impl LineIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a sentence's contribution with a new projection.
    pub fn apply(&mut self, projection: &Projection) {
        let sentence = projection.sentence.sentence_index;
        self.invalidate(sentence);

        let mut touched = Vec::with_capacity(projection.lines.len());
        for line in &projection.lines {
            self.by_line
                .entry(line.line_id)
                .or_default()
                .insert(sentence, line.clone());
            touched.push(line.line_id);
        }
        self.lines_by_sentence.insert(sentence, touched);
    }

    /// Remove everything a sentence contributed.
    pub fn invalidate(&mut self, sentence_index: usize) {
        let Some(line_ids) = self.lines_by_sentence.remove(&sentence_index) else {
            return;
        };
        for line_id in line_ids {
            if let Some(projections) = self.by_line.get_mut(&line_id) {
                projections.remove(&sentence_index);
                if projections.is_empty() {
                    self.by_line.remove(&line_id);
                }
            }
        }
    }

    /// Union of the categories of every token currently projected onto a line.
    #[must_use]
    pub fn categories(&self, line_id: LineId) -> BTreeSet<String> {
        self.by_line
            .get(&line_id)
            .map(|projections| {
                projections
                    .values()
                    .flat_map(|p| p.categories.iter().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Summary of one line, or `None` if nothing is projected onto it.
    #[must_use]
    pub fn line(&self, line_id: LineId) -> Option<LineAnnotation> {
        let projections = self.by_line.get(&line_id)?;
        let mut tokens: Vec<_> = projections
            .values()
            .flat_map(|p| p.tokens.iter().cloned())
            .collect();
        tokens.sort_by_key(|t| (t.char_start, t.char_end));

        Some(LineAnnotation {
            line_id,
            tokens,
            categories: self.categories(line_id),
        })
    }

    /// Summaries of all annotated lines in id order.
    pub fn lines(&self) -> impl Iterator<Item = LineAnnotation> + '_ {
        self.by_line.keys().filter_map(|id| self.line(*id))
    }

    /// Sentences currently projected onto a line.
    #[must_use]
    pub fn sentences_for(&self, line_id: LineId) -> Vec<usize> {
        self.by_line
            .get(&line_id)
            .map(|projections| projections.keys().copied().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_line.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_line.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::types::{SentenceAnnotation, Token};
    use crate::annotation::category_set;
    use pretty_assertions::assert_eq;

    fn projection(sentence: usize, lines: Vec<(usize, Vec<(&str, &str)>)>) -> Projection {
        let lines: Vec<LineProjection> = lines
            .into_iter()
            .map(|(line, tokens)| {
                let tokens: Vec<Token> = tokens
                    .iter()
                    .enumerate()
                    .map(|(i, (text, category))| {
                        Token::new(*text, i * 10, i * 10 + 3).with_category(*category)
                    })
                    .collect();
                LineProjection {
                    line_id: LineId(line),
                    sentence_index: sentence,
                    categories: category_set(&tokens),
                    tokens,
                }
            })
            .collect();
        let tokens: Vec<Token> = lines.iter().flat_map(|l| l.tokens.clone()).collect();
        Projection {
            sentence: SentenceAnnotation {
                sentence_index: sentence,
                categories: category_set(&tokens),
                tokens,
            },
            lines,
        }
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_line_categories_union_over_sentences() {
        let mut index = LineIndex::new();
        index.apply(&projection(0, vec![(1, vec![("a", "person")])]));
        index.apply(&projection(1, vec![(1, vec![("b", "place")]), (2, vec![("c", "deity")])]));

        assert_eq!(index.categories(LineId(1)), set(&["person", "place"]));
        assert_eq!(index.categories(LineId(2)), set(&["deity"]));
        assert_eq!(index.sentences_for(LineId(1)), vec![0, 1]);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let p = projection(0, vec![(1, vec![("a", "person"), ("b", "place")])]);
        let mut once = LineIndex::new();
        once.apply(&p);
        let mut twice = LineIndex::new();
        twice.apply(&p);
        twice.apply(&p);

        assert_eq!(once.lines().collect::<Vec<_>>(), twice.lines().collect::<Vec<_>>());
        assert_eq!(twice.line(LineId(1)).unwrap().tokens.len(), 2);
    }

    #[test]
    fn test_reapply_overwrites_instead_of_merging() {
        let mut index = LineIndex::new();
        index.apply(&projection(0, vec![(1, vec![("a", "person")]), (2, vec![("b", "place")])]));
        index.apply(&projection(0, vec![(1, vec![("a", "deity")])]));

        assert_eq!(index.categories(LineId(1)), set(&["deity"]));
        assert!(index.line(LineId(2)).is_none());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_invalidate_removes_sentence() {
        let mut index = LineIndex::new();
        index.apply(&projection(4, vec![(1, vec![("a", "person")])]));
        index.invalidate(4);
        assert!(index.is_empty());
        assert!(index.categories(LineId(1)).is_empty());

        // Unknown sentences are ignored
        index.invalidate(99);
    }
}
