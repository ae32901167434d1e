//! Sentence splitting over the lines of a division.

use super::types::{LineSentenceLink, Sentence};
use crate::config::DEFAULT_SENTENCE_DELIMITERS;
use crate::error::{Result, SegmenterError};
use crate::types::{Division, Line, WorkTree};

/// One character of the joined division text.
#[derive(Debug, Clone, Copy)]
struct Cell {
    ch: char,

    /// (index into the content lines, offset within that line); `None` for
    /// the separator between two lines.
    origin: Option<(usize, usize)>,
}

/// Splits divisions into sentences and links them back to their lines.
#[derive(Debug, Clone)]
pub struct SentenceAligner {
    delimiters: Vec<char>,
}

impl SentenceAligner {
    /// Create an aligner with a custom delimiter set.
    ///
    /// An empty set falls back to [`DEFAULT_SENTENCE_DELIMITERS`].
    #[must_use]
    pub fn new(delimiters: Vec<char>) -> Self {
        if delimiters.is_empty() {
            Self::default()
        } else {
            Self { delimiters }
        }
    }

    #[must_use]
    pub fn delimiters(&self) -> &[char] {
        &self.delimiters
    }

    fn is_delimiter(&self, ch: char) -> bool {
        self.delimiters.contains(&ch)
    }

    /// Sentence spans `[start, end)` over a character sequence.
    ///
    /// Spans end after a run of consecutive delimiters, are trimmed of
    /// surrounding whitespace, and are dropped if nothing but whitespace and
    /// delimiters remains. A trailing run without a delimiter is a span too.
    fn spans(&self, chars: &[char]) -> Vec<(usize, usize)> {
        let mut raw = Vec::new();
        let mut start = 0;
        let mut i = 0;

        while i < chars.len() {
            if self.is_delimiter(chars[i]) {
                while i + 1 < chars.len() && self.is_delimiter(chars[i + 1]) {
                    i += 1;
                }
                raw.push((start, i + 1));
                start = i + 1;
            }
            i += 1;
        }
        if start < chars.len() {
            raw.push((start, chars.len()));
        }

        raw.into_iter()
            .filter_map(|(mut start, mut end)| {
                while start < end && chars[start].is_whitespace() {
                    start += 1;
                }
                while end > start && chars[end - 1].is_whitespace() {
                    end -= 1;
                }
                chars[start..end]
                    .iter()
                    .any(|c| !c.is_whitespace() && !self.is_delimiter(*c))
                    .then_some((start, end))
            })
            .collect()
    }

    /// Split plain text into sentence contents.
    ///
    /// # Examples
    /// ```
    /// use textus_segmenter::alignment::SentenceAligner;
    ///
    /// let aligner = SentenceAligner::default();
    /// assert_eq!(
    ///     aligner.split_text("πρῶτον. δεύτερον;; τρίτον"),
    ///     vec!["πρῶτον.", "δεύτερον;;", "τρίτον"]
    /// );
    /// ```
    #[must_use]
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        self.spans(&chars)
            .into_iter()
            .map(|(start, end)| chars[start..end].iter().collect())
            .collect()
    }

    /// Align one division.
    ///
    /// Content lines are joined in line-number order with a single space
    /// that belongs to no line. Sentence indexes start at `first_index`.
    pub fn align_division(
        &self,
        division: &Division,
        division_index: usize,
        first_index: usize,
    ) -> Result<Vec<Sentence>> {
        let lines = division.content_lines();
        let cells = join_lines(&lines);
        let chars: Vec<char> = cells.iter().map(|c| c.ch).collect();

        let mut sentences = Vec::new();
        for (start, end) in self.spans(&chars) {
            let index = first_index + sentences.len();
            let links = collect_links(&cells[start..end], &lines);
            check_links(index, &links, &lines)?;

            let (Some(first), Some(last)) = (links.first(), links.last()) else {
                continue;
            };

            sentences.push(Sentence {
                index,
                division: division_index,
                content: chars[start..end].iter().collect(),
                source_line_ids: links.iter().map(|l| l.line_id).collect(),
                start_offset: first.start,
                end_offset: last.end,
                links,
            });
        }

        tracing::debug!(
            division = %division.citation,
            lines = lines.len(),
            sentences = sentences.len(),
            "aligned division"
        );

        Ok(sentences)
    }

    /// Align every division of a work, numbering sentences across the work.
    pub fn align_work(&self, tree: &WorkTree) -> Result<Vec<Sentence>> {
        let mut sentences = Vec::new();
        for (division_index, division) in tree.divisions.iter().enumerate() {
            let aligned = self.align_division(division, division_index, sentences.len())?;
            sentences.extend(aligned);
        }
        Ok(sentences)
    }
}

impl Default for SentenceAligner {
    fn default() -> Self {
        Self {
            delimiters: DEFAULT_SENTENCE_DELIMITERS.to_vec(),
        }
    }
}

fn join_lines(lines: &[&Line]) -> Vec<Cell> {
    let mut cells = Vec::new();
    for (line_index, line) in lines.iter().enumerate() {
        if line_index > 0 {
            cells.push(Cell {
                ch: ' ',
                origin: None,
            });
        }
        cells.extend(line.content.chars().enumerate().map(|(offset, ch)| Cell {
            ch,
            origin: Some((line_index, offset)),
        }));
    }
    cells
}

/// Group a sentence span's characters into one range per line.
fn collect_links(span: &[Cell], lines: &[&Line]) -> Vec<LineSentenceLink> {
    let mut links: Vec<(usize, LineSentenceLink)> = Vec::new();

    for (sentence_offset, cell) in span.iter().enumerate() {
        let Some((line_index, offset)) = cell.origin else {
            continue;
        };
        match links.last_mut() {
            Some((current, link)) if *current == line_index => link.end = offset + 1,
            _ => links.push((
                line_index,
                LineSentenceLink {
                    line_id: lines[line_index].id,
                    start: offset,
                    end: offset + 1,
                    sentence_offset,
                },
            )),
        }
    }

    links.into_iter().map(|(_, link)| link).collect()
}

fn check_links(sentence: usize, links: &[LineSentenceLink], lines: &[&Line]) -> Result<()> {
    for link in links {
        let Some(line) = lines.iter().find(|l| l.id == link.line_id) else {
            return Err(SegmenterError::UnknownLine {
                sentence,
                line: link.line_id,
            });
        };
        let line_len = line.char_len();
        if link.is_empty() || link.end > line_len {
            return Err(SegmenterError::LinkOutOfRange {
                sentence,
                line: link.line_id,
                start: link.start,
                end: link.end,
                line_len,
            });
        }
    }
    Ok(())
}
