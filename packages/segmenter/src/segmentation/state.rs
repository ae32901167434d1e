//! The open-division accumulator folded over the token stream.

use std::mem;

use crate::citation::{title_content, CanonicalCitation, CitationIndex, Fragment, ReferenceTag};
use crate::config::LINE_LEVEL;
use crate::schema::{level_to_field, StructureSchema};
use crate::types::{Division, DivisionFields, Line, LineId};

/// Read-only inputs shared by every step of one work's scan.
#[derive(Debug, Clone, Copy)]
pub struct SegmentContext<'a> {
    pub author_id: &'a str,
    pub work_id: &'a str,
    pub schema: &'a StructureSchema,
    pub index: &'a CitationIndex,
}

/// Where a reference tag places the text that follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Placement {
    author_id: String,
    work_id: String,
    fields: DivisionFields,
    explicit_line: Option<u32>,
    division_citation: String,
    line_citation: String,
}

#[derive(Debug)]
struct OpenDivision {
    division: Division,
    next_number: u32,
    last_number: Option<u32>,
}

impl OpenDivision {
    fn new(division: Division, start: Option<u32>) -> Self {
        Self {
            division,
            next_number: start.unwrap_or(1),
            last_number: None,
        }
    }

    fn matches(&self, placement: &Placement) -> bool {
        self.division.author_id == placement.author_id
            && self.division.work_id == placement.work_id
            && self.division.fields == placement.fields
    }

    fn restart_at(&mut self, number: u32) {
        match self.last_number {
            Some(last) if number <= last => {
                tracing::warn!(
                    division = %self.division.citation,
                    cited = number,
                    last,
                    "cited line number does not increase, continuing sequentially"
                );
            }
            _ => self.next_number = number,
        }
    }

    fn take_number(&mut self) -> u32 {
        let number = self.next_number;
        self.last_number = Some(number);
        self.next_number = number.saturating_add(1);
        number
    }
}

/// Accumulator for the structural scan of one work.
///
/// Folded over the [`Fragment`]s of a work with [`step`](Self::step); the
/// finished divisions come out of [`finish`](Self::finish) in source order.
#[derive(Debug)]
pub struct SegmentState<'a> {
    ctx: SegmentContext<'a>,
    divisions: Vec<Division>,
    open: Option<OpenDivision>,
    partial: String,
    pending_citations: Vec<String>,
    next_line_id: usize,
}

impl<'a> SegmentState<'a> {
    #[must_use]
    pub fn new(ctx: SegmentContext<'a>) -> Self {
        Self {
            ctx,
            divisions: Vec::new(),
            open: None,
            partial: String::new(),
            pending_citations: Vec::new(),
            next_line_id: 0,
        }
    }

    /// Consume one fragment.
    #[must_use]
    pub fn step(mut self, fragment: Fragment<'_>) -> Self {
        match fragment {
            Fragment::Text(text) => self.push_text(text),
            Fragment::Tag(tag) => self.apply_tag(&tag),
        }
        self
    }

    /// Flush the last line and return all non-empty divisions in source order.
    ///
    /// Citations of trailing tags with no text after them are appended to the
    /// citation of the last line.
    #[must_use]
    pub fn finish(mut self) -> Vec<Division> {
        self.flush_line();
        self.close_division();
        if !self.pending_citations.is_empty() {
            let trailing = mem::take(&mut self.pending_citations);
            match self.divisions.last_mut().and_then(|d| d.lines.last_mut()) {
                Some(line) => {
                    line.citation = Some(match line.citation.take() {
                        Some(existing) => format!("{existing}; {}", trailing.join("; ")),
                        None => trailing.join("; "),
                    });
                }
                None => tracing::debug!(citations = ?trailing, "reference tags in a work without text"),
            }
        }
        self.divisions
    }

    fn push_text(&mut self, text: &str) {
        let mut pieces = text.split('\n');
        if let Some(first) = pieces.next() {
            self.partial.push_str(first);
        }
        for piece in pieces {
            self.flush_line();
            self.partial.push_str(piece);
        }
    }

    fn apply_tag(&mut self, tag: &ReferenceTag) {
        let placement = self.place(tag);

        let same_division = self.open.as_ref().is_some_and(|open| open.matches(&placement));
        if same_division {
            if let Some(number) = placement.explicit_line {
                self.flush_line();
                if let Some(open) = self.open.as_mut() {
                    open.restart_at(number);
                }
            }
        } else {
            self.flush_line();
            self.close_division();
            let division = Division::new(
                placement.author_id,
                placement.work_id,
                placement.fields,
                placement.division_citation,
            );
            tracing::debug!(division = %division.citation, "opening division");
            self.open = Some(OpenDivision::new(division, placement.explicit_line));
        }

        // Citations of tags with no text yet carry over to the next line
        self.pending_citations.push(placement.line_citation);
    }

    /// Map a tag's level values onto the schema.
    ///
    /// Components align right onto the ancestor levels. With one component
    /// more than there are ancestors, the last one is the starting line
    /// number. Ancestors the tag leaves out are inherited from the open
    /// division of the same work; values that fit no level are unmatched.
    fn place(&self, tag: &ReferenceTag) -> Placement {
        let schema = self.ctx.schema;
        let ancestors = schema.ancestors();
        let author_id = tag
            .author_id
            .clone()
            .unwrap_or_else(|| self.ctx.author_id.to_string());
        let work_id = tag
            .work_id
            .clone()
            .unwrap_or_else(|| self.ctx.work_id.to_string());

        let values = tag.levels.values();
        let mut unmatched = tag.levels.overflow.clone();
        let mut levels = Vec::new();
        let mut explicit_line = None;

        let ancestor_values = if values.len() > ancestors.len() {
            let (head, rest) = values.split_at(values.len() - ancestors.len() - 1);
            unmatched.extend(head.iter().map(|v| (*v).to_string()));
            let (ancestor_values, line) = rest.split_at(ancestors.len());
            if let [line] = line {
                match line.parse::<u32>() {
                    Ok(number) => {
                        explicit_line = Some(number);
                        levels.push((LINE_LEVEL.to_string(), (*line).to_string()));
                    }
                    Err(_) => unmatched.push((*line).to_string()),
                }
            }
            ancestor_values
        } else {
            values.as_slice()
        };

        let first_cited = ancestors.len() - ancestor_values.len();
        let mut fields = DivisionFields::default();

        if let Some(open) = self.open.as_ref().filter(|open| {
            open.division.author_id == author_id && open.division.work_id == work_id
        }) {
            for level in &ancestors[..first_cited] {
                if let Some(field) = level_to_field(level, schema) {
                    if let Some(value) = open.division.fields.get(field) {
                        fields.set(field, value);
                    }
                }
            }
        }

        let mut cited = Vec::new();
        for (level, value) in ancestors[first_cited..].iter().zip(ancestor_values) {
            match level_to_field(level, schema) {
                Some(field) => {
                    fields.set(field, *value);
                    cited.push((level.clone(), (*value).to_string()));
                }
                None => unmatched.push((*value).to_string()),
            }
        }
        cited.extend(levels);

        if !unmatched.is_empty() {
            tracing::debug!(raw = %tag.raw, ?unmatched, "level values not matched to schema");
        }

        let author_name = self.ctx.index.author_name(Some(&author_id));
        let work_name = self.ctx.index.work_name(Some(&author_id), Some(&work_id));

        let division_levels = ancestors
            .iter()
            .filter_map(|level| {
                let value = fields.get(level_to_field(level, schema)?)?;
                Some((level.clone(), value.to_string()))
            })
            .collect();
        let division_citation =
            CanonicalCitation::new(author_name, work_name, division_levels).to_string();
        let line_citation = CanonicalCitation::new(author_name, work_name, cited)
            .with_unmatched(unmatched)
            .to_string();

        Placement {
            author_id,
            work_id,
            fields,
            explicit_line,
            division_citation,
            line_citation,
        }
    }

    fn flush_line(&mut self) {
        let raw = mem::take(&mut self.partial);
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return;
        }

        let (content, is_title) = match title_content(trimmed) {
            Some(title) => (title, true),
            None => (trimmed, false),
        };
        if content.is_empty() {
            return;
        }

        let id = LineId(self.next_line_id);
        self.next_line_id += 1;
        let citation = (!self.pending_citations.is_empty())
            .then(|| mem::take(&mut self.pending_citations).join("; "));

        let ctx = self.ctx;
        let open = self
            .open
            .get_or_insert_with(|| OpenDivision::new(unplaced_division(ctx), None));
        let number = (!is_title).then(|| open.take_number());

        open.division.lines.push(Line {
            id,
            number,
            content: content.to_string(),
            is_title,
            citation,
        });
    }

    fn close_division(&mut self) {
        if let Some(open) = self.open.take() {
            if open.division.lines.is_empty() {
                tracing::debug!(division = %open.division.citation, "discarding empty division");
            } else {
                self.divisions.push(open.division);
            }
        }
    }
}

/// Division holding text that precedes the first reference tag.
fn unplaced_division(ctx: SegmentContext<'_>) -> Division {
    let author_name = ctx.index.author_name(Some(ctx.author_id));
    let work_name = ctx.index.work_name(Some(ctx.author_id), Some(ctx.work_id));
    Division::new(
        ctx.author_id,
        ctx.work_id,
        DivisionFields::default(),
        CanonicalCitation::new(author_name, work_name, Vec::new()).to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citation::tokenize;
    use pretty_assertions::assert_eq;

    fn run(text: &str, levels: &[&str]) -> Vec<Division> {
        let schema =
            StructureSchema::new("1", "1", levels.iter().map(|l| l.to_string()).collect()).unwrap();
        let index = CitationIndex::new()
            .with_author("1", "Homer")
            .with_work("1", "1", "Ilias");
        let ctx = SegmentContext {
            author_id: "1",
            work_id: "1",
            schema: &schema,
            index: &index,
        };
        tokenize(text)
            .into_iter()
            .fold(SegmentState::new(ctx), SegmentState::step)
            .finish()
    }

    fn contents(division: &Division) -> Vec<(Option<u32>, &str)> {
        division
            .lines
            .iter()
            .map(|l| (l.number, l.content.as_str()))
            .collect()
    }

    #[test]
    fn test_text_before_first_tag_gets_a_division() {
        let divisions = run("μῆνιν ἄειδε\nθεὰ", &["book", "line"]);
        assert_eq!(divisions.len(), 1);
        assert!(divisions[0].fields.is_empty());
        assert_eq!(divisions[0].citation, "Homer, Ilias");
        assert_eq!(contents(&divisions[0]), vec![(Some(1), "μῆνιν ἄειδε"), (Some(2), "θεὰ")]);
    }

    #[test]
    fn test_new_division_on_changed_values() {
        let text = "<tag>[1][1] 1</tag>a\nb\n<tag>[1][1] 2</tag>c\n";
        let divisions = run(text, &["book", "line"]);
        assert_eq!(divisions.len(), 2);
        assert_eq!(divisions[0].fields.volume.as_deref(), Some("1"));
        assert_eq!(divisions[0].citation, "Homer, Ilias (book 1)");
        assert_eq!(contents(&divisions[0]), vec![(Some(1), "a"), (Some(2), "b")]);
        assert_eq!(contents(&divisions[1]), vec![(Some(1), "c")]);
    }

    #[test]
    fn test_explicit_line_numbers() {
        let text = "<tag>[1][1] 1.5</tag>a\n<tag>[1][1] 1.9</tag>b\nc\n";
        let divisions = run(text, &["book", "line"]);
        assert_eq!(divisions.len(), 1);
        assert_eq!(
            contents(&divisions[0]),
            vec![(Some(5), "a"), (Some(9), "b"), (Some(10), "c")]
        );
        assert_eq!(
            divisions[0].lines[0].citation.as_deref(),
            Some("Homer, Ilias (book 1, line 5)")
        );
    }

    #[test]
    fn test_non_increasing_line_number_continues_sequentially() {
        let text = "<tag>[1][1] 1.5</tag>a\n<tag>[1][1] 1.3</tag>b\n";
        let divisions = run(text, &["book", "line"]);
        assert_eq!(contents(&divisions[0]), vec![(Some(5), "a"), (Some(6), "b")]);
        assert!(divisions[0].validate().is_ok());
    }

    #[test]
    fn test_missing_ancestors_are_inherited() {
        let text = "<tag>[1][1] 2.7</tag>a\n<tag>[1][1] 8</tag>b\n";
        let divisions = run(text, &["book", "chapter", "line"]);
        assert_eq!(divisions.len(), 2);
        assert_eq!(divisions[1].fields.volume.as_deref(), Some("2"));
        assert_eq!(divisions[1].fields.chapter.as_deref(), Some("8"));
    }

    #[test]
    fn test_mid_line_tag_of_same_division_does_not_break_line() {
        let text = "<tag>[1][1] 1</tag>ἀρχὴ <tag>[1][1] 1</tag>τέλος\n";
        let divisions = run(text, &["book", "line"]);
        assert_eq!(contents(&divisions[0]), vec![(Some(1), "ἀρχὴ τέλος")]);
    }

    #[test]
    fn test_unmatched_values_stay_on_line_citation() {
        // Line-first schema: no ancestors, two components
        let text = "<tag>[1][1] 4.12</tag>a\n";
        let divisions = run(text, &["line"]);
        assert_eq!(contents(&divisions[0]), vec![(Some(12), "a")]);
        assert_eq!(
            divisions[0].lines[0].citation.as_deref(),
            Some("Homer, Ilias (line 12) [unmatched: 4]")
        );
    }

    #[test]
    fn test_title_lines_have_no_number() {
        let text = "<tag>[1][1] 1</tag><title>ΙΛΙΑΔΟΣ Α</title>\nμῆνιν\n";
        let divisions = run(text, &["book", "line"]);
        let lines = &divisions[0].lines;
        assert!(lines[0].is_title);
        assert_eq!(lines[0].number, None);
        assert_eq!(lines[0].content, "ΙΛΙΑΔΟΣ Α");
        assert_eq!(lines[1].number, Some(1));
    }

    #[test]
    fn test_whitespace_lines_and_empty_divisions_are_skipped() {
        let text = "<tag>[1][1] 1</tag>  \n \n<tag>[1][1] 2</tag> a \n";
        let divisions = run(text, &["book", "line"]);
        assert_eq!(divisions.len(), 1);
        assert_eq!(divisions[0].fields.volume.as_deref(), Some("2"));
        assert_eq!(contents(&divisions[0]), vec![(Some(1), "a")]);
    }

    #[test]
    fn test_line_ids_follow_source_order() {
        let text = "<tag>[1][1] 2</tag>a\nb\n<tag>[1][1] 1</tag>c\n";
        let divisions = run(text, &["book", "line"]);
        let ids: Vec<usize> = divisions
            .iter()
            .flat_map(|d| d.lines.iter().map(|l| l.id.0))
            .collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_textless_tag_citation_carries_to_next_division() {
        let text = "<tag>[1][1] 1.4</tag>\n<tag>[1][1] 2</tag>alpha.\n";
        let divisions = run(text, &["book", "line"]);
        assert_eq!(divisions.len(), 1);
        assert_eq!(divisions[0].fields.volume.as_deref(), Some("2"));
        assert_eq!(contents(&divisions[0]), vec![(Some(1), "alpha.")]);
        assert_eq!(
            divisions[0].lines[0].citation.as_deref(),
            Some("Homer, Ilias (book 1, line 4); Homer, Ilias (book 2)")
        );
    }

    #[test]
    fn test_trailing_tag_citation_attaches_to_last_line() {
        let text = "<tag>[1][1] 1</tag>a\nb\n<tag>[1][1] 2</tag>\n";
        let divisions = run(text, &["book", "line"]);
        assert_eq!(divisions.len(), 1);
        let lines = &divisions[0].lines;
        assert_eq!(lines[0].citation.as_deref(), Some("Homer, Ilias (book 1)"));
        assert_eq!(lines[1].citation.as_deref(), Some("Homer, Ilias (book 2)"));
    }

    #[test]
    fn test_tags_without_any_text_yield_nothing() {
        let divisions = run("<tag>[1][1] 1</tag>\n<tag>[1][1] 2</tag>", &["book", "line"]);
        assert!(divisions.is_empty());
    }
}
