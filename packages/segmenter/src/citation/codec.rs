//! Tag extraction, stripping and word repair.
//!
//! All transforms are fail-soft: markup that cannot be parsed stays in the
//! text unmodified and is reported through a `warn!` log line.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::lookup::{CanonicalCitation, CitationIndex};
use super::tag::ReferenceTag;
use crate::config::{TAG_CLOSE, TAG_OPEN, TITLE_CLOSE, TITLE_OPEN};

/// A hyphenated word interrupted by one or more tags: `λόγ-<tag>…</tag>ος`.
///
/// The continuation may itself be split again (`προσ-<tag>…</tag>ευ-<tag>…</tag>ξάμενος`);
/// the whole chain is matched at once.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static SPLIT_WORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<word>\w+)(?P<chain>(?:-[ \t]*(?:\r?\n)?[ \t]*<tag>[^<\n]*</tag>\w+)+)")
        .expect("valid regex")
});

/// One link of a split chain. Whitespace between the hyphen and the tag (the
/// wrapping newline) is captured so it can be put back after the repaired word.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static SPLIT_LINK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-(?P<ws>[ \t]*(?:\r?\n)?[ \t]*)(?P<tag><tag>[^<\n]*</tag>)(?P<cont>\w+)")
        .expect("valid regex")
});

/// A bare bracket citation at the start of a line: `[A][B][C][D] 1.2.3 text`.
///
/// Level values must contain a digit or an inner dot, so a prefix followed
/// directly by a word (`[1][1] Gallia est`) is left as text.
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static BARE_CITATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?P<prefix>(?:\[[^\[\]\n]*\])+)[ \t]+(?P<levels>[0-9A-Za-z.]*[0-9][0-9A-Za-z.]*|[0-9A-Za-z]+(?:\.[0-9A-Za-z]+)+)(?:[ \t]+|$)",
    )
    .expect("valid regex")
});

/// A piece of the tokenized source: plain text or a parsed tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment<'a> {
    Text(&'a str),
    Tag(ReferenceTag),
}

/// Text with its tags removed, plus where each tag stood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrippedText {
    pub text: String,

    /// (character offset in `text`, citation) in source order.
    pub citations: Vec<(usize, CanonicalCitation)>,
}

/// Rewrite `word-<tag>…</tag>continuation` to `wordcontinuation<tag>…</tag>`.
///
/// Must run before tags are stripped so the annotation engine never sees a
/// word broken by a line wrap.
///
/// # Examples
/// ```
/// use textus_segmenter::citation::repair_split_words;
///
/// assert_eq!(repair_split_words("λόγ-<tag>X</tag>ος"), "λόγος<tag>X</tag>");
/// ```
#[must_use]
pub fn repair_split_words(text: &str) -> Cow<'_, str> {
    SPLIT_WORD_PATTERN.replace_all(text, |caps: &Captures<'_>| {
        let mut word = caps["word"].to_string();
        let mut moved = String::new();
        for link in SPLIT_LINK_PATTERN.captures_iter(&caps["chain"]) {
            word.push_str(&link["cont"]);
            moved.push_str(&link["ws"]);
            moved.push_str(&link["tag"]);
        }
        word + &moved
    })
}

/// Rewrite bare bracket citations at line starts into `<tag>` form.
///
/// # Examples
/// ```
/// use textus_segmenter::citation::wrap_bare_citations;
///
/// assert_eq!(
///     wrap_bare_citations("[1][2] 3.4 text"),
///     "<tag>[1][2] 3.4</tag>text"
/// );
/// ```
#[must_use]
pub fn wrap_bare_citations(text: &str) -> Cow<'_, str> {
    BARE_CITATION_PATTERN.replace_all(text, "<tag>${prefix} ${levels}</tag>")
}

/// Apply both markup rewrites in the required order.
#[must_use]
pub fn prepare_markup(text: &str) -> String {
    let wrapped = wrap_bare_citations(text);
    repair_split_words(&wrapped).into_owned()
}

/// Split text into plain-text and tag fragments, in source order.
///
/// An opening marker without a matching close, or whose close comes after
/// the next opening marker, is left in the surrounding text.
#[must_use]
pub fn tokenize(text: &str) -> Vec<Fragment<'_>> {
    let mut fragments = Vec::new();
    let mut text_start = 0;
    let mut cursor = 0;

    while let Some(rel) = text[cursor..].find(TAG_OPEN) {
        let open = cursor + rel;
        let body_start = open + TAG_OPEN.len();

        let Some(close_rel) = text[body_start..].find(TAG_CLOSE) else {
            tracing::warn!(offset = open, "unterminated reference tag, keeping as text");
            break;
        };
        let close = body_start + close_rel;

        if let Some(nested) = text[body_start..close].find(TAG_OPEN) {
            tracing::warn!(offset = open, "truncated reference tag, keeping as text");
            cursor = body_start + nested;
            continue;
        }

        if open > text_start {
            fragments.push(Fragment::Text(&text[text_start..open]));
        }

        let end = close + TAG_CLOSE.len();
        fragments.push(Fragment::Tag(ReferenceTag::parse(
            &text[body_start..close],
            &text[open..end],
        )));
        text_start = end;
        cursor = end;
    }

    if text_start < text.len() {
        fragments.push(Fragment::Text(&text[text_start..]));
    }

    fragments
}

/// Remove all well-formed tags and canonicalize them.
#[must_use]
pub fn strip_tags(text: &str, index: &CitationIndex) -> StrippedText {
    let mut stripped = String::with_capacity(text.len());
    let mut offset = 0;
    let mut citations = Vec::new();

    for fragment in tokenize(text) {
        match fragment {
            Fragment::Text(t) => {
                stripped.push_str(t);
                offset += t.chars().count();
            }
            Fragment::Tag(tag) => citations.push((offset, index.canonicalize(&tag))),
        }
    }

    StrippedText {
        text: stripped,
        citations,
    }
}

/// Content of a line the converter flagged as a title, without the markers.
#[must_use]
pub fn title_content(line: &str) -> Option<&str> {
    line.trim()
        .strip_prefix(TITLE_OPEN)?
        .strip_suffix(TITLE_CLOSE)
        .map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn index() -> CitationIndex {
        CitationIndex::new()
            .with_author("0059", "Plato")
            .with_work("0059", "030", "Respublica")
    }

    #[test]
    fn test_repair_split_word() {
        assert_eq!(repair_split_words("λόγ-<tag>X</tag>ος"), "λόγος<tag>X</tag>");
    }

    #[test]
    fn test_repair_split_word_across_line_break() {
        let text = "τὸν λόγ-\n<tag>[0059][030] 2</tag>ος ἔχει";
        assert_eq!(
            repair_split_words(text),
            "τὸν λόγος\n<tag>[0059][030] 2</tag> ἔχει"
        );
    }

    #[test]
    fn test_repair_leaves_plain_hyphens() {
        let text = "well-known <tag>X</tag> word";
        assert_eq!(repair_split_words(text), text);
    }

    #[test]
    fn test_repair_multiple_occurrences() {
        let text = "a-<tag>1</tag>b c-<tag>2</tag>d";
        assert_eq!(repair_split_words(text), "ab<tag>1</tag> cd<tag>2</tag>");
    }

    #[test]
    fn test_wrap_bare_citation() {
        let text = "[A][B][C][D] 1.2.3 πρῶτον.\n δεύτερον.";
        assert_eq!(
            wrap_bare_citations(text),
            "<tag>[A][B][C][D] 1.2.3</tag>πρῶτον.\n δεύτερον."
        );
    }

    #[test]
    fn test_wrap_bare_citation_requires_level_values() {
        let text = "[A][B] πρῶτον.";
        assert_eq!(wrap_bare_citations(text), text);
    }

    #[test]
    fn test_wrap_bare_citation_leaves_leading_word() {
        let text = "[1][1] Gallia est omnis divisa.";
        assert_eq!(wrap_bare_citations(text), text);
        assert_eq!(
            wrap_bare_citations("[1][1] a.b Gallia"),
            "<tag>[1][1] a.b</tag>Gallia"
        );
        assert_eq!(
            wrap_bare_citations("[1][1] 1a Gallia"),
            "<tag>[1][1] 1a</tag>Gallia"
        );
    }

    #[test]
    fn test_repair_chained_split() {
        let text = "προσ-\n<tag>[1][1] 2</tag>ευ-\n<tag>[1][1] 3</tag>ξάμενος τε";
        assert_eq!(
            repair_split_words(text),
            "προσευξάμενος\n<tag>[1][1] 2</tag>\n<tag>[1][1] 3</tag> τε"
        );
    }

    #[test]
    fn test_wrap_bare_citation_only_at_line_start() {
        let text = "see [A][B] 1.2 there";
        assert_eq!(wrap_bare_citations(text), text);
    }

    #[test]
    fn test_tokenize_mixed() {
        let fragments = tokenize("pre <tag>[1][2] 3</tag>post");
        assert_eq!(fragments.len(), 3);
        assert_eq!(fragments[0], Fragment::Text("pre "));
        let Fragment::Tag(tag) = &fragments[1] else {
            panic!("expected tag");
        };
        assert_eq!(tag.raw, "<tag>[1][2] 3</tag>");
        assert_eq!(fragments[2], Fragment::Text("post"));
    }

    #[test]
    fn test_tokenize_unterminated_tag_is_text() {
        let text = "before <tag>[1][2] 3 after";
        assert_eq!(tokenize(text), vec![Fragment::Text(text)]);
    }

    #[test]
    fn test_tokenize_truncated_tag_before_valid_tag() {
        let text = "a <tag>[1][2] b <tag>[1][2] 4</tag>c";
        let fragments = tokenize(text);
        assert_eq!(fragments.len(), 3);
        assert_eq!(fragments[0], Fragment::Text("a <tag>[1][2] b "));
        assert!(matches!(fragments[1], Fragment::Tag(_)));
        assert_eq!(fragments[2], Fragment::Text("c"));
    }

    #[test]
    fn test_strip_tags_offsets_in_characters() {
        let stripped = strip_tags(
            "ἀρχή <tag>[0059][030] 1.2</tag>τέλος<tag>[0059][030] 1.3</tag>",
            &index(),
        );
        assert_eq!(stripped.text, "ἀρχή τέλος");
        assert_eq!(stripped.citations.len(), 2);
        assert_eq!(stripped.citations[0].0, 5);
        assert_eq!(stripped.citations[1].0, 10);
        assert_eq!(
            stripped.citations[0].1.to_string(),
            "Plato, Respublica (subdivision 1, line 2)"
        );
    }

    #[test]
    fn test_strip_tags_one_citation_per_tag_and_no_leak() {
        let text = "<tag>[0059][030] 1</tag>α\n<tag>[x][y] 2</tag>β\n<tag>[0059][030] 3</tag>γ";
        let stripped = strip_tags(text, &index());
        assert_eq!(stripped.citations.len(), 3);
        assert!(!stripped.text.contains(TAG_OPEN));
        assert!(!stripped.text.contains(TAG_CLOSE));
        assert!(!stripped.text.contains("0059"));
    }

    #[test]
    fn test_prepare_markup_wraps_before_repair() {
        let text = "[0059][030] 1 ἀρχὴ λόγ-\n[0059][030] 2 ος τέλος";
        assert_eq!(
            prepare_markup(text),
            "<tag>[0059][030] 1</tag>ἀρχὴ λόγος\n<tag>[0059][030] 2</tag> τέλος"
        );
    }

    #[test]
    fn test_title_content() {
        assert_eq!(title_content("  <title>ΠΟΛΙΤΕΙΑ</title> "), Some("ΠΟΛΙΤΕΙΑ"));
        assert_eq!(title_content("ΠΟΛΙΤΕΙΑ"), None);
        assert_eq!(title_content("<title>unclosed"), None);
    }
}
