//! Projection of sentence annotations onto lines.

use super::types::{category_set, LineProjection, Projection, SentenceAnnotation, Token};
use crate::alignment::{LineSentenceLink, Sentence};
use crate::error::{Result, SegmenterError};

/// Project a sentence's annotation tokens onto its lines.
///
/// Each token goes to the line whose range contains its start; a token
/// starting in the space that joins two lines goes to the following line.
/// Token offsets are clipped to the line range and re-expressed in line
/// characters. Offsets outside the sentence are rejected.
pub fn project(sentence: &Sentence, tokens: Vec<Token>) -> Result<Projection> {
    let len = sentence.char_len();
    for (index, token) in tokens.iter().enumerate() {
        if token.char_start > token.char_end || token.char_end > len {
            return Err(SegmenterError::TokenOutOfRange {
                sentence: sentence.index,
                index,
                start: token.char_start,
                end: token.char_end,
                len,
            });
        }
    }

    let mut lines: Vec<LineProjection> = sentence
        .links
        .iter()
        .map(|link| LineProjection {
            line_id: link.line_id,
            sentence_index: sentence.index,
            tokens: Vec::new(),
            categories: Default::default(),
        })
        .collect();

    for token in &tokens {
        let Some(position) = owning_link(&sentence.links, token.char_start) else {
            continue;
        };
        let link = &sentence.links[position];
        lines[position].tokens.push(to_line_local(token, link));
    }

    for line in &mut lines {
        line.categories = category_set(&line.tokens);
    }

    let categories = category_set(&tokens);
    Ok(Projection {
        sentence: SentenceAnnotation {
            sentence_index: sentence.index,
            tokens,
            categories,
        },
        lines,
    })
}

/// Index of the link a sentence offset belongs to.
fn owning_link(links: &[LineSentenceLink], offset: usize) -> Option<usize> {
    links
        .iter()
        .position(|link| link.contains_sentence_offset(offset))
        .or_else(|| links.iter().position(|link| link.sentence_offset > offset))
        .or_else(|| links.len().checked_sub(1))
}

fn to_line_local(token: &Token, link: &LineSentenceLink) -> Token {
    let link_end = link.sentence_offset + link.len();
    let start = token.char_start.clamp(link.sentence_offset, link_end);
    let end = token.char_end.clamp(start, link_end);

    Token {
        char_start: link.start + (start - link.sentence_offset),
        char_end: link.start + (end - link.sentence_offset),
        ..token.clone()
    }
}
