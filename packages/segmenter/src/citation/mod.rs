//! Citation tag codec.
//!
//! Extracts inline reference tags from converter output, canonicalizes them
//! against the author/work index and removes them from the text that is
//! handed to annotation.

mod codec;
mod lookup;
mod tag;

pub use codec::{
    prepare_markup, repair_split_words, strip_tags, title_content, tokenize, wrap_bare_citations,
    Fragment, StrippedText,
};
pub use lookup::{CanonicalCitation, CitationIndex};
pub use tag::{parse_level_values, LevelSlot, LevelValue, LevelValues, ReferenceTag};
