//! Annotation projection.
//!
//! The annotation engine labels whole sentences. [`project`] splits that
//! result onto the contributing lines and [`LineIndex`] keeps the per-line
//! summary consistent with the sentence-level truth.

mod index;
mod projector;
mod types;

pub use index::LineIndex;
pub use projector::project;
pub use types::{
    category_set, LineAnnotation, LineProjection, Projection, SentenceAnnotation, Token,
};
