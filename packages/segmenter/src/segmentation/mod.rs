//! Structural segmentation: tag stream to ordered divisions and lines.
//!
//! The scan is a fold of [`SegmentState`] over the fragments produced by the
//! citation codec. A tag whose placement differs from the open division opens
//! a new one; text between tags is split into lines at native line breaks.
//! Finished divisions are ordered by [`order_divisions`].

mod engine;
mod ordering;
mod state;

pub use engine::Segmenter;
pub use ordering::{natural_cmp, order_divisions};
pub use state::{SegmentContext, SegmentState};
