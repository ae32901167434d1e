//! Structure schema resolution.
//!
//! Each work cites its text through an ordered list of levels, e.g.
//! `book, line` for epic or `section, line` for prose. Works without a
//! registered schema resolve to [`ResolvedSchema::Fallback`].

mod registry;
mod types;

pub use registry::SchemaRegistry;
pub use types::{level_to_field, ResolvedSchema, StructureSchema};
