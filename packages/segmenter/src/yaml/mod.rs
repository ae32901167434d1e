//! YAML export of segmented works.

mod writer;

pub use writer::{generate_yaml, save_yaml};
