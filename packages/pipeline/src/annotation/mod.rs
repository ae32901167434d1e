pub mod batch;
pub mod client;

pub use batch::{annotate_sentences, AnnotationRun, SentenceFailure};
pub use client::{AnnotationClient, HttpAnnotationClient};

#[cfg(any(test, feature = "test-utils"))]
pub use client::test_support::MockAnnotationClient;
