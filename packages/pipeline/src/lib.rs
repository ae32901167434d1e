//! Ingestion pipeline for the Textus corpus.
//!
//! Reads a manifest of tag-annotated source files, segments and aligns each
//! work with `textus-segmenter`, annotates its sentences through an external
//! engine and stores divisions, lines, sentences and their links in Postgres.

pub mod annotation;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod manifest;
pub mod models;
pub mod store;
pub mod worker;

pub use annotation::{AnnotationClient, AnnotationRun, HttpAnnotationClient, SentenceFailure};
pub use config::{AnnotationConfig, PipelineConfig, WorkerConfig};
pub use db::{connect, create_pool, run_migrations};
pub use error::PipelineError;
pub use ingest::{IngestReport, Ingestor, WorkOutcome, WorkReport, WorkSummary};
pub use manifest::{Manifest, ManifestEntry};
pub use models::{AnnotationStatus, StoredWork, TextStatus};
pub use store::{AnnotatedWork, CorpusStore, PgCorpusStore};
