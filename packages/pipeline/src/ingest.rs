//! Parallel ingestion of works.
//!
//! Per work: segment and align (blocking, CPU bound), annotate, persist.
//! Works are independent; one failing work never stops the others and the
//! caller gets a report entry for each.

use std::sync::Arc;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use textus_segmenter::{Corpus, WorkInput};

use crate::annotation::{annotate_sentences, AnnotationClient, SentenceFailure};
use crate::config::AnnotationConfig;
use crate::error::{PipelineError, Result};
use crate::manifest::ManifestEntry;
use crate::models::StoredWork;
use crate::store::{AnnotatedWork, CorpusStore};

/// Counts for a successfully ingested work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkSummary {
    pub divisions: usize,
    pub lines: usize,
    pub sentences: usize,
    pub annotated_sentences: usize,
    pub failed_sentences: Vec<SentenceFailure>,
    pub content_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum WorkOutcome {
    Ingested(WorkSummary),
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkReport {
    pub author_id: String,
    pub work_id: String,
    #[serde(flatten)]
    pub outcome: WorkOutcome,
}

impl WorkReport {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, WorkOutcome::Ingested(_))
    }
}

/// Per-work results of an ingestion run, in manifest order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub works: Vec<WorkReport>,
}

impl IngestReport {
    pub fn succeeded(&self) -> usize {
        self.works.iter().filter(|w| w.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.works.len() - self.succeeded()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    pub fn total_lines(&self) -> usize {
        self.summaries().map(|s| s.lines).sum()
    }

    pub fn total_sentences(&self) -> usize {
        self.summaries().map(|s| s.sentences).sum()
    }

    fn summaries(&self) -> impl Iterator<Item = &WorkSummary> {
        self.works.iter().filter_map(|w| match &w.outcome {
            WorkOutcome::Ingested(summary) => Some(summary),
            WorkOutcome::Failed { .. } => None,
        })
    }
}

/// Hex SHA-256 of a source text.
pub fn content_hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

/// Runs the ingestion flow against a corpus configuration, an annotation
/// engine and a store. Cheap to clone.
#[derive(Clone)]
pub struct Ingestor {
    corpus: Arc<Corpus>,
    client: Arc<dyn AnnotationClient>,
    store: Arc<dyn CorpusStore>,
    annotation: AnnotationConfig,
    concurrency: usize,
    cancel: CancellationToken,
}

impl Ingestor {
    pub fn new(
        corpus: Arc<Corpus>,
        client: Arc<dyn AnnotationClient>,
        store: Arc<dyn CorpusStore>,
        annotation: AnnotationConfig,
    ) -> Self {
        Self {
            corpus,
            client,
            store,
            annotation,
            concurrency: 4,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Segment, annotate and store one work.
    #[tracing::instrument(skip(self, input), fields(author_id = %input.author_id, work_id = %input.work_id))]
    pub async fn ingest_work(&self, input: WorkInput) -> Result<WorkSummary> {
        let hash = content_hash(&input.text);

        let corpus = Arc::clone(&self.corpus);
        let segmented = tokio::task::spawn_blocking(move || corpus.segment_work(&input)).await??;

        let annotations = annotate_sentences(
            Arc::clone(&self.client),
            &self.annotation,
            &segmented.sentences,
            &self.cancel,
        )
        .await?;

        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let work = AnnotatedWork {
            work: segmented,
            content_hash: hash,
            annotations,
        };
        let stored: StoredWork = self.store.store_work(&work).await?;

        let summary = WorkSummary {
            divisions: stored.divisions,
            lines: stored.lines,
            sentences: stored.sentences,
            annotated_sentences: work.annotations.annotated_count(),
            failed_sentences: work.annotations.failures,
            content_hash: work.content_hash,
        };

        tracing::info!(
            text_id = %stored.text_id,
            divisions = summary.divisions,
            lines = summary.lines,
            sentences = summary.sentences,
            failed_sentences = summary.failed_sentences.len(),
            "work ingested"
        );

        Ok(summary)
    }

    /// Read and ingest every manifest entry, at most `concurrency` at a time.
    pub async fn ingest_batch(&self, entries: Vec<ManifestEntry>) -> IngestReport {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (position, entry) in entries.iter().cloned().enumerate() {
            let this = self.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => this.ingest_entry(&entry).await,
                    Err(_) => Err(PipelineError::Cancelled),
                };
                (position, result)
            });
        }

        let mut results: Vec<Option<Result<WorkSummary>>> = entries.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, result)) => results[position] = Some(result),
                Err(e) => tracing::error!(error = %e, "ingest task panicked"),
            }
        }

        let works = entries
            .into_iter()
            .zip(results)
            .map(|(entry, result)| {
                let outcome = match result {
                    Some(Ok(summary)) => WorkOutcome::Ingested(summary),
                    Some(Err(e)) => {
                        tracing::error!(
                            author_id = %entry.author,
                            work_id = %entry.work,
                            error = %e,
                            "work failed"
                        );
                        WorkOutcome::Failed {
                            error: e.to_string(),
                        }
                    }
                    None => WorkOutcome::Failed {
                        error: "ingest task aborted".into(),
                    },
                };
                WorkReport {
                    author_id: entry.author,
                    work_id: entry.work,
                    outcome,
                }
            })
            .collect();

        IngestReport { works }
    }

    async fn ingest_entry(&self, entry: &ManifestEntry) -> Result<WorkSummary> {
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let text = tokio::fs::read_to_string(&entry.path).await?;
        self.ingest_work(WorkInput::new(entry.author.as_str(), entry.work.as_str(), text))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::MockAnnotationClient;
    use crate::models::TextStatus;
    use crate::store::test_support::MemoryStore;
    use pretty_assertions::assert_eq;
    use textus_segmenter::CorpusConfig;

    const PLATO: &str = "<tag>[0059][030] 1.327</tag>Κατέβην χθὲς εἰς Πειραιᾶ.\nΠροσευξάμενος δέ.\n";

    fn corpus() -> Arc<Corpus> {
        let config = CorpusConfig::from_yaml_str(
            r#"
authors: {"0059": Plato}
works: {"0059": {"030": Respublica}}
schemas:
  - {author: "0059", work: "030", levels: [book, section, line]}
"#,
        )
        .unwrap();
        Arc::new(Corpus::from_config(&config).unwrap())
    }

    fn ingestor(client: MockAnnotationClient, store: Arc<MemoryStore>) -> Ingestor {
        Ingestor::new(
            corpus(),
            Arc::new(client),
            store,
            AnnotationConfig::new("http://annotator.test").with_max_retries(1),
        )
        .with_concurrency(2)
    }

    #[test]
    fn test_content_hash_is_hex_sha256() {
        assert_eq!(
            content_hash(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn test_ingest_work_stores_counts() {
        let store = Arc::new(MemoryStore::new());
        let summary = ingestor(MockAnnotationClient::new(), store.clone())
            .ingest_work(WorkInput::new("0059", "030", PLATO))
            .await
            .unwrap();

        assert_eq!(summary.divisions, 1);
        assert_eq!(summary.lines, 2);
        assert_eq!(summary.sentences, 2);
        assert_eq!(summary.annotated_sentences, 2);
        assert!(summary.failed_sentences.is_empty());
        assert_eq!(summary.content_hash, content_hash(PLATO));

        let (stored, status) = store.stored("0059", "030").unwrap();
        assert_eq!(stored.lines, 2);
        assert_eq!(status, TextStatus::Ingested);
    }

    #[tokio::test]
    async fn test_failed_annotation_marks_work_partial() {
        let store = Arc::new(MemoryStore::new());
        let client = MockAnnotationClient::new().rejecting("Προσευξάμενος");
        let summary = ingestor(client, store.clone())
            .ingest_work(WorkInput::new("0059", "030", PLATO))
            .await
            .unwrap();

        assert_eq!(summary.annotated_sentences, 1);
        assert_eq!(summary.failed_sentences.len(), 1);
        assert_eq!(summary.failed_sentences[0].sentence_index, 1);
        assert_eq!(store.stored("0059", "030").unwrap().1, TextStatus::Partial);
    }

    #[tokio::test]
    async fn test_reingest_keeps_text_identity() {
        let store = Arc::new(MemoryStore::new());
        let ingestor = ingestor(MockAnnotationClient::new(), store.clone());

        ingestor
            .ingest_work(WorkInput::new("0059", "030", PLATO))
            .await
            .unwrap();
        let first = store.stored("0059", "030").unwrap().0;

        ingestor
            .ingest_work(WorkInput::new("0059", "030", "<tag>[0059][030] 1.327</tag>Κατέβην.\n"))
            .await
            .unwrap();
        let second = store.stored("0059", "030").unwrap().0;

        assert_eq!(store.len(), 1);
        assert_eq!(first.text_id, second.text_id);
        assert_eq!(second.lines, 1);
    }

    #[tokio::test]
    async fn test_batch_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("respublica.txt");
        std::fs::write(&good, PLATO).unwrap();

        let entries = vec![
            ManifestEntry {
                author: "0059".into(),
                work: "030".into(),
                path: good.clone(),
            },
            ManifestEntry {
                author: "0059".into(),
                work: "031".into(),
                path: dir.path().join("missing.txt"),
            },
            ManifestEntry {
                author: "0012".into(),
                work: "001".into(),
                path: good,
            },
        ];

        let store = Arc::new(MemoryStore::new().failing_for("001"));
        let report = ingestor(MockAnnotationClient::new(), store.clone())
            .ingest_batch(entries)
            .await;

        assert_eq!(report.works.len(), 3);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 2);
        assert!(report.has_failures());
        assert_eq!(report.works[0].work_id, "030");
        assert!(report.works[0].is_success());
        assert!(matches!(report.works[1].outcome, WorkOutcome::Failed { .. }));
        assert!(matches!(
            &report.works[2].outcome,
            WorkOutcome::Failed { error } if error.contains("store unavailable")
        ));
        assert_eq!(report.total_lines(), 2);
        assert_eq!(report.total_sentences(), 2);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_batch_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("respublica.txt");
        std::fs::write(&path, PLATO).unwrap();

        let store = Arc::new(MemoryStore::new());
        let ingestor = ingestor(MockAnnotationClient::new(), store.clone());
        ingestor.cancellation().cancel();

        let report = ingestor
            .ingest_batch(vec![ManifestEntry {
                author: "0059".into(),
                work: "030".into(),
                path,
            }])
            .await;

        assert_eq!(report.failed(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_report_serializes_outcome() {
        let report = WorkReport {
            author_id: "0059".into(),
            work_id: "030".into(),
            outcome: WorkOutcome::Failed {
                error: "boom".into(),
            },
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"author_id": "0059", "work_id": "030", "outcome": "failed", "error": "boom"})
        );
    }
}
