//! Batched sentence annotation with retry and cancellation.
//!
//! Sentences are sent in batches of at most `batch_size`. Within a batch the
//! calls run concurrently; calls that fail with a retryable error are repeated
//! after a backoff until the batch's retries are used up. Sentences that still
//! have no annotation are reported individually, the rest of the work goes on.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use textus_segmenter::annotation::SentenceAnnotation;
use textus_segmenter::{project, LineIndex, Sentence, Token};

use super::client::AnnotationClient;
use crate::config::AnnotationConfig;
use crate::error::{PipelineError, Result};

/// A sentence the annotation engine could not handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentenceFailure {
    pub sentence_index: usize,
    pub error: String,
}

/// Annotations for one work.
#[derive(Debug, Clone, Default)]
pub struct AnnotationRun {
    /// Sentence-level annotation, keyed by sentence index.
    pub sentences: BTreeMap<usize, SentenceAnnotation>,
    /// Line-level view derived from the projected sentences.
    pub lines: LineIndex,
    pub failures: Vec<SentenceFailure>,
}

impl AnnotationRun {
    pub fn annotated_count(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Annotate every sentence of a work and project the results onto lines.
///
/// Returns [`PipelineError::Cancelled`] if `cancel` fires before all batches
/// are done; nothing from the interrupted run should be persisted.
pub async fn annotate_sentences(
    client: Arc<dyn AnnotationClient>,
    config: &AnnotationConfig,
    sentences: &[Sentence],
    cancel: &CancellationToken,
) -> Result<AnnotationRun> {
    let mut run = AnnotationRun::default();

    for (batch_no, batch) in sentences.chunks(config.batch_size.max(1)).enumerate() {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let (annotated, failed) = annotate_batch(&client, config, batch, cancel).await?;
        debug!(
            batch = batch_no,
            annotated = annotated.len(),
            failed = failed.len(),
            "annotation batch finished"
        );

        for (position, tokens) in annotated {
            let sentence = &batch[position];
            match project(sentence, tokens) {
                Ok(projection) => {
                    run.lines.apply(&projection);
                    run.sentences.insert(sentence.index, projection.sentence);
                }
                Err(e) => {
                    warn!(sentence = sentence.index, error = %e, "annotation does not fit sentence");
                    run.failures.push(SentenceFailure {
                        sentence_index: sentence.index,
                        error: e.to_string(),
                    });
                }
            }
        }
        run.failures.extend(failed);
    }

    run.failures.sort_by_key(|f| f.sentence_index);
    Ok(run)
}

type BatchResult = (BTreeMap<usize, Vec<Token>>, Vec<SentenceFailure>);

async fn annotate_batch(
    client: &Arc<dyn AnnotationClient>,
    config: &AnnotationConfig,
    batch: &[Sentence],
    cancel: &CancellationToken,
) -> Result<BatchResult> {
    let mut annotated = BTreeMap::new();
    let mut failed = Vec::new();
    let mut pending: Vec<usize> = (0..batch.len()).collect();
    let mut attempt = 0u32;

    loop {
        let mut tasks = JoinSet::new();
        for &position in &pending {
            let client = Arc::clone(client);
            let text = batch[position].content.clone();
            tasks.spawn(async move { (position, client.annotate(&text).await) });
        }

        let mut retry = Vec::new();
        let mut wait = config.retry_delay(attempt);
        let mut last_errors = BTreeMap::new();

        while let Some(joined) = tasks.join_next().await {
            let (position, result) = joined?;
            match result {
                Ok(tokens) => {
                    annotated.insert(position, tokens);
                }
                Err(e) if e.is_retryable() => {
                    if let PipelineError::AnnotationRateLimited { retry_after_secs } = e {
                        wait = wait.max(Duration::from_secs(retry_after_secs));
                    }
                    last_errors.insert(position, e.to_string());
                    retry.push(position);
                }
                Err(e) => {
                    warn!(sentence = batch[position].index, error = %e, "annotation rejected");
                    failed.push(SentenceFailure {
                        sentence_index: batch[position].index,
                        error: e.to_string(),
                    });
                }
            }
        }

        if retry.is_empty() {
            break;
        }

        if attempt >= config.max_retries {
            for position in retry {
                let error = last_errors.remove(&position).unwrap_or_default();
                warn!(sentence = batch[position].index, %error, "annotation retries exhausted");
                failed.push(SentenceFailure {
                    sentence_index: batch[position].index,
                    error,
                });
            }
            break;
        }

        retry.sort_unstable();
        debug!(attempt, pending = retry.len(), "retrying annotation after {:?}", wait);
        tokio::select! {
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            _ = tokio::time::sleep(wait) => {}
        }

        pending = retry;
        attempt += 1;
    }

    Ok((annotated, failed))
}
