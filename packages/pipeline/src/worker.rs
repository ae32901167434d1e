use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use textus_segmenter::{Corpus, CorpusConfig};

use crate::annotation::HttpAnnotationClient;
use crate::config::WorkerConfig;
use crate::db;
use crate::error::{PipelineError, Result};
use crate::ingest::{IngestReport, Ingestor, WorkOutcome};
use crate::manifest::Manifest;
use crate::store::PgCorpusStore;

/// Ingest every work listed in the manifest and return the per-work report.
///
/// SIGTERM and SIGINT (ctrl+c) cancel the run: works still waiting or
/// annotating are reported as cancelled, divisions already committed stay.
pub async fn run_ingest_worker(config: WorkerConfig) -> Result<IngestReport> {
    let pool = db::connect(&config.pipeline_config()).await?;

    let corpus_config = match &config.corpus_config {
        Some(path) => CorpusConfig::load(path)?,
        None => CorpusConfig::default(),
    };
    let corpus = Corpus::from_config(&corpus_config)?;
    let manifest = Manifest::load(&config.manifest).await?;

    tracing::info!(
        manifest = %config.manifest.display(),
        works = manifest.len(),
        concurrency = config.concurrency,
        annotation_url = %config.annotation.api_url,
        "starting ingest worker"
    );

    let cancel = CancellationToken::new();
    let mut sigterm = signal(SignalKind::terminate()).map_err(|e| {
        PipelineError::Config(format!("failed to register SIGTERM handler: {e}"))
    })?;
    let signal_cancel = cancel.clone();
    let signals = tokio::spawn(async move {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => tracing::info!("received SIGINT, cancelling ingestion"),
            _ = sigterm.recv() => tracing::info!("received SIGTERM, cancelling ingestion"),
            _ = signal_cancel.cancelled() => return,
        }
        signal_cancel.cancel();
    });

    let ingestor = Ingestor::new(
        Arc::new(corpus),
        Arc::new(HttpAnnotationClient::new(&config.annotation)?),
        Arc::new(PgCorpusStore::new(pool)),
        config.annotation.clone(),
    )
    .with_concurrency(config.concurrency)
    .with_cancellation(cancel.clone());

    let report = ingestor.ingest_batch(manifest.works).await;

    cancel.cancel();
    stop_signal_listener(signals).await;

    log_report(&report);
    Ok(report)
}

/// Wait for the signal listener to exit after its token was cancelled.
///
/// The report is already complete at this point, so a listener that panicked
/// is logged rather than turned into an error.
async fn stop_signal_listener(listener: JoinHandle<()>) -> bool {
    match listener.await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "signal listener did not exit cleanly");
            false
        }
    }
}

fn log_report(report: &IngestReport) {
    for work in &report.works {
        match &work.outcome {
            WorkOutcome::Ingested(summary) => tracing::info!(
                author_id = %work.author_id,
                work_id = %work.work_id,
                divisions = summary.divisions,
                lines = summary.lines,
                sentences = summary.sentences,
                failed_sentences = summary.failed_sentences.len(),
                "ingested"
            ),
            WorkOutcome::Failed { error } => tracing::error!(
                author_id = %work.author_id,
                work_id = %work.work_id,
                %error,
                "failed"
            ),
        }
    }

    tracing::info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        lines = report.total_lines(),
        sentences = report.total_sentences(),
        "ingestion finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stop_signal_listener_after_cancel() {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let listener = tokio::spawn(async move { token.cancelled().await });
        cancel.cancel();
        assert!(stop_signal_listener(listener).await);
    }

    #[tokio::test]
    async fn test_stop_signal_listener_survives_panic() {
        let listener = tokio::spawn(async { panic!("listener failed") });
        assert!(!stop_signal_listener(listener).await);
    }
}
