use tracing_subscriber::EnvFilter;

use textus_pipeline::config::WorkerConfig;
use textus_pipeline::worker::run_ingest_worker;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            std::process::exit(1);
        }
    };

    match run_ingest_worker(config).await {
        Ok(report) if report.has_failures() => {
            tracing::error!(failed = report.failed(), "some works failed to ingest");
            std::process::exit(1);
        }
        Ok(_) => {}
        Err(e) => {
            tracing::error!(error = %e, "ingest worker exited with error");
            std::process::exit(1);
        }
    }
}
