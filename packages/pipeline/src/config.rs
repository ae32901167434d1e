use std::path::PathBuf;
use std::time::Duration;

use crate::error::{PipelineError, Result};

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| PipelineError::Config("DATABASE_URL not set".into()))?;

        Ok(Self {
            database_url,
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", 5),
        })
    }

    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 5,
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }
}

/// Settings for the external annotation engine.
#[derive(Debug, Clone)]
pub struct AnnotationConfig {
    pub api_url: String,
    pub timeout: Duration,
    /// Maximum number of sentences sent between cancellation checks.
    pub batch_size: usize,
    /// Retries per batch after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each further retry.
    pub retry_base: Duration,
}

impl AnnotationConfig {
    pub fn from_env() -> Result<Self> {
        let api_url = std::env::var("ANNOTATION_API_URL")
            .map_err(|_| PipelineError::Config("ANNOTATION_API_URL not set".into()))?;
        url::Url::parse(&api_url)
            .map_err(|e| PipelineError::Config(format!("invalid ANNOTATION_API_URL: {e}")))?;

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(env_or("ANNOTATION_TIMEOUT_SECS", 30)),
            batch_size: env_or("ANNOTATION_BATCH_SIZE", 16usize).max(1),
            max_retries: env_or("ANNOTATION_MAX_RETRIES", 3),
            retry_base: Duration::from_millis(env_or("ANNOTATION_RETRY_BASE_MS", 1000)),
        })
    }

    pub fn new(api_url: impl Into<String>) -> Self {
        let api_url: String = api_url.into();
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(30),
            batch_size: 16,
            max_retries: 3,
            retry_base: Duration::from_secs(1),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_base(mut self, retry_base: Duration) -> Self {
        self.retry_base = retry_base;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Backoff before retry number `retry` (zero-based).
    pub fn retry_delay(&self, retry: u32) -> Duration {
        self.retry_base.saturating_mul(1u32 << retry.min(16))
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub annotation: AnnotationConfig,
    /// Works ingested at the same time.
    pub concurrency: usize,
    pub corpus_config: Option<PathBuf>,
    pub manifest: PathBuf,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self> {
        let pipeline = PipelineConfig::from_env()?;
        let annotation = AnnotationConfig::from_env()?;

        let manifest = std::env::var("INGEST_MANIFEST")
            .map_err(|_| PipelineError::Config("INGEST_MANIFEST not set".into()))?
            .into();

        let corpus_config = std::env::var("CORPUS_CONFIG").ok().map(PathBuf::from);

        Ok(Self {
            database_url: pipeline.database_url,
            max_connections: pipeline.max_connections,
            annotation,
            concurrency: env_or("INGEST_CONCURRENCY", 4usize).max(1),
            corpus_config,
            manifest,
        })
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            database_url: self.database_url.clone(),
            max_connections: self.max_connections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_annotation_config_builders() {
        let config = AnnotationConfig::new("http://localhost:9000/")
            .with_batch_size(0)
            .with_max_retries(5)
            .with_retry_base(Duration::from_millis(10));

        assert_eq!(config.api_url, "http://localhost:9000");
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.max_retries, 5);
    }

    #[test]
    fn test_retry_delay_doubles() {
        let config = AnnotationConfig::new("http://x").with_retry_base(Duration::from_millis(100));
        assert_eq!(config.retry_delay(0), Duration::from_millis(100));
        assert_eq!(config.retry_delay(1), Duration::from_millis(200));
        assert_eq!(config.retry_delay(2), Duration::from_millis(400));
    }

    #[test]
    fn test_pipeline_config_builder() {
        let config = PipelineConfig::new("postgres://localhost/textus").with_max_connections(10);
        assert_eq!(config.max_connections, 10);
    }
}
