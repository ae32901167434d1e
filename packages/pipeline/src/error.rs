use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Segmenter(#[from] textus_segmenter::SegmenterError),

    #[error("annotation request failed: {0}")]
    AnnotationRequest(#[from] reqwest::Error),

    #[error("annotation API error (status {status}): {message}")]
    AnnotationApi { status: u16, message: String },

    #[error("annotation rate limited, retry after {retry_after_secs}s")]
    AnnotationRateLimited { retry_after_secs: u64 },

    #[error("failed to parse annotation response: {0}")]
    AnnotationParse(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(String),
}

impl PipelineError {
    /// Whether a failed annotation call may succeed when repeated.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::AnnotationRequest(_) | Self::AnnotationRateLimited { .. } => true,
            Self::AnnotationApi { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
