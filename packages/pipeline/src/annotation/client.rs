use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use textus_segmenter::Token;

use crate::config::AnnotationConfig;
use crate::error::{PipelineError, Result};

/// Natural-language annotation engine.
///
/// Implementations must be deterministic and free of side effects; the batch
/// runner repeats calls freely when retrying.
#[async_trait]
pub trait AnnotationClient: Send + Sync {
    /// Annotate one sentence. Token offsets are character offsets into `text`.
    async fn annotate(&self, text: &str) -> Result<Vec<Token>>;
}

/// HTTP client for an annotation service exposing `POST /annotate`.
pub struct HttpAnnotationClient {
    http: reqwest::Client,
    endpoint: String,
}

#[derive(Serialize)]
struct AnnotateRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

impl HttpAnnotationClient {
    pub fn new(config: &AnnotationConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(PipelineError::AnnotationRequest)?;

        Ok(Self {
            http,
            endpoint: format!("{}/annotate", config.api_url),
        })
    }
}

#[async_trait]
impl AnnotationClient for HttpAnnotationClient {
    async fn annotate(&self, text: &str) -> Result<Vec<Token>> {
        debug!(chars = text.chars().count(), "sending annotation request");

        let resp = self
            .http
            .post(&self.endpoint)
            .json(&AnnotateRequest { text })
            .send()
            .await?;

        let status = resp.status().as_u16();

        if status == 429 {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(PipelineError::AnnotationRateLimited {
                retry_after_secs: retry_after,
            });
        }

        if status != 200 {
            let body_text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body_text)
                .ok()
                .and_then(|r| r.error)
                .unwrap_or(body_text);
            return Err(PipelineError::AnnotationApi { status, message });
        }

        resp.json::<Vec<Token>>()
            .await
            .map_err(|e| PipelineError::AnnotationParse(e.to_string()))
    }
}

/// Test utilities for the annotation client.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Mock annotation engine.
    ///
    /// Splits on whitespace; words starting with an uppercase letter get the
    /// category `proper`, the rest `common`. Failures can be scripted.
    #[derive(Default)]
    pub struct MockAnnotationClient {
        calls: AtomicUsize,
        transient_failures: Mutex<usize>,
        rejected: Vec<String>,
    }

    impl MockAnnotationClient {
        pub fn new() -> Self {
            Self::default()
        }

        /// Fail the next `count` calls with a rate-limit error.
        pub fn with_transient_failures(self, count: usize) -> Self {
            if let Ok(mut failures) = self.transient_failures.lock() {
                *failures = count;
            }
            self
        }

        /// Always reject sentences containing `needle` with a client error.
        pub fn rejecting(mut self, needle: impl Into<String>) -> Self {
            self.rejected.push(needle.into());
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    /// Whitespace tokens with offsets in characters.
    pub fn whitespace_tokens(text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut start = None;
        let mut word = String::new();
        let chars: Vec<char> = text.chars().collect();
        for (i, c) in chars.iter().chain(std::iter::once(&' ')).enumerate() {
            if c.is_whitespace() {
                if let Some(s) = start.take() {
                    let category = if word.chars().next().is_some_and(char::is_uppercase) {
                        "proper"
                    } else {
                        "common"
                    };
                    tokens.push(
                        Token::new(std::mem::take(&mut word), s, i)
                            .with_lemma(chars[s..i].iter().collect::<String>().to_lowercase())
                            .with_category(category),
                    );
                }
            } else {
                start.get_or_insert(i);
                word.push(*c);
            }
        }
        tokens
    }

    #[async_trait]
    impl AnnotationClient for MockAnnotationClient {
        async fn annotate(&self, text: &str) -> Result<Vec<Token>> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if self.rejected.iter().any(|needle| text.contains(needle.as_str())) {
                return Err(PipelineError::AnnotationApi {
                    status: 422,
                    message: "unprocessable sentence".into(),
                });
            }

            {
                let mut failures = self.transient_failures.lock().map_err(|e| {
                    PipelineError::AnnotationParse(format!("mock lock poisoned: {e}"))
                })?;
                if *failures > 0 {
                    *failures -= 1;
                    return Err(PipelineError::AnnotationRateLimited { retry_after_secs: 1 });
                }
            }

            Ok(whitespace_tokens(text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_whitespace_tokens_use_char_offsets() {
        let tokens = whitespace_tokens("Σωκράτης  went");
        assert_eq!(tokens.len(), 2);
        assert_eq!((tokens[0].char_start, tokens[0].char_end), (0, 8));
        assert_eq!((tokens[1].char_start, tokens[1].char_end), (10, 14));
        assert_eq!(tokens[0].lemma.as_deref(), Some("σωκράτης"));
        assert_eq!(tokens[0].category.as_deref(), Some("proper"));
        assert_eq!(tokens[1].category.as_deref(), Some("common"));
    }

    #[tokio::test]
    async fn test_mock_scripted_failures() {
        let client = MockAnnotationClient::new()
            .with_transient_failures(1)
            .rejecting("bad");

        assert!(matches!(
            client.annotate("a").await,
            Err(PipelineError::AnnotationRateLimited { .. })
        ));
        assert_eq!(client.annotate("a b").await.unwrap().len(), 2);
        assert!(matches!(
            client.annotate("bad one").await,
            Err(PipelineError::AnnotationApi { status: 422, .. })
        ));
        assert_eq!(client.calls(), 3);
    }
}
