use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use textus_pipeline::{AnnotationClient, AnnotationConfig, HttpAnnotationClient, PipelineError};

fn client(server: &MockServer) -> HttpAnnotationClient {
    HttpAnnotationClient::new(&AnnotationConfig::new(server.uri())).unwrap()
}

#[tokio::test]
async fn test_annotate_parses_tokens() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/annotate"))
        .and(body_json(json!({"text": "Κατέβην χθές."})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"text": "Κατέβην", "lemma": "καταβαίνω", "pos": "VERB", "category": "motion", "char_start": 0, "char_end": 7},
            {"text": "χθές", "lemma": "χθές", "pos": "ADV", "char_start": 8, "char_end": 12}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = client(&server).annotate("Κατέβην χθές.").await.unwrap();

    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0].lemma.as_deref(), Some("καταβαίνω"));
    assert_eq!(tokens[0].category.as_deref(), Some("motion"));
    assert_eq!(tokens[1].category, None);
    assert_eq!((tokens[1].char_start, tokens[1].char_end), (8, 12));
}

#[tokio::test]
async fn test_rate_limit_reads_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/annotate"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .mount(&server)
        .await;

    let err = client(&server).annotate("x").await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::AnnotationRateLimited { retry_after_secs: 7 }
    ));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_client_error_is_not_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/annotate"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": "text too long"})),
        )
        .mount(&server)
        .await;

    let err = client(&server).annotate("x").await.unwrap_err();
    match &err {
        PipelineError::AnnotationApi { status, message } => {
            assert_eq!(*status, 400);
            assert_eq!(message, "text too long");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_server_error_is_retryable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/annotate"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = client(&server).annotate("x").await.unwrap_err();
    assert!(matches!(&err, PipelineError::AnnotationApi { status: 503, message } if message == "overloaded"));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_malformed_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/annotate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tokens": []})))
        .mount(&server)
        .await;

    let err = client(&server).annotate("x").await.unwrap_err();
    assert!(matches!(err, PipelineError::AnnotationParse(_)));
}
