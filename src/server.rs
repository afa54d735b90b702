//! HTTP surface for the submission service

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::error::SubmissionError;
use crate::submission::{SubmissionRequest, SubmissionResponse, SubmissionService};

/// Language entry used to seed the editor
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LanguageInfo<'a> {
    id: &'a str,
    name: &'a str,
    version: &'a str,
    template: &'a str,
    wraps_bare_statements: bool,
}

pub fn router(service: Arc<SubmissionService>) -> Router {
    Router::new()
        .route("/api/execute", post(execute))
        .route("/api/languages", get(languages))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

async fn execute(
    State(service): State<Arc<SubmissionService>>,
    body: Result<Json<SubmissionRequest>, JsonRejection>,
) -> Result<Json<SubmissionResponse>, SubmissionError> {
    let Json(request) = body.map_err(|e| SubmissionError::InvalidBody(e.body_text()))?;
    let response = service.submit(&request).await?;
    Ok(Json(response))
}

async fn languages(State(service): State<Arc<SubmissionService>>) -> Json<Value> {
    let languages: Vec<LanguageInfo<'_>> = service
        .registry()
        .profiles()
        .map(|p| LanguageInfo {
            id: &p.id,
            name: &p.name,
            version: &p.executor_version,
            template: &p.template,
            wraps_bare_statements: p.wraps_bare_statements(),
        })
        .collect();
    Json(json!(languages))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complexity::ComplexityEstimator;
    use crate::dispatch::{ExecutionLimits, RemoteDispatcher};
    use crate::languages::LanguageRegistry;
    use crate::submission::tests::RecordingDispatcher;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::time::Duration;
    use tower::ServiceExt;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app(dispatcher: Arc<dyn crate::dispatch::Dispatcher>) -> Router {
        let registry = Arc::new(LanguageRegistry::builtin().unwrap());
        let estimator = Arc::new(ComplexityEstimator::new(&registry));
        router(Arc::new(SubmissionService::new(
            registry, dispatcher, estimator, 65536,
        )))
    }

    async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::post("/api/execute")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = app(Arc::new(RecordingDispatcher::accepting("")));
        let (status, body) = call(app, Request::get("/health").body(Body::empty()).unwrap()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_languages_sorted_by_id() {
        let app = app(Arc::new(RecordingDispatcher::accepting("")));
        let (status, body) =
            call(app, Request::get("/api/languages").body(Body::empty()).unwrap()).await;

        assert_eq!(status, StatusCode::OK);
        let ids: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["c", "cpp", "java", "javascript", "python", "typescript"]);
        assert_eq!(body[2]["wrapsBareStatements"], json!(true));
        assert_eq!(body[4]["wrapsBareStatements"], json!(false));
        assert_eq!(body[4]["version"], json!("3.10.0"));
    }

    #[tokio::test]
    async fn test_missing_code_is_bad_request() {
        let dispatcher = Arc::new(RecordingDispatcher::accepting(""));
        let app = app(dispatcher.clone());
        let (status, body) = call(app, post_json(r#"{ "language": "python" }"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Missing required field: code" }));
        assert!(dispatcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let dispatcher = Arc::new(RecordingDispatcher::accepting(""));
        let app = app(dispatcher.clone());
        let (status, body) = call(app, post_json("{ not json")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));
        assert!(dispatcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_language() {
        let dispatcher = Arc::new(RecordingDispatcher::accepting(""));
        let app = app(dispatcher.clone());
        let (status, body) =
            call(app, post_json(r#"{ "language": "brainfuck", "code": "+." }"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Unsupported language: brainfuck" }));
        assert!(dispatcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_timeout_is_gateway_timeout() {
        let app = app(Arc::new(RecordingDispatcher::timing_out()));
        let (status, body) =
            call(app, post_json(r#"{ "language": "python", "code": "print(1)" }"#)).await;

        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_execute_against_mock_executor() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/execute"))
            .and(body_partial_json(json!({
                "language": "python",
                "files": [{ "name": "main.py", "content": "print(\"Hello, World!\")" }],
                "stdin": ""
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "language": "python",
                "version": "3.10.0",
                "run": { "stdout": "Hello, World!\n", "stderr": "", "code": 0, "signal": null, "time": 0.021 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = RemoteDispatcher::new(&server.uri(), ExecutionLimits::default()).unwrap();
        let app = app(Arc::new(dispatcher));
        let (status, body) = call(
            app,
            post_json(
                r#"{ "language": "python", "code": "print(\"Hello, World!\")", "analyzeComplexity": true }"#,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("Accepted"));
        assert_eq!(body["output"], json!("Hello, World!\n"));
        assert_eq!(body["executionTime"], json!(0.021));
        assert_eq!(body["memoryUsed"], json!(-1));
        assert_eq!(body["complexityAnalysis"]["timeComplexity"], json!("constant"));
        assert_eq!(body["complexityAnalysis"]["details"], json!([]));
    }

    #[tokio::test]
    async fn test_upstream_failure_is_bad_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/execute"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .mount(&server)
            .await;

        let limits = ExecutionLimits {
            client_margin: Duration::from_millis(500),
            ..ExecutionLimits::default()
        };
        let dispatcher = RemoteDispatcher::new(&server.uri(), limits).unwrap();
        let (status, body) = call(
            app(Arc::new(dispatcher)),
            post_json(r#"{ "language": "c", "code": "printf(\"hi\");" }"#),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(
            body["error"],
            json!("execution service returned HTTP 500: internal error")
        );
    }
}
