//! Remote dispatcher for a Piston-compatible execution service
//!
//! Sends one request per submission and normalizes the reply into an
//! `ExecutionOutcome`. Memory limits are left to the remote sandbox.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use super::{DispatchError, Dispatcher, ExecutionLimits, ExecutionOutcome};
use crate::core::{resolve_status, ExecutionStatus, PhaseReport};
use crate::languages::LanguageProfile;

/// Memory limit sentinel meaning "no limit at this layer"
const UNBOUNDED_MEMORY: i64 = -1;

/// Upstream error bodies are cut to this many characters in errors/logs
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    language: &'a str,
    version: &'a str,
    files: [SourceFile<'a>; 1],
    stdin: &'a str,
    args: [&'a str; 0],
    compile_timeout: u64,
    run_timeout: u64,
    compile_memory_limit: i64,
    run_memory_limit: i64,
}

#[derive(Debug, Serialize)]
struct SourceFile<'a> {
    name: &'a str,
    content: &'a str,
}

/// Reply from the execution service; every field is optional
#[derive(Debug, Default, Deserialize)]
struct ExecuteResponse {
    #[serde(default)]
    compile: Option<StageResult>,
    #[serde(default)]
    run: Option<StageResult>,
}

#[derive(Debug, Default, Deserialize)]
struct StageResult {
    #[serde(default)]
    stdout: Option<String>,
    #[serde(default)]
    stderr: Option<String>,
    #[serde(default)]
    code: Option<i32>,
    #[serde(default)]
    signal: Option<String>,
    /// Run time in seconds
    #[serde(default)]
    time: Option<f64>,
    /// Wall time in milliseconds (newer Piston releases)
    #[serde(default)]
    wall_time: Option<f64>,
    /// Peak memory in bytes
    #[serde(default)]
    memory: Option<u64>,
}

impl StageResult {
    fn stdout(&self) -> &str {
        self.stdout.as_deref().unwrap_or("")
    }

    fn stderr(&self) -> &str {
        self.stderr.as_deref().unwrap_or("")
    }

    fn signal(&self) -> Option<&str> {
        self.signal.as_deref().filter(|s| !s.is_empty())
    }

    fn wall_time_seconds(&self) -> Option<f64> {
        self.time
            .or_else(|| self.wall_time.map(|ms| ms / 1000.0))
            .filter(|t| t.is_finite() && *t >= 0.0)
    }
}

/// Dispatcher backed by a remote execution service
pub struct RemoteDispatcher {
    http: reqwest::Client,
    endpoint: String,
    limits: ExecutionLimits,
}

impl RemoteDispatcher {
    /// Create a dispatcher for the service rooted at `base_url`
    pub fn new(base_url: &str, limits: ExecutionLimits) -> Result<Self, DispatchError> {
        let http = reqwest::Client::builder()
            .timeout(limits.client_timeout())
            .build()
            .map_err(DispatchError::Network)?;
        Ok(Self {
            http,
            endpoint: format!("{}/execute", base_url.trim_end_matches('/')),
            limits,
        })
    }

    async fn send(&self, request: &ExecuteRequest<'_>) -> Result<ExecuteResponse, DispatchError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            let text: String = String::from_utf8_lossy(&body)
                .chars()
                .take(MAX_ERROR_BODY_CHARS)
                .collect();
            return Err(DispatchError::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_slice(&body).map_err(|e| DispatchError::Decode(e.to_string()))
    }

    fn classify(&self, err: reqwest::Error) -> DispatchError {
        if err.is_timeout() {
            DispatchError::Timeout(self.limits.client_timeout())
        } else {
            DispatchError::Network(err)
        }
    }
}

#[async_trait]
impl Dispatcher for RemoteDispatcher {
    async fn dispatch(
        &self,
        profile: &LanguageProfile,
        code: &str,
        stdin: &str,
    ) -> Result<ExecutionOutcome, DispatchError> {
        let request = ExecuteRequest {
            language: &profile.executor_language,
            version: &profile.executor_version,
            files: [SourceFile {
                name: &profile.entry_file,
                content: code,
            }],
            stdin,
            args: [],
            compile_timeout: self.limits.compile_timeout.as_millis() as u64,
            run_timeout: self.limits.run_timeout.as_millis() as u64,
            compile_memory_limit: UNBOUNDED_MEMORY,
            run_memory_limit: UNBOUNDED_MEMORY,
        };

        debug!(
            "Dispatching {} ({} {}) to {}",
            profile.entry_file, profile.executor_language, profile.executor_version, self.endpoint
        );

        let started = Instant::now();
        let result = self.send(&request).await;
        let elapsed = started.elapsed();

        let response = result.inspect_err(|e| warn!("Dispatch of {} failed: {}", profile.id, e))?;
        Ok(normalize(response, elapsed.as_secs_f64()))
    }
}

/// Map a raw executor reply into an outcome
fn normalize(response: ExecuteResponse, measured_seconds: f64) -> ExecutionOutcome {
    let compile = response.compile.unwrap_or_default();
    let run = response.run.unwrap_or_default();

    let compile_error = compile_error_text(&compile);
    let status = resolve_status(&PhaseReport {
        compile_stderr: &compile_error,
        run_signal: run.signal(),
        run_stderr: run.stderr(),
    });

    let (stdout, stderr) = match status {
        ExecutionStatus::CompilationError => (compile.stdout().to_string(), compile_error),
        _ => (run.stdout().to_string(), run.stderr().to_string()),
    };

    ExecutionOutcome {
        stdout,
        stderr,
        status,
        wall_time_seconds: run.wall_time_seconds().unwrap_or(measured_seconds),
        memory_bytes: run.memory,
    }
}

/// Compiler diagnostics, falling back to a synthetic message when the
/// compiler failed silently
fn compile_error_text(compile: &StageResult) -> String {
    if !compile.stderr().is_empty() {
        return compile.stderr().to_string();
    }

    let failed = compile.code.is_some_and(|c| c != 0) || compile.signal().is_some();
    if !failed {
        return String::new();
    }

    if !compile.stdout().is_empty() {
        compile.stdout().to_string()
    } else if let Some(signal) = compile.signal() {
        format!("Compilation timed out ({})", signal)
    } else {
        format!(
            "Compilation failed with exit code {}",
            compile.code.unwrap_or_default()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::LanguageRegistry;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn profile(id: &str) -> LanguageProfile {
        LanguageRegistry::builtin()
            .unwrap()
            .get(id)
            .map(|p| p.as_ref().clone())
            .unwrap()
    }

    fn parse(value: serde_json::Value) -> ExecuteResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_normalize_accepted_uses_reported_time() {
        let outcome = normalize(
            parse(json!({
                "run": { "stdout": "42\n", "stderr": "", "code": 0, "signal": null, "time": 0.25 }
            })),
            9.0,
        );

        assert_eq!(outcome.status, ExecutionStatus::Accepted);
        assert_eq!(outcome.stdout, "42\n");
        assert_eq!(outcome.wall_time_seconds, 0.25);
        assert_eq!(outcome.memory_bytes, None);
    }

    #[test]
    fn test_normalize_missing_fields_are_empty() {
        let outcome = normalize(parse(json!({})), 1.5);

        assert_eq!(outcome.status, ExecutionStatus::Accepted);
        assert_eq!(outcome.stdout, "");
        assert_eq!(outcome.wall_time_seconds, 1.5);
    }

    #[test]
    fn test_normalize_compile_error_reports_compiler_output() {
        let outcome = normalize(
            parse(json!({
                "compile": { "stdout": "", "stderr": "main.cpp:3:5: error: expected ';'", "code": 1 },
                "run": { "stdout": "", "stderr": "should not matter", "signal": null }
            })),
            0.1,
        );

        assert_eq!(outcome.status, ExecutionStatus::CompilationError);
        assert_eq!(outcome.stderr, "main.cpp:3:5: error: expected ';'");
    }

    #[test]
    fn test_normalize_silent_compiler_timeout() {
        let outcome = normalize(
            parse(json!({ "compile": { "stdout": "", "stderr": "", "code": null, "signal": "SIGKILL" } })),
            0.1,
        );

        assert_eq!(outcome.status, ExecutionStatus::CompilationError);
        assert_eq!(outcome.stderr, "Compilation timed out (SIGKILL)");
    }

    #[test]
    fn test_normalize_killed_run_is_time_limit() {
        let outcome = normalize(
            parse(json!({
                "run": { "stdout": "partial", "stderr": "partial trace", "code": null, "signal": "SIGKILL", "wall_time": 3000.0, "memory": 8192 }
            })),
            0.1,
        );

        assert_eq!(outcome.status, ExecutionStatus::TimeLimitExceeded);
        assert_eq!(outcome.wall_time_seconds, 3.0);
        assert_eq!(outcome.memory_bytes, Some(8192));
    }

    #[test]
    fn test_normalize_runtime_error() {
        let outcome = normalize(
            parse(json!({
                "run": { "stdout": "", "stderr": "ZeroDivisionError: division by zero", "code": 1, "signal": null }
            })),
            0.1,
        );

        assert_eq!(outcome.status, ExecutionStatus::RuntimeError);
        assert!(outcome.stderr.contains("ZeroDivisionError"));
    }

    #[test]
    fn test_normalize_newline_on_stderr_is_runtime_error() {
        let outcome = normalize(
            parse(json!({
                "run": { "stdout": "done\n", "stderr": "\n", "code": 0, "signal": null }
            })),
            0.1,
        );

        assert_eq!(outcome.status, ExecutionStatus::RuntimeError);
        assert_eq!(outcome.stderr, "\n");
    }

    #[tokio::test]
    async fn test_dispatch_sends_single_file_with_limits() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/execute"))
            .and(body_partial_json(json!({
                "language": "java",
                "version": "15.0.2",
                "files": [{ "name": "Main.java" }],
                "stdin": "5\n",
                "args": [],
                "compile_timeout": 10000,
                "run_timeout": 3000,
                "compile_memory_limit": -1,
                "run_memory_limit": -1
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "run": { "stdout": "Hello, World!\n", "stderr": "", "code": 0, "signal": null }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = RemoteDispatcher::new(&server.uri(), ExecutionLimits::default()).unwrap();
        let java = profile("java");
        let outcome = dispatcher.dispatch(&java, &java.template, "5\n").await.unwrap();

        assert_eq!(outcome.status, ExecutionStatus::Accepted);
        assert_eq!(outcome.stdout, "Hello, World!\n");
    }

    #[tokio::test]
    async fn test_every_language_runs_hello_world() {
        let registry = LanguageRegistry::builtin().unwrap();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/execute"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "run": { "stdout": "Hello, World!\n", "stderr": "", "code": 0, "signal": null }
            })))
            .expect(registry.len() as u64)
            .mount(&server)
            .await;

        let dispatcher = RemoteDispatcher::new(&server.uri(), ExecutionLimits::default()).unwrap();
        for profile in registry.profiles() {
            let outcome = dispatcher.dispatch(profile, &profile.template, "").await.unwrap();
            assert_eq!(outcome.status, ExecutionStatus::Accepted, "{}", profile.id);
            assert_eq!(outcome.stdout, "Hello, World!\n", "{}", profile.id);
        }
    }

    #[tokio::test]
    async fn test_upstream_error_is_dispatch_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = RemoteDispatcher::new(&server.uri(), ExecutionLimits::default()).unwrap();
        let err = dispatcher
            .dispatch(&profile("python"), "print(1)", "")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DispatchError::Upstream { status: 429, ref body } if body == "rate limited"
        ));
    }

    #[tokio::test]
    async fn test_garbage_body_is_decode_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let dispatcher = RemoteDispatcher::new(&server.uri(), ExecutionLimits::default()).unwrap();
        let err = dispatcher
            .dispatch(&profile("python"), "print(1)", "")
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Decode(_)));
    }

    #[tokio::test]
    async fn test_unresponsive_service_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let limits = ExecutionLimits {
            compile_timeout: Duration::from_millis(50),
            run_timeout: Duration::from_millis(50),
            client_margin: Duration::from_millis(100),
        };
        let dispatcher = RemoteDispatcher::new(&server.uri(), limits).unwrap();
        let err = dispatcher
            .dispatch(&profile("python"), "print(1)", "")
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::Timeout(d) if d == Duration::from_millis(200)));
    }
}
