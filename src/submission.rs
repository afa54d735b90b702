//! Submission orchestration
//!
//! Validates a request, prepares the source, dispatches it and (optionally)
//! estimates its complexity in parallel, then assembles the response.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::complexity::{ComplexityClass, ComplexityEstimate, ComplexityEstimator};
use crate::core::ExecutionStatus;
use crate::dispatch::{Dispatcher, ExecutionOutcome};
use crate::error::SubmissionError;
use crate::languages::{LanguageProfile, LanguageRegistry};
use crate::preparer;

/// Inbound submission; required fields are checked by `validate`
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub analyze_complexity: bool,
}

/// Combined execution outcome and complexity estimate
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub output: String,
    pub error: String,
    pub status: ExecutionStatus,
    /// Seconds
    pub execution_time: f64,
    /// Bytes, -1 if unknown
    pub memory_used: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity_analysis: Option<ComplexityAnalysis>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityAnalysis {
    pub time_complexity: ComplexityClass,
    pub space_complexity: ComplexityClass,
    pub details: Vec<ComplexityDetail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComplexityDetail {
    pub pattern: &'static str,
    pub complexity: ComplexityClass,
    pub description: &'static str,
    pub count: usize,
}

impl From<ComplexityEstimate> for ComplexityAnalysis {
    fn from(estimate: ComplexityEstimate) -> Self {
        Self {
            time_complexity: estimate.time_complexity,
            space_complexity: estimate.space_complexity,
            details: estimate
                .matches
                .into_iter()
                .map(|m| ComplexityDetail {
                    pattern: m.pattern_key,
                    complexity: m.complexity_class,
                    description: m.description,
                    count: m.occurrence_count,
                })
                .collect(),
        }
    }
}

impl SubmissionResponse {
    fn new(outcome: ExecutionOutcome, estimate: Option<ComplexityEstimate>) -> Self {
        Self {
            output: outcome.stdout,
            error: outcome.stderr,
            status: outcome.status,
            execution_time: outcome.wall_time_seconds,
            memory_used: outcome
                .memory_bytes
                .and_then(|bytes| i64::try_from(bytes).ok())
                .unwrap_or(-1),
            complexity_analysis: estimate.map(ComplexityAnalysis::from),
        }
    }
}

/// Runs submissions against a dispatcher and the complexity estimator
pub struct SubmissionService {
    registry: Arc<LanguageRegistry>,
    dispatcher: Arc<dyn Dispatcher>,
    estimator: Arc<ComplexityEstimator>,
    max_source_bytes: usize,
}

impl SubmissionService {
    pub fn new(
        registry: Arc<LanguageRegistry>,
        dispatcher: Arc<dyn Dispatcher>,
        estimator: Arc<ComplexityEstimator>,
        max_source_bytes: usize,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            estimator,
            max_source_bytes,
        }
    }

    pub fn registry(&self) -> &LanguageRegistry {
        &self.registry
    }

    /// Check required fields, size and language before any downstream work
    pub fn validate<'r>(
        &self,
        request: &'r SubmissionRequest,
    ) -> Result<(Arc<LanguageProfile>, &'r str), SubmissionError> {
        let language = request
            .language
            .as_deref()
            .filter(|l| !l.trim().is_empty())
            .ok_or(SubmissionError::MissingField("language"))?;
        let code = request
            .code
            .as_deref()
            .ok_or(SubmissionError::MissingField("code"))?;

        if code.trim().is_empty() {
            return Err(SubmissionError::EmptyCode);
        }
        if code.len() > self.max_source_bytes {
            return Err(SubmissionError::SourceTooLarge {
                size: code.len(),
                limit: self.max_source_bytes,
            });
        }

        let profile = self
            .registry
            .get(language)
            .ok_or_else(|| SubmissionError::UnsupportedLanguage(language.trim().to_string()))?;

        Ok((profile, code))
    }

    /// Execute a submission and, if requested, estimate its complexity
    pub async fn submit(
        &self,
        request: &SubmissionRequest,
    ) -> Result<SubmissionResponse, SubmissionError> {
        let started = Instant::now();
        let (profile, code) = self.validate(request)?;
        let stdin = request.input.as_deref().unwrap_or("");

        let prepared = preparer::prepare(&profile, code);

        // The estimator reads the source as the user wrote it
        let estimate = async {
            if request.analyze_complexity {
                Some(self.estimate(&profile.id, code).await)
            } else {
                None
            }
        };

        let (outcome, estimate) = tokio::join!(
            self.dispatcher.dispatch(&profile, &prepared, stdin),
            estimate
        );

        let outcome = outcome.inspect_err(|e| {
            error!(
                "Submission failed: language={}, error={}",
                profile.id, e
            )
        })?;

        info!(
            "Submission completed: language={}, status={}, elapsed_ms={}",
            profile.id,
            outcome.status,
            started.elapsed().as_millis()
        );

        Ok(SubmissionResponse::new(outcome, estimate))
    }

    /// Estimate on the blocking pool; any fault degrades to the empty estimate
    async fn estimate(&self, language: &str, code: &str) -> ComplexityEstimate {
        let estimator = Arc::clone(&self.estimator);
        let language = language.to_string();
        let code = code.to_string();

        match tokio::task::spawn_blocking(move || estimator.estimate(&code, &language)).await {
            Ok(estimate) => estimate,
            Err(e) => {
                warn!("Complexity estimation failed, using empty estimate: {}", e);
                ComplexityEstimate::empty()
            }
        }
    }
}
