//! Submission errors and their HTTP mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::dispatch::DispatchError;

/// Why a submission did not produce an execution outcome
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Source code is empty")]
    EmptyCode,
    #[error("Source code is {size} bytes, the limit is {limit} bytes")]
    SourceTooLarge { size: usize, limit: usize },
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl SubmissionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SubmissionError::Dispatch(DispatchError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            SubmissionError::Dispatch(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for SubmissionError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
