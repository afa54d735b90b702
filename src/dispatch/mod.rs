//! Dispatch module - remote execution abstraction
//!
//! This module submits prepared programs to an execution backend:
//! - `RemoteDispatcher`: HTTP client for a Piston-compatible execution service
//!
//! The dispatch module does NOT:
//! - Wrap or otherwise rewrite user code (see `preparer`)
//! - Retry failed calls
//! - Analyze the submitted source

pub mod remote;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::core::ExecutionStatus;
use crate::languages::LanguageProfile;

/// Phase budgets sent along with every execution request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionLimits {
    /// Compile phase timeout
    pub compile_timeout: Duration,
    /// Run phase timeout
    pub run_timeout: Duration,
    /// Extra client-side slack on top of both phases
    pub client_margin: Duration,
}

impl ExecutionLimits {
    /// Outer bound for the whole network call
    pub fn client_timeout(&self) -> Duration {
        self.compile_timeout + self.run_timeout + self.client_margin
    }
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            compile_timeout: Duration::from_millis(10_000),
            run_timeout: Duration::from_millis(3_000),
            client_margin: Duration::from_millis(2_000),
        }
    }
}

/// Normalized result of one remote execution
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    pub stdout: String,
    pub stderr: String,
    pub status: ExecutionStatus,
    /// Run time reported by the executor, or measured around the call
    pub wall_time_seconds: f64,
    /// Peak memory, only when the executor reports it
    pub memory_bytes: Option<u64>,
}

/// The remote call itself failed; distinct from a failing user program
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("execution service unreachable: {0}")]
    Network(#[source] reqwest::Error),
    #[error("execution service did not respond within {0:?}")]
    Timeout(Duration),
    #[error("execution service returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("execution service sent an unreadable response: {0}")]
    Decode(String),
}

/// Dispatcher trait for submitting prepared programs
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Run `code` (already prepared for the language) with the given stdin
    async fn dispatch(
        &self,
        profile: &LanguageProfile,
        code: &str,
        stdin: &str,
    ) -> Result<ExecutionOutcome, DispatchError>;
}

// Re-exports
pub use remote::RemoteDispatcher;
