//! Service configuration
//!
//! Loaded once at startup from environment variables (and `.env`, see `main`).

use anyhow::{Context, Result};
use std::time::Duration;

use crate::dispatch::ExecutionLimits;

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Socket address the HTTP server binds to (default: 0.0.0.0:8080)
    pub bind_addr: String,
    /// Base URL of the Piston-compatible execution service
    pub executor_url: String,
    /// Compile/run budgets and the outer client timeout margin
    pub limits: ExecutionLimits,
    /// Largest accepted source, in bytes (default: 64KB)
    pub max_source_bytes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".into(),
            executor_url: "https://emkc.org/api/v2/piston".into(),
            limits: ExecutionLimits::default(),
            max_source_bytes: 64 * 1024,
        }
    }
}

impl ServiceConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from a variable lookup; unset variables keep
    /// their default, malformed numbers are an error
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let millis = |key: &str, default: Duration| -> Result<Duration> {
            match lookup(key) {
                Some(value) => value
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .with_context(|| format!("{} must be a number of milliseconds, got '{}'", key, value)),
                None => Ok(default),
            }
        };

        let limits = ExecutionLimits {
            compile_timeout: millis("COMPILE_TIMEOUT_MS", defaults.limits.compile_timeout)?,
            run_timeout: millis("RUN_TIMEOUT_MS", defaults.limits.run_timeout)?,
            client_margin: millis("CLIENT_TIMEOUT_MARGIN_MS", defaults.limits.client_margin)?,
        };

        let max_source_bytes = match lookup("MAX_SOURCE_BYTES") {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .with_context(|| format!("MAX_SOURCE_BYTES must be a byte count, got '{}'", value))?,
            None => defaults.max_source_bytes,
        };

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            executor_url: lookup("EXECUTOR_URL").unwrap_or(defaults.executor_url),
            limits,
            max_source_bytes,
        })
    }
}
