mod complexity;
mod config;
mod core;
mod dispatch;
mod error;
mod languages;
mod preparer;
mod server;
mod submission;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::complexity::ComplexityEstimator;
use crate::config::ServiceConfig;
use crate::dispatch::RemoteDispatcher;
use crate::languages::LanguageRegistry;
use crate::submission::SubmissionService;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("submission_pipeline=info".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();

    let config = ServiceConfig::from_env().context("Invalid service configuration")?;

    let registry = Arc::new(LanguageRegistry::builtin().context("Failed to load language table")?);
    info!("Loaded {} language configurations", registry.len());

    let dispatcher = RemoteDispatcher::new(&config.executor_url, config.limits)
        .context("Failed to build execution service client")?;
    info!(
        "Execution service at {} (compile {:?}, run {:?}, client timeout {:?})",
        config.executor_url,
        config.limits.compile_timeout,
        config.limits.run_timeout,
        config.limits.client_timeout()
    );

    let estimator = Arc::new(ComplexityEstimator::new(&registry));

    let service = Arc::new(SubmissionService::new(
        registry,
        Arc::new(dispatcher),
        estimator,
        config.max_source_bytes,
    ));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, server::router(service))
        .await
        .context("Server error")?;

    Ok(())
}
