//! Compile-and-run of untrusted snippets across a fixed set of host
//! toolchains, bounded by a wall-clock timeout.

use std::sync::LazyLock;

pub mod config;
pub mod constants;
pub mod core;
pub mod native;

#[cfg(test)]
mod integration_test;

pub use crate::config::Config;
pub use crate::core::domain::{ExecutionRequest, ExecutionResult, HealthReport};
pub use crate::core::orchestrator::Orchestrator;

static DEFAULT: LazyLock<Orchestrator> = LazyLock::new(|| {
    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Invalid configuration, using defaults: {}", e);
        Config::default()
    });
    Orchestrator::native(config)
});

/// Runs `code` as `language` with `stdin` piped in. Never fails: every
/// problem is reported as [`ExecutionResult::Failure`].
pub async fn run_code_in_language(code: &str, stdin: &str, language: &str) -> ExecutionResult {
    DEFAULT.run(code, stdin, language).await
}

/// Languages whose toolchains are installed at the time of the call.
pub fn get_available_languages() -> Vec<&'static str> {
    DEFAULT.available_languages()
}

/// Liveness report carrying the languages available right now.
pub fn health_check() -> HealthReport {
    HealthReport::healthy(get_available_languages())
}
