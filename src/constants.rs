use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub const TIMEOUT_ENV: &str = "SNIPPET_RUNNER_TIMEOUT_SECS";
pub const WORK_DIR_ENV: &str = "SNIPPET_RUNNER_WORK_DIR";

pub const TIMED_OUT_MSG: &str = "Execution timed out.";
pub const UNKNOWN_ERROR_MSG: &str = "Unknown error.";

/// Prefix of every staged file and directory, so leftovers are easy to spot.
pub const STAGING_PREFIX: &str = "snippet-";
