//! Environment-driven configuration.
//!
//! Both binaries read plain environment variables (a `.env` file is
//! loaded first when present). Parsing is strict: a malformed numeric
//! value is a startup error, never a silent fallback.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::WorkerError;

/// Worker process configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Queue API base, e.g. `http://localhost:3001/api`.
    pub api_base: String,
    /// Optional bearer token for the queue.
    pub api_token: Option<String>,
    /// Stable worker identity used in claims.
    pub worker_id: String,
    /// Idle delay between polls.
    pub poll_interval: Duration,
    /// Per-request HTTP timeout.
    pub http_timeout: Duration,
    /// Directory holding JSON bar cache files.
    pub data_cache_dir: String,
}

impl WorkerConfig {
    /// Read configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Config`] when a numeric variable does not
    /// parse.
    pub fn from_env() -> Result<Self, WorkerError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    fn from_vars(vars: &HashMap<String, String>) -> Result<Self, WorkerError> {
        let api_base = vars
            .get("QUEUE_API_BASE")
            .cloned()
            .unwrap_or_else(|| "http://localhost:3001/api".to_string());
        let api_token = vars.get("QUEUE_API_TOKEN").filter(|t| !t.is_empty()).cloned();
        let worker_id = vars
            .get("WORKER_ID")
            .filter(|id| !id.is_empty())
            .cloned()
            .unwrap_or_else(|| format!("worker_{}", uuid::Uuid::new_v4().simple()));

        let poll_interval = Duration::from_secs(parse_var(vars, "POLL_INTERVAL_SECS", 5)?);
        let http_timeout = Duration::from_secs(parse_var(vars, "HTTP_TIMEOUT_SECS", 30)?);
        let data_cache_dir = vars
            .get("DATA_CACHE_DIR")
            .cloned()
            .unwrap_or_else(|| "./cache".to_string());

        Ok(Self {
            api_base,
            api_token,
            worker_id,
            poll_interval,
            http_timeout,
            data_cache_dir,
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    name: &str,
    default: T,
) -> Result<T, WorkerError> {
    match vars.get(name) {
        None => Ok(default),
        Some(raw) if raw.is_empty() => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| WorkerError::Config(format!("{name} has invalid value '{raw}'"))),
    }
}
