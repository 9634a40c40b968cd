//! Root configuration for a capture relay process.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::PollingConfig;

/// Client-side deadline for one submission, in milliseconds.
pub const DEFAULT_SUBMIT_DEADLINE_MS: u64 = 3000;

/// Path the re-authentication recovery action redirects to.
pub const DEFAULT_REAUTH_PATH: &str = "/";

/// Path of the submission endpoint, relative to the configured base URL.
pub const ACTIONS_PATH: &str = "/api/actions";

/// Environment variable prefix read by [`RelayConfig::from_env`].
pub const ENV_PREFIX: &str = "CAPTURE_RELAY_";

/// Root relay configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Base URL of the submission service, e.g. `https://api.example.com`.
    pub endpoint: String,
    /// Deadline applied to every submission attempt.
    #[serde(default = "default_submit_deadline_ms")]
    pub submit_deadline_ms: u64,
    /// Redirect target offered alongside a reset.
    #[serde(default = "default_reauth_path")]
    pub reauth_path: String,
    /// Scheduler settings.
    #[serde(default = "PollingConfig::capture_defaults")]
    pub polling: PollingConfig,
}

const fn default_submit_deadline_ms() -> u64 {
    DEFAULT_SUBMIT_DEADLINE_MS
}

fn default_reauth_path() -> String {
    DEFAULT_REAUTH_PATH.to_string()
}

impl RelayConfig {
    /// Configuration for `endpoint` with reference defaults everywhere else.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            submit_deadline_ms: DEFAULT_SUBMIT_DEADLINE_MS,
            reauth_path: default_reauth_path(),
            polling: PollingConfig::capture_defaults(),
        }
    }

    /// Submission deadline as a [`Duration`].
    #[must_use]
    pub const fn submit_deadline(&self) -> Duration {
        Duration::from_millis(self.submit_deadline_ms)
    }

    /// Full URL submissions are posted to.
    #[must_use]
    pub fn actions_url(&self) -> String {
        format!("{}{ACTIONS_PATH}", self.endpoint.trim_end_matches('/'))
    }

    /// Validate the relay and its polling settings.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(format!("endpoint `{}` must be an http(s) URL", self.endpoint));
        }
        if self.submit_deadline_ms == 0 {
            return Err("submit_deadline_ms must be greater than 0".into());
        }
        self.polling
            .validate()
            .map_err(|e| format!("polling invalid: {e}"))
    }

    /// Parse relay configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from the process environment, reading a `.env` file first if present.
    ///
    /// Recognised variables (all prefixed with [`ENV_PREFIX`]): `ENDPOINT`
    /// (required), `SUBMIT_DEADLINE_MS`, `REAUTH_PATH`, `INTERVAL_MS`,
    /// `WAIT_FOR_PREVIOUS`, `MAX_CONSECUTIVE_FAILURES`, `ESCALATE`.
    pub fn from_env() -> Result<Self, String> {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!(error = %e, "no .env file loaded");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source (keys include the prefix).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        let endpoint = get("ENDPOINT").ok_or_else(|| format!("{ENV_PREFIX}ENDPOINT is not set"))?;
        let mut cfg = Self::new(endpoint);

        if let Some(v) = get("SUBMIT_DEADLINE_MS") {
            cfg.submit_deadline_ms = parse_var("SUBMIT_DEADLINE_MS", &v)?;
        }
        if let Some(v) = get("REAUTH_PATH") {
            cfg.reauth_path = v;
        }
        if let Some(v) = get("INTERVAL_MS") {
            cfg.polling.interval_ms = parse_var("INTERVAL_MS", &v)?;
        }
        if let Some(v) = get("WAIT_FOR_PREVIOUS") {
            cfg.polling.wait_for_previous = parse_var("WAIT_FOR_PREVIOUS", &v)?;
        }
        if let Some(v) = get("MAX_CONSECUTIVE_FAILURES") {
            cfg.polling.max_consecutive_failures = if v.eq_ignore_ascii_case("none") {
                None
            } else {
                Some(parse_var("MAX_CONSECUTIVE_FAILURES", &v)?)
            };
        }
        if let Some(v) = get("ESCALATE") {
            cfg.polling.escalate_on_max_failures = parse_var("ESCALATE", &v)?;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| format!("{ENV_PREFIX}{name}=`{value}`: {e}"))
}
