use anyhow::{bail, Context, Result};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

const DEFAULT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_INTERVAL_SECS: u64 = 60;

fn default_api_port() -> u16 {
    3000
}

/// Runtime configuration, resolved once from the environment at startup and
/// passed explicitly into every component. Nothing in the system reads
/// environment variables after this point.
#[derive(Debug, Clone)]
pub struct Config {
    /// Absolute URL of the endpoint being watched.
    pub target_url: Url,
    /// Deadline for a single probe.
    pub probe_timeout: Duration,
    /// Slack-compatible webhook; `None` disables notifications entirely.
    pub webhook_url: Option<String>,
    /// UTC hour (0-23) at which the stored classification expires back to
    /// unknown. `None` disables expiration.
    pub reset_hour_utc: Option<u32>,
    /// Redis connection URL; `None` selects the in-process store.
    pub redis_url: Option<String>,
    /// Cadence of the probe loop.
    pub probe_interval: Duration,
    pub api_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from any name->value lookup. Malformed optional values
    /// disable their feature rather than failing startup; only the target
    /// URL itself is load-bearing.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let raw = var("TARGET_URL").context("TARGET_URL is not set")?;
        let target_url = Url::parse(raw.trim())
            .with_context(|| format!("TARGET_URL is not an absolute URL: {raw}"))?;
        if target_url.host_str().is_none() {
            bail!("TARGET_URL has no host component: {raw}");
        }

        Ok(Self {
            target_url,
            probe_timeout: Duration::from_millis(
                parse_or_skip(var("TIMEOUT_MS")).unwrap_or(DEFAULT_TIMEOUT_MS),
            ),
            webhook_url: var("SLACK_WEBHOOK_URL").filter(|s| !s.trim().is_empty()),
            reset_hour_utc: parse_or_skip::<u32>(var("RESET_HOURS_IN_UTC")).filter(|h| *h <= 23),
            redis_url: var("REDIS_URL").filter(|s| !s.trim().is_empty()),
            probe_interval: Duration::from_secs(
                parse_or_skip(var("PROBE_INTERVAL_SECS")).unwrap_or(DEFAULT_INTERVAL_SECS),
            ),
            api_port: parse_or_skip(var("API_PORT")).unwrap_or_else(default_api_port),
        })
    }

    /// Host component of the target, port included when one is present.
    pub fn target_host(&self) -> String {
        let host = self.target_url.host_str().unwrap_or_default();
        match self.target_url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    /// Storage key for this target. Dots and the port colon collapse to
    /// dashes so the key stays one flat token.
    pub fn storage_key(&self) -> String {
        format!("endpoint-status--{}", self.target_host().replace(['.', ':'], "-"))
    }
}

fn parse_or_skip<T: FromStr>(raw: Option<String>) -> Option<T> {
    raw.and_then(|v| v.trim().parse().ok())
}
