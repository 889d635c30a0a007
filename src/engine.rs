use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::models::{Health, ProbeOutcome};
use crate::notify::Notifier;
use crate::store::StatusStore;

const DAY_SECS: i64 = 86_400;

/// Single-target prober. Owns the only state-changing path in the system:
/// probe, compare against the stored classification, and on a transition
/// notify then persist.
pub struct Prober {
    config: Config,
    store: Arc<dyn StatusStore>,
    notifier: Notifier,
    http_client: reqwest::Client,
}

impl Prober {
    pub fn new(config: Config, store: Arc<dyn StatusStore>) -> Self {
        let http_client = reqwest::Client::new();
        let notifier = Notifier::new(config.webhook_url.clone(), http_client.clone());
        Self {
            config,
            store,
            notifier,
            http_client,
        }
    }

    /// Probe on a fixed cadence until the task is dropped. A failed tick is
    /// logged and the loop moves on to the next one.
    pub async fn run(self) {
        info!(
            "watching {} every {:?} (probe deadline {:?})",
            self.config.target_url, self.config.probe_interval, self.config.probe_timeout
        );
        loop {
            if let Err(err) = self.tick().await {
                error!("probe cycle failed: {err:#}");
            }
            tokio::time::sleep(self.config.probe_interval).await;
        }
    }

    /// One scheduled probe. When the classification is unchanged this is a
    /// complete no-op: no notification, no write.
    pub async fn tick(&self) -> Result<()> {
        let key = self.config.storage_key();
        let host = self.config.target_host();

        let previous = self
            .store
            .get(&key)
            .await
            .context("failed to read previous classification")?
            .and_then(|tag| Health::parse(&tag));

        let outcome = self.probe().await;
        if previous == Some(outcome.health) {
            info!("{host} still {}", outcome.health);
            return Ok(());
        }

        let from = previous.map_or("unknown", Health::as_str);
        if outcome.health.is_alert() {
            error!("{host}: {from} -> {} ({})", outcome.health, outcome.message);
        } else {
            warn!("{host}: {from} -> {} ({})", outcome.health, outcome.message);
        }

        // Best-effort delivery; the write below runs regardless.
        self.notifier
            .notify(
                &host,
                self.config.target_url.as_str(),
                outcome.health,
                &outcome.message,
            )
            .await;

        self.store
            .put(&key, outcome.health.as_str(), self.next_expiration())
            .await
            .context("failed to persist classification")
    }

    /// GET the target under the configured deadline. A response classifies
    /// by status code; a request error or a blown deadline classifies as
    /// dead. The request future is cancelled when the deadline wins.
    async fn probe(&self) -> ProbeOutcome {
        let request = self.http_client.get(self.config.target_url.clone()).send();
        match tokio::time::timeout(self.config.probe_timeout, request).await {
            Ok(Ok(response)) => {
                let status = response.status();
                ProbeOutcome {
                    health: if status.is_success() {
                        Health::Ok
                    } else {
                        Health::Error
                    },
                    message: format!(
                        "{} ({})",
                        status.as_u16(),
                        status.canonical_reason().unwrap_or("Unknown")
                    ),
                }
            }
            Ok(Err(err)) => {
                error!("probe request failed: {err}");
                ProbeOutcome {
                    health: Health::Failed,
                    message: err.to_string(),
                }
            }
            Err(_) => {
                error!("probe timed out after {:?}", self.config.probe_timeout);
                ProbeOutcome {
                    health: Health::Failed,
                    message: format!("timed out after {}ms", self.config.probe_timeout.as_millis()),
                }
            }
        }
    }

    fn next_expiration(&self) -> Option<i64> {
        self.config
            .reset_hour_utc
            .map(|hour| next_reset_instant(hour, Utc::now()))
    }
}

/// Next `hour:00:00` UTC strictly after `now`, as Unix seconds. Rolls to the
/// following day when today's occurrence is already past, so a fresh record
/// never carries an expiry the store would discard immediately.
fn next_reset_instant(hour: u32, now: DateTime<Utc>) -> i64 {
    let now_secs = now.timestamp();
    let day_start = now_secs - now_secs.rem_euclid(DAY_SECS);
    let at_hour = day_start + i64::from(hour) * 3_600;
    if at_hour > now_secs {
        at_hour
    } else {
        at_hour + DAY_SECS
    }
}
