use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use tracing::warn;

use crate::models::Health;

/// Slack attachment color per classification; gray for anything we cannot
/// name, including "no classification at all".
pub fn color_of(health: Option<Health>) -> &'static str {
    match health {
        Some(Health::Ok) => "#008888",
        Some(Health::Error) => "#FF8800",
        Some(Health::Failed) => "#880000",
        None => "gray",
    }
}

/// Headline symbol per classification, with a question mark as the default.
pub fn emoji_of(health: Option<Health>) -> &'static str {
    match health {
        Some(Health::Ok) => ":white_check_mark:",
        Some(Health::Error) => ":warning:",
        Some(Health::Failed) => ":x:",
        None => ":question:",
    }
}

/// Transition announcer. Holds the webhook target and the shared HTTP
/// client; with no webhook configured every call is a silent no-op.
pub struct Notifier {
    webhook_url: Option<String>,
    client: reqwest::Client,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>, client: reqwest::Client) -> Self {
        Self {
            webhook_url,
            client,
        }
    }

    /// Announce a classification transition. Best-effort: delivery problems
    /// are logged and swallowed so the caller's storage write always runs.
    pub async fn notify(&self, host: &str, target_url: &str, health: Health, result: &str) {
        let Some(url) = &self.webhook_url else {
            return;
        };
        let payload = build_payload(host, target_url, health, result, Utc::now());
        match self.client.post(url).json(&payload).send().await {
            Ok(response) if !response.status().is_success() => {
                warn!("webhook answered {} for '{host} is {health}'", response.status());
            }
            Ok(_) => {}
            Err(err) => warn!("webhook delivery failed: {err}"),
        }
    }
}

/// Slack block-kit message for one transition. The timestamp is a parameter
/// so tests can pin the footer down.
fn build_payload(
    host: &str,
    target_url: &str,
    health: Health,
    result: &str,
    now: DateTime<Utc>,
) -> Value {
    let mut payload = json!({
        "attachments": [{
            "color": color_of(Some(health)),
            "blocks": [
                {
                    "type": "section",
                    "text": {
                        "type": "mrkdwn",
                        "text": format!("{} *{host} is {health}*", emoji_of(Some(health))),
                    },
                },
                {
                    "type": "section",
                    "fields": [
                        { "type": "mrkdwn", "text": format!("*Target URL*\n{target_url}") },
                        { "type": "mrkdwn", "text": format!("*Result*\n{result}") },
                    ],
                },
                {
                    "type": "context",
                    "elements": [{
                        "type": "mrkdwn",
                        "text": format!(
                            "<!date^{}^{{date_short_pretty}} {{time_secs}}|{}>",
                            now.timestamp(),
                            now.to_rfc3339_opts(SecondsFormat::Millis, true),
                        ),
                    }],
                },
            ],
        }],
    });
    // The channel mention rides on the top-level text, which Slack also uses
    // for the push preview. Healthy transitions carry no text key at all.
    if health.is_alert() {
        payload["text"] = json!(format!("<!channel> {host} is {health}"));
    }
    payload
}
