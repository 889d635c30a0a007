use serde::{Deserialize, Serialize};
use std::fmt;

/// Health classification derived from a single probe of the target.
///
/// "No record yet" is deliberately not a variant: everywhere in the system
/// it is `Option<Health>::None`, so the unknown state has to be matched
/// explicitly instead of hiding behind a sentinel string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Health {
    #[serde(rename = "healthy")]
    Ok,
    #[serde(rename = "unhealthy")]
    Error,
    #[serde(rename = "dead")]
    Failed,
}

impl Health {
    /// Storage tag. Also the word the status endpoint renders.
    pub fn as_str(self) -> &'static str {
        match self {
            Health::Ok => "healthy",
            Health::Error => "unhealthy",
            Health::Failed => "dead",
        }
    }

    /// Inverse of [`Health::as_str`]. An unrecognized tag means the record
    /// is unusable and is treated the same as no record at all.
    pub fn parse(tag: &str) -> Option<Health> {
        match tag {
            "healthy" => Some(Health::Ok),
            "unhealthy" => Some(Health::Error),
            "dead" => Some(Health::Failed),
            _ => None,
        }
    }

    /// Whether a transition into this state should page the channel.
    pub fn is_alert(self) -> bool {
        matches!(self, Health::Error | Health::Failed)
    }
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one probe: the classification plus a one-line result message
/// for the notification body.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub health: Health,
    pub message: String,
}
