//! Webhook notifier
//!
//! Posts alert transitions to Slack, Discord or any endpoint that accepts
//! JSON. Runs on the dispatcher thread, so the blocking `ureq` agent is
//! fine here.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{Notifier, NotifyError};
use crate::constants::{APP_NAME, DEFAULT_WEBHOOK_TIMEOUT_SECS};
use crate::logic::alert::{AlertEvent, AlertLevel};

// ============================================================================
// CONFIG
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookPlatform {
    Slack,
    Discord,
    Generic,
}

impl WebhookPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookPlatform::Slack => "slack",
            WebhookPlatform::Discord => "discord",
            WebhookPlatform::Generic => "generic",
        }
    }
}

impl fmt::Display for WebhookPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WebhookPlatform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slack" => Ok(WebhookPlatform::Slack),
            "discord" => Ok(WebhookPlatform::Discord),
            "generic" | "json" | "" => Ok(WebhookPlatform::Generic),
            other => Err(format!("unknown webhook platform '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub id: String,
    pub name: String,
    pub url: String,
    pub platform: WebhookPlatform,
    /// Transitions touching a level below this are not sent
    #[serde(default = "default_min_level")]
    pub min_level: AlertLevel,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub include_details: bool,
}

fn default_min_level() -> AlertLevel {
    AlertLevel::Warning
}

fn default_true() -> bool {
    true
}

impl WebhookConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>, platform: WebhookPlatform) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            url: url.into(),
            platform,
            min_level: default_min_level(),
            enabled: true,
            include_details: true,
        }
    }

    /// Escalations are filtered on the new level, clears on the old one
    pub fn accepts(&self, event: &AlertEvent) -> bool {
        self.enabled && event.old_level.max(event.new_level) >= self.min_level
    }
}

// ============================================================================
// NOTIFIER
// ============================================================================

pub struct WebhookNotifier {
    config: WebhookConfig,
    agent: ureq::Agent,
}

impl WebhookNotifier {
    pub fn new(config: WebhookConfig) -> Self {
        Self::with_timeout(config, Duration::from_secs(DEFAULT_WEBHOOK_TIMEOUT_SECS))
    }

    pub fn with_timeout(config: WebhookConfig, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { config, agent }
    }

    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }
}

impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn notify(&self, event: &AlertEvent) -> Result<(), NotifyError> {
        if !self.config.accepts(event) {
            log::debug!("Webhook '{}' skips {}", self.config.name, event.summary());
            return Ok(());
        }

        let body = format_payload(self.config.platform, event, self.config.include_details)?;
        let response = self
            .agent
            .post(&self.config.url)
            .set("Content-Type", "application/json")
            .send_string(&body);

        match response {
            Ok(resp) => {
                log::info!(
                    "Alert {} sent to {} ({}, HTTP {})",
                    event.id,
                    self.config.name,
                    self.config.platform,
                    resp.status()
                );
                Ok(())
            }
            Err(ureq::Error::Status(status, _)) => Err(NotifyError::Rejected { status }),
            Err(e) => Err(NotifyError::Network(e.to_string())),
        }
    }
}

// ============================================================================
// FORMATTING
// ============================================================================

pub fn format_payload(platform: WebhookPlatform, event: &AlertEvent, details: bool) -> Result<String, NotifyError> {
    let value = match platform {
        WebhookPlatform::Slack => format_slack(event, details),
        WebhookPlatform::Discord => format_discord(event, details),
        WebhookPlatform::Generic => format_generic(event)?,
    };
    serde_json::to_string(&value).map_err(|e| NotifyError::Format(e.to_string()))
}

fn title(event: &AlertEvent) -> String {
    let verb = if event.is_escalation() { "raised to" } else { "cleared to" };
    format!("{} {} alert {} {}", event.new_level.emoji(), event.equipment_id, verb, event.new_level)
}

fn message(event: &AlertEvent) -> String {
    format!(
        "Failure risk {:.2} ({}) moved {} from {} to {}.",
        event.triggering_score, event.triggering_metric, event.equipment_id, event.old_level, event.new_level
    )
}

fn format_slack(event: &AlertEvent, details: bool) -> serde_json::Value {
    let mut blocks = vec![
        serde_json::json!({
            "type": "header",
            "text": { "type": "plain_text", "text": title(event), "emoji": true }
        }),
        serde_json::json!({
            "type": "section",
            "text": { "type": "mrkdwn", "text": message(event) }
        }),
    ];

    if details {
        blocks.push(serde_json::json!({
            "type": "section",
            "fields": [
                { "type": "mrkdwn", "text": format!("*Equipment:* {}", event.equipment_id) },
                { "type": "mrkdwn", "text": format!("*Risk:* {:.3}", event.triggering_score) },
                { "type": "mrkdwn", "text": format!("*Level:* {} → {}", event.old_level, event.new_level) },
                { "type": "mrkdwn", "text": format!("*At:* {}", event.timestamp.to_rfc3339()) },
            ]
        }));
    }

    serde_json::json!({
        "blocks": blocks,
        "attachments": [{ "color": format!("#{:06X}", event.new_level.color()) }]
    })
}

fn format_discord(event: &AlertEvent, details: bool) -> serde_json::Value {
    let fields = if details {
        serde_json::json!([
            { "name": "Equipment", "value": event.equipment_id, "inline": true },
            { "name": "Risk", "value": format!("{:.3}", event.triggering_score), "inline": true },
            { "name": "Previous level", "value": event.old_level.as_str(), "inline": true },
        ])
    } else {
        serde_json::json!([])
    };

    serde_json::json!({
        "username": APP_NAME,
        "embeds": [{
            "title": title(event),
            "description": message(event),
            "color": event.new_level.color(),
            "fields": fields,
            "timestamp": event.timestamp.to_rfc3339()
        }]
    })
}

fn format_generic(event: &AlertEvent) -> Result<serde_json::Value, NotifyError> {
    let mut value = serde_json::to_value(event).map_err(|e| NotifyError::Format(e.to_string()))?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert("source".to_string(), serde_json::json!(APP_NAME));
        obj.insert("summary".to_string(), serde_json::json!(event.summary()));
    }
    Ok(value)
}
