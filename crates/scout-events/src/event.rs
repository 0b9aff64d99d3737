//! JSON payloads carried by the live event stream.
//!
//! Every message is an object with a `type` discriminator:
//!
//! - `connected` → [`LiveEvent::Connected`]
//! - `NEW_ACTIVITY_LOG` → [`LiveEvent::NewActivityLog`]
//! - anything else → [`LiveEvent::Unknown`], ignored by the notifier

use scout_core::error::{ScoutError, ScoutResult};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::notification::LocalNotification;

/// Title fallback when the actor has no username.
pub const UNKNOWN_USER: &str = "Unknown User";

/// A decoded stream message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum LiveEvent {
    #[serde(rename = "connected")]
    Connected {
        #[serde(rename = "connectionId", default)]
        connection_id: Option<Value>,
    },

    #[serde(rename = "NEW_ACTIVITY_LOG")]
    NewActivityLog(ActivityLog),

    #[serde(other)]
    Unknown,
}

/// An activity recorded against a lead.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub action: String,
    #[serde(default)]
    pub timestamp: Value,
    #[serde(default)]
    pub actor: Option<Actor>,
    #[serde(default)]
    pub lead_id: Option<LeadRef>,
    #[serde(default)]
    pub previous_value: Option<Value>,
    #[serde(default)]
    pub new_value: Option<Value>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Actor {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LeadRef {
    #[serde(default)]
    pub id: Option<Value>,
}

/// Decode one message body.
pub fn parse_live_event(data: &str) -> ScoutResult<LiveEvent> {
    serde_json::from_str(data).map_err(|e| ScoutError::Parse(e.to_string()))
}

impl ActivityLog {
    /// `"<action> by <username>[ from <previous>][ to <new>]"`.
    pub fn title(&self) -> String {
        let username = self
            .actor
            .as_ref()
            .and_then(|a| a.username.as_deref())
            .filter(|u| !u.is_empty())
            .unwrap_or(UNKNOWN_USER);

        let mut title = format!("{} by {}", self.action, username);
        if let Some(prev) = present(self.previous_value.as_ref()) {
            title.push_str(" from ");
            title.push_str(&prev);
        }
        if let Some(next) = present(self.new_value.as_ref()) {
            title.push_str(" to ");
            title.push_str(&next);
        }
        title
    }

    pub fn to_notification(&self) -> LocalNotification {
        let user_id = self.actor.as_ref().and_then(|a| a.id.clone()).unwrap_or(Value::Null);
        let lead_id = self.lead_id.as_ref().and_then(|l| l.id.clone()).unwrap_or(Value::Null);
        LocalNotification {
            title: self.title(),
            body: self.description.clone(),
            data: json!({
                "timestamp": self.timestamp,
                "userId": user_id,
                "leadId": lead_id,
            }),
        }
    }
}

/// Render a change value for the title; null and empty strings are absent.
fn present(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
