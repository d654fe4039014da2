use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{DashboardError, Result};

/// Locally assigned, unique within one feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub u64);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A push notification as received over the channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub received_at: DateTime<Utc>,
    pub message: Option<String>,
    /// Every other field of the frame, including a server-side `id`
    pub fields: Map<String, Value>,
}

impl Notification {
    /// Decodes one text frame. Anything but a JSON object is rejected.
    pub fn from_frame(id: NotificationId, text: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| DashboardError::Frame(e.to_string()))?;

        let Value::Object(mut fields) = value else {
            return Err(DashboardError::Frame(format!(
                "expected a JSON object, got {}",
                json_kind(&value)
            )));
        };

        let message = match fields.remove("message") {
            Some(Value::String(message)) => Some(message),
            Some(other) => {
                fields.insert("message".to_string(), other);
                None
            }
            None => None,
        };

        Ok(Self {
            id,
            received_at: Utc::now(),
            message,
            fields,
        })
    }

    pub fn server_id(&self) -> Option<&Value> {
        self.fields.get("id")
    }

    /// The message, or the compact JSON of the frame when it has none
    pub fn display_text(&self) -> String {
        match &self.message {
            Some(message) => message.clone(),
            None => Value::Object(self.fields.clone()).to_string(),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
