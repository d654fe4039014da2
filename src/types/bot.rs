use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DashboardError, Result};

pub type BotId = u64;

pub const NAME_REQUIRED: &str = "Bot name is required.";

/// Lifecycle status as reported by the server.
///
/// Unrecognised strings are kept instead of failing the whole list decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BotStatus {
    #[default]
    Stopped,
    Running,
    Paused,
    /// Set by the server after a manual order was placed for the bot
    ManualTrade,
    Unknown(String),
}

impl BotStatus {
    pub fn as_str(&self) -> &str {
        match self {
            BotStatus::Stopped => "stopped",
            BotStatus::Running => "running",
            BotStatus::Paused => "paused",
            BotStatus::ManualTrade => "manual_trade",
            BotStatus::Unknown(s) => s,
        }
    }
}

impl From<String> for BotStatus {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "stopped" => BotStatus::Stopped,
            "running" => BotStatus::Running,
            "paused" => BotStatus::Paused,
            "manual_trade" => BotStatus::ManualTrade,
            _ => BotStatus::Unknown(s),
        }
    }
}

impl From<BotStatus> for String {
    fn from(status: BotStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for BotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bot {
    pub id: BotId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: BotStatus,
}

impl Bot {
    pub fn can_start(&self) -> bool {
        self.status != BotStatus::Running
    }

    pub fn can_pause(&self) -> bool {
        self.status != BotStatus::Paused
    }
}

/// Body of the create and update calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewBot {
    pub name: String,
    pub description: Option<String>,
}

impl NewBot {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let description = description.into();
        Self {
            name: name.into().trim().to_string(),
            description: if description.trim().is_empty() {
                None
            } else {
                Some(description)
            },
        }
    }

    /// Rejects a blank name before any request is made
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(DashboardError::Validation(NAME_REQUIRED.to_string()));
        }
        Ok(())
    }
}

/// A manually placed order routed through a bot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManualOrder {
    pub symbol: String,
    pub side: String,
    pub price: rust_decimal::Decimal,
    pub quantity: rust_decimal::Decimal,
    #[serde(rename = "type_")]
    pub order_type: String,
}

impl ManualOrder {
    pub fn limit(
        symbol: impl Into<String>,
        side: impl Into<String>,
        price: rust_decimal::Decimal,
        quantity: rust_decimal::Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side: side.into(),
            price,
            quantity,
            order_type: "LIMIT".to_string(),
        }
    }
}
