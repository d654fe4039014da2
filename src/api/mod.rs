pub mod client;

pub use client::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Bot, BotId, LogEntry, ManualOrder, MarketPoint, NewBot, Trade};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
}

/// Every REST call the dashboard makes against the bot backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DashboardApi: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse>;

    async fn list_bots(&self) -> Result<Vec<Bot>>;
    async fn get_bot(&self, id: BotId) -> Result<Bot>;

    // Mutations succeed on any 2xx status; the bot is only returned when
    // the body decodes as one.
    async fn create_bot(&self, bot: &NewBot) -> Result<Option<Bot>>;
    async fn update_bot(&self, id: BotId, bot: &NewBot) -> Result<Option<Bot>>;
    async fn delete_bot(&self, id: BotId) -> Result<()>;
    async fn start_bot(&self, id: BotId) -> Result<Option<Bot>>;
    async fn pause_bot(&self, id: BotId) -> Result<Option<Bot>>;
    async fn manual_trade(&self, id: BotId, order: &ManualOrder) -> Result<serde_json::Value>;

    async fn list_trades(&self) -> Result<Vec<Trade>>;
    async fn list_logs(&self) -> Result<Vec<LogEntry>>;
    async fn market_history(&self) -> Result<Vec<MarketPoint>>;
}
