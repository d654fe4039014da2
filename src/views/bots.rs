use std::sync::Arc;
use tracing::{info, warn};

use super::ViewScope;
use crate::api::DashboardApi;
use crate::error::{DashboardError, Result};
use crate::types::{Bot, BotId, ManualOrder, NewBot};

pub const LOAD_FAILED: &str = "Failed to load bots.";
pub const CREATE_FAILED: &str = "Failed to create bot.";
pub const UPDATE_FAILED: &str = "Failed to update bot.";
pub const DELETE_FAILED: &str = "Failed to delete bot.";
pub const START_FAILED: &str = "Failed to start bot.";
pub const PAUSE_FAILED: &str = "Failed to pause bot.";
pub const TRADE_FAILED: &str = "Manual trade failed.";

/// Bot list plus the create form.
///
/// Every successful mutation is followed by one full refresh; refreshes are
/// not coalesced, so the last response to arrive wins.
pub struct BotsView {
    api: Arc<dyn DashboardApi>,
    scope: ViewScope,
    bots: Vec<Bot>,
    pub name: String,
    pub description: String,
    error: Option<String>,
    loading: bool,
    creating: bool,
}

impl BotsView {
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        Self {
            api,
            scope: ViewScope::new(),
            bots: Vec::new(),
            name: String::new(),
            description: String::new(),
            error: None,
            loading: false,
            creating: false,
        }
    }

    pub async fn mount(&mut self) {
        self.scope = ViewScope::new();
        self.refresh().await;
    }

    pub fn unmount(&mut self) {
        self.scope.cancel();
    }

    pub fn scope(&self) -> ViewScope {
        self.scope.clone()
    }

    pub fn bots(&self) -> &[Bot] {
        &self.bots
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_creating(&self) -> bool {
        self.creating
    }

    pub async fn refresh(&mut self) {
        self.loading = true;
        self.error = None;

        match self.scope.run(|| self.api.list_bots()).await {
            Ok(bots) => self.bots = bots,
            Err(DashboardError::Cancelled) => return,
            Err(e) => {
                warn!("Listing bots failed: {}", e);
                self.error = Some(LOAD_FAILED.to_string());
            }
        }
        self.loading = false;
    }

    /// Creates a bot from the form fields and clears them on success
    pub async fn create(&mut self) -> bool {
        self.error = None;
        let request = NewBot::new(self.name.as_str(), self.description.as_str());
        if let Err(e) = request.validate() {
            self.error = Some(e.user_message());
            return false;
        }

        self.creating = true;
        let result = self.scope.run(|| self.api.create_bot(&request)).await;
        self.creating = false;

        let Some(created) = self.after_mutation(result, CREATE_FAILED).await else {
            return false;
        };
        match created {
            Some(bot) => info!("Created bot {} ({})", bot.name, bot.id),
            None => info!("Created bot {}", request.name),
        }
        self.name.clear();
        self.description.clear();
        true
    }

    pub async fn update(&mut self, id: BotId, name: &str, description: &str) -> bool {
        self.error = None;
        let request = NewBot::new(name, description);
        if let Err(e) = request.validate() {
            self.error = Some(e.user_message());
            return false;
        }

        let result = self.scope.run(|| self.api.update_bot(id, &request)).await;
        self.after_mutation(result, UPDATE_FAILED).await.is_some()
    }

    pub async fn delete(&mut self, id: BotId) -> bool {
        self.error = None;
        let result = self.scope.run(|| self.api.delete_bot(id)).await;
        self.after_mutation(result, DELETE_FAILED).await.is_some()
    }

    pub async fn start(&mut self, id: BotId) -> bool {
        self.error = None;
        let result = self.scope.run(|| self.api.start_bot(id)).await;
        self.after_mutation(result, START_FAILED).await.is_some()
    }

    pub async fn pause(&mut self, id: BotId) -> bool {
        self.error = None;
        let result = self.scope.run(|| self.api.pause_bot(id)).await;
        self.after_mutation(result, PAUSE_FAILED).await.is_some()
    }

    pub async fn manual_trade(&mut self, id: BotId, order: &ManualOrder) -> Option<serde_json::Value> {
        self.error = None;
        let result = self.scope.run(|| self.api.manual_trade(id, order)).await;
        self.after_mutation(result, TRADE_FAILED).await
    }

    pub async fn get(&mut self, id: BotId) -> Option<Bot> {
        self.error = None;
        match self.scope.run(|| self.api.get_bot(id)).await {
            Ok(bot) => Some(bot),
            Err(DashboardError::Cancelled) => None,
            Err(e) => {
                warn!("Loading bot {} failed: {}", id, e);
                self.error = Some(LOAD_FAILED.to_string());
                None
            }
        }
    }

    async fn after_mutation<T>(&mut self, result: Result<T>, failure: &str) -> Option<T> {
        match result {
            Ok(value) => {
                self.refresh().await;
                Some(value)
            }
            Err(DashboardError::Cancelled) => None,
            Err(e) => {
                warn!("{} {}", failure, e);
                self.error = Some(failure.to_string());
                None
            }
        }
    }
}
