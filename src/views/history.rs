use std::sync::Arc;
use tracing::warn;

use super::ViewScope;
use crate::api::DashboardApi;
use crate::error::DashboardError;
use crate::types::{LogEntry, Trade, TradeFilter};

pub const HISTORY_LOAD_FAILED: &str = "Failed to load data.";

/// Trade table, log list and trade detail
pub struct HistoryView {
    api: Arc<dyn DashboardApi>,
    scope: ViewScope,
    trades: Vec<Trade>,
    logs: Vec<LogEntry>,
    filter: TradeFilter,
    detail: Option<Trade>,
    error: Option<String>,
    loading: bool,
}

impl HistoryView {
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        Self {
            api,
            scope: ViewScope::new(),
            trades: Vec::new(),
            logs: Vec::new(),
            filter: TradeFilter::All,
            detail: None,
            error: None,
            loading: false,
        }
    }

    pub async fn mount(&mut self) {
        self.scope = ViewScope::new();
        self.load().await;
    }

    pub fn unmount(&mut self) {
        self.scope.cancel();
    }

    /// Fetches trades and logs concurrently; either failing keeps both lists
    pub async fn load(&mut self) {
        self.loading = true;
        self.error = None;

        let api = &self.api;
        let result = self
            .scope
            .run(move || async move { tokio::try_join!(api.list_trades(), api.list_logs()) })
            .await;

        match result {
            Ok((trades, logs)) => {
                self.trades = trades;
                self.logs = logs;
            }
            Err(DashboardError::Cancelled) => return,
            Err(e) => {
                warn!("Loading history failed: {}", e);
                self.error = Some(HISTORY_LOAD_FAILED.to_string());
            }
        }
        self.loading = false;
    }

    pub fn set_filter(&mut self, filter: TradeFilter) {
        self.filter = filter;
    }

    pub fn filter(&self) -> TradeFilter {
        self.filter
    }

    /// Trades matching the current filter, in server order
    pub fn visible_trades(&self) -> Vec<&Trade> {
        self.trades.iter().filter(|t| self.filter.matches(t)).collect()
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn show_detail(&mut self, trade_id: u64) -> bool {
        self.detail = self.trades.iter().find(|t| t.id == trade_id).cloned();
        self.detail.is_some()
    }

    pub fn close_detail(&mut self) {
        self.detail = None;
    }

    pub fn detail(&self) -> Option<&Trade> {
        self.detail.as_ref()
    }

    pub fn detail_json(&self) -> Option<String> {
        self.detail
            .as_ref()
            .and_then(|t| serde_json::to_string_pretty(t).ok())
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }
}
