use std::sync::Arc;
use tracing::warn;

use super::ViewScope;
use crate::api::DashboardApi;
use crate::error::DashboardError;
use crate::types::{ChartSeries, MarketPoint};

pub const CHART_LOAD_FAILED: &str = "Failed to load data.";

/// Market history chart
pub struct ChartView {
    api: Arc<dyn DashboardApi>,
    scope: ViewScope,
    points: Vec<MarketPoint>,
    error: Option<String>,
    loading: bool,
}

impl ChartView {
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        Self {
            api,
            scope: ViewScope::new(),
            points: Vec::new(),
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

    pub async fn load(&mut self) {
        self.loading = true;
        self.error = None;

        match self.scope.run(|| self.api.market_history()).await {
            Ok(points) => self.points = points,
            Err(DashboardError::Cancelled) => return,
            Err(e) => {
                warn!("Loading market history failed: {}", e);
                self.error = Some(CHART_LOAD_FAILED.to_string());
            }
        }
        self.loading = false;
    }

    pub fn points(&self) -> &[MarketPoint] {
        &self.points
    }

    pub fn series(&self) -> ChartSeries {
        ChartSeries::from_points(&self.points)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }
}
