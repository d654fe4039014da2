use std::sync::Arc;
use tracing::info;

use super::{BotsView, ChartView, HistoryView, NotificationsView};
use crate::api::DashboardApi;
use crate::notifications::ReconnectPolicy;

/// Main screen: bots, history, chart and live notifications
pub struct DashboardView {
    pub bots: BotsView,
    pub history: HistoryView,
    pub charts: ChartView,
    pub notifications: NotificationsView,
    mounted: bool,
}

impl DashboardView {
    pub fn new(api: Arc<dyn DashboardApi>, ws_url: impl Into<String>, policy: ReconnectPolicy) -> Self {
        Self {
            bots: BotsView::new(api.clone()),
            history: HistoryView::new(api.clone()),
            charts: ChartView::new(api),
            notifications: NotificationsView::new(ws_url, policy),
            mounted: false,
        }
    }

    /// Opens the channel and loads the REST panels concurrently
    pub async fn mount(&mut self) {
        if self.mounted {
            return;
        }
        self.mounted = true;
        info!("Mounting dashboard");

        self.notifications.mount().await;
        tokio::join!(
            self.bots.mount(),
            self.history.mount(),
            self.charts.mount(),
        );
    }

    pub async fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        info!("Unmounting dashboard");

        self.bots.unmount();
        self.history.unmount();
        self.charts.unmount();
        self.notifications.unmount().await;
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }
}
