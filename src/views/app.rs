use std::sync::Arc;
use tracing::info;

use super::{AuthView, DashboardView};
use crate::api::DashboardApi;
use crate::notifications::ReconnectPolicy;
use crate::session::SessionContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Auth,
    Dashboard,
}

/// Root view: shows the login form or the dashboard, never both
pub struct AppView {
    session: SessionContext,
    pub auth: AuthView,
    pub dashboard: DashboardView,
    screen: Screen,
}

impl AppView {
    pub fn new(
        api: Arc<dyn DashboardApi>,
        session: SessionContext,
        ws_url: impl Into<String>,
        policy: ReconnectPolicy,
    ) -> Self {
        Self {
            auth: AuthView::new(api.clone(), session.clone()),
            dashboard: DashboardView::new(api, ws_url, policy),
            session,
            screen: Screen::Auth,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// Picks the first screen from the restored session
    pub async fn start(&mut self) {
        if self.session.is_authenticated().await {
            self.show(Screen::Dashboard).await;
        } else {
            self.show(Screen::Auth).await;
        }
    }

    pub async fn toggle(&mut self) {
        let next = match self.screen {
            Screen::Auth => Screen::Dashboard,
            Screen::Dashboard => Screen::Auth,
        };
        self.show(next).await;
    }

    /// Submits the login form; switches to the dashboard on success
    pub async fn login(&mut self) -> bool {
        if !self.auth.submit().await {
            return false;
        }
        self.show(Screen::Dashboard).await;
        true
    }

    pub async fn logout(&mut self) {
        self.show(Screen::Auth).await;
        self.auth.logout().await;
    }

    async fn show(&mut self, screen: Screen) {
        match screen {
            Screen::Dashboard => self.dashboard.mount().await,
            Screen::Auth => self.dashboard.unmount().await,
        }
        if self.screen != screen {
            info!("Switching to {:?} screen", screen);
        }
        self.screen = screen;
    }
}
