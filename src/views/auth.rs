use std::sync::Arc;
use tracing::{info, warn};

use crate::api::{Credentials, DashboardApi};
use crate::error::DashboardError;
use crate::session::SessionContext;

pub const MISSING_CREDENTIALS: &str = "Enter username and password.";
pub const INVALID_CREDENTIALS: &str = "Invalid credentials.";
pub const LOGIN_FAILED: &str = "Login failed.";
pub const SERVER_UNREACHABLE: &str = "Cannot reach the server.";

/// Login form
pub struct AuthView {
    api: Arc<dyn DashboardApi>,
    session: SessionContext,
    pub username: String,
    pub password: String,
    error: Option<String>,
    loading: bool,
}

impl AuthView {
    pub fn new(api: Arc<dyn DashboardApi>, session: SessionContext) -> Self {
        Self {
            api,
            session,
            username: String::new(),
            password: String::new(),
            error: None,
            loading: false,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Returns true once the token is persisted; the caller switches to the dashboard
    pub async fn submit(&mut self) -> bool {
        self.error = None;

        if self.username.is_empty() || self.password.is_empty() {
            self.error = Some(MISSING_CREDENTIALS.to_string());
            return false;
        }

        self.loading = true;
        let result = self.try_login().await;
        self.loading = false;

        match result {
            Ok(()) => {
                info!("Logged in as {}", self.username);
                true
            }
            Err(message) => {
                self.error = Some(message);
                false
            }
        }
    }

    async fn try_login(&self) -> Result<(), String> {
        let credentials = Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        };

        let response = self.api.login(&credentials).await.map_err(|e| {
            warn!("Login failed: {}", e);
            match e {
                DashboardError::Status { .. } => INVALID_CREDENTIALS.to_string(),
                DashboardError::Transport(_) | DashboardError::Timeout => {
                    SERVER_UNREACHABLE.to_string()
                }
                _ => LOGIN_FAILED.to_string(),
            }
        })?;

        let token = response
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| LOGIN_FAILED.to_string())?;

        self.session.set(token).await.map_err(|e| e.user_message())
    }

    pub async fn logout(&mut self) {
        self.password.clear();
        if let Err(e) = self.session.clear().await {
            self.error = Some(e.user_message());
        }
    }
}
