//! Headless view models. Each one owns the state a screen renders and the
//! commands it issues; `render` turns them into terminal output.

pub mod app;
pub mod auth;
pub mod bots;
pub mod charts;
pub mod dashboard;
pub mod history;
pub mod notifications;
pub mod render;

pub use app::*;
pub use auth::*;
pub use bots::*;
pub use charts::*;
pub use dashboard::*;
pub use history::*;
pub use notifications::*;

use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

use crate::error::{DashboardError, Result};

/// Lifetime of a mounted view.
///
/// Calls run through [`ViewScope::run`] resolve to `Cancelled` once the
/// scope is cancelled, so an unmounted view never applies a late response.
#[derive(Clone)]
pub struct ViewScope {
    cancelled: Arc<watch::Sender<bool>>,
}

impl ViewScope {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            cancelled: Arc::new(tx),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.send_replace(true);
    }

    pub fn is_active(&self) -> bool {
        !*self.cancelled.borrow()
    }

    /// Starts `operation` only while the scope is active
    pub async fn run<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut cancelled = self.cancelled.subscribe();
        if *cancelled.borrow() {
            return Err(DashboardError::Cancelled);
        }

        tokio::select! {
            result = operation() => {
                if self.is_active() {
                    result
                } else {
                    Err(DashboardError::Cancelled)
                }
            }
            _ = cancelled.wait_for(|c| *c) => Err(DashboardError::Cancelled),
        }
    }
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}
