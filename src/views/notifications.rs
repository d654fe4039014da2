use tokio::sync::broadcast;
use tracing::info;

use crate::notifications::{ChannelHandle, ConnectionState, FeedEvent, ReconnectPolicy, SharedFeed};
use crate::types::{Notification, NotificationId};

/// Live notification list backed by one channel per mount
pub struct NotificationsView {
    url: String,
    policy: ReconnectPolicy,
    feed: SharedFeed,
    handle: Option<ChannelHandle>,
}

impl NotificationsView {
    pub fn new(url: impl Into<String>, policy: ReconnectPolicy) -> Self {
        Self {
            url: url.into(),
            policy,
            feed: SharedFeed::new(),
            handle: None,
        }
    }

    /// Opens the channel unless one is already owned by this view. Each
    /// mount starts with an empty list.
    pub async fn mount(&mut self) {
        if self.handle.is_some() {
            return;
        }
        self.feed.reset().await;
        info!("Mounting notifications for {}", self.url);
        self.handle = Some(ChannelHandle::open(
            self.url.clone(),
            self.policy,
            self.feed.clone(),
        ));
    }

    /// Closes the channel and waits for the close frame to go out
    pub async fn unmount(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.close().await;
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_closed())
    }

    /// True when the channel stopped by itself and will not reconnect
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.feed.subscribe()
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.feed.notifications().await
    }

    pub async fn status(&self) -> Option<String> {
        self.feed.status().await
    }

    pub async fn state(&self) -> ConnectionState {
        self.feed.state().await
    }

    pub async fn dismiss(&self, id: NotificationId) -> bool {
        self.feed.dismiss(id).await
    }
}
