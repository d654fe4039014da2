use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

use crate::error::{DashboardError, Result};
use crate::types::{Notification, NotificationId};

pub const MALFORMED_FRAME: &str = "Failed to process notification.";
pub const CONNECTION_ERROR: &str = "WebSocket connection error.";
pub const CONNECTION_CLOSED: &str = "Connection closed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
    Errored,
}

impl ConnectionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Errored)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Closed => write!(f, "closed"),
            ConnectionState::Errored => write!(f, "errored"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum FeedEvent {
    Added(Notification),
    Dismissed(NotificationId),
    StatusChanged(Option<String>),
    StateChanged(ConnectionState),
    /// The channel task gave up and will not reconnect
    ChannelEnded,
}

struct FeedData {
    items: VecDeque<Notification>,
    next_id: u64,
    status: Option<String>,
    state: ConnectionState,
    sealed: bool,
}

/// Newest-first list of notifications shared between a view and its channel task
#[derive(Clone)]
pub struct SharedFeed {
    inner: Arc<RwLock<FeedData>>,
    tx: broadcast::Sender<FeedEvent>,
}

impl SharedFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(RwLock::new(FeedData {
                items: VecDeque::new(),
                next_id: 1,
                status: None,
                state: ConnectionState::Connecting,
                sealed: false,
            })),
            tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.tx.subscribe()
    }

    /// Decodes a frame and prepends it. A malformed frame leaves the list
    /// as it was and only sets the status message.
    pub async fn accept_frame(&self, text: &str) -> Result<NotificationId> {
        let mut data = self.inner.write().await;
        if data.sealed {
            return Err(DashboardError::Cancelled);
        }

        let id = NotificationId(data.next_id);
        match Notification::from_frame(id, text) {
            Ok(notification) => {
                data.next_id += 1;
                data.items.push_front(notification.clone());
                debug!("Notification {} received", id);
                let _ = self.tx.send(FeedEvent::Added(notification));
                Ok(id)
            }
            Err(e) => Err(self.reject(&mut data, e)),
        }
    }

    /// Binary frames are accepted only when they hold valid UTF-8
    pub async fn accept_bytes(&self, bytes: &[u8]) -> Result<NotificationId> {
        match std::str::from_utf8(bytes) {
            Ok(text) => self.accept_frame(text).await,
            Err(e) => {
                let mut data = self.inner.write().await;
                if data.sealed {
                    return Err(DashboardError::Cancelled);
                }
                Err(self.reject(&mut data, DashboardError::Frame(e.to_string())))
            }
        }
    }

    fn reject(&self, data: &mut FeedData, err: DashboardError) -> DashboardError {
        warn!("Dropping malformed notification frame: {}", err);
        if data.status.as_deref() != Some(MALFORMED_FRAME) {
            data.status = Some(MALFORMED_FRAME.to_string());
            let _ = self.tx.send(FeedEvent::StatusChanged(data.status.clone()));
        }
        err
    }

    /// Removes exactly one notification; false if the id is unknown
    pub async fn dismiss(&self, id: NotificationId) -> bool {
        let mut data = self.inner.write().await;
        let Some(index) = data.items.iter().position(|n| n.id == id) else {
            return false;
        };
        data.items.remove(index);
        let _ = self.tx.send(FeedEvent::Dismissed(id));
        true
    }

    pub(crate) async fn set_state(&self, state: ConnectionState) {
        let mut data = self.inner.write().await;
        if data.sealed || data.state == state {
            return;
        }
        data.state = state;
        let _ = self.tx.send(FeedEvent::StateChanged(state));
    }

    pub(crate) async fn set_status(&self, status: Option<String>) {
        let mut data = self.inner.write().await;
        if data.sealed || data.status == status {
            return;
        }
        data.status = status;
        let _ = self.tx.send(FeedEvent::StatusChanged(data.status.clone()));
    }

    /// Marks the owning view as gone; the channel can no longer mutate the feed
    pub(crate) async fn seal(&self) {
        let mut data = self.inner.write().await;
        if !data.sealed {
            data.state = ConnectionState::Closed;
            data.sealed = true;
            let _ = self.tx.send(FeedEvent::StateChanged(ConnectionState::Closed));
        }
    }

    /// Starts a fresh mount: empty list, no status. Ids keep counting so
    /// they stay unique across mounts.
    pub(crate) async fn reset(&self) {
        let mut data = self.inner.write().await;
        data.items.clear();
        data.sealed = false;
        data.state = ConnectionState::Connecting;
        data.status = None;
    }

    pub(crate) fn ended(&self) {
        let _ = self.tx.send(FeedEvent::ChannelEnded);
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.inner.read().await.items.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.items.is_empty()
    }

    pub async fn status(&self) -> Option<String> {
        self.inner.read().await.status.clone()
    }

    pub async fn state(&self) -> ConnectionState {
        self.inner.read().await.state
    }
}

impl Default for SharedFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(message: &str) -> String {
        serde_json::json!({ "message": message }).to_string()
    }

    async fn messages(feed: &SharedFeed) -> Vec<String> {
        feed.notifications()
            .await
            .iter()
            .map(|n| n.display_text())
            .collect()
    }

    #[tokio::test]
    async fn test_frames_are_prepended() {
        let feed = SharedFeed::new();
        for i in 0..5 {
            feed.accept_frame(&frame(&format!("n{}", i))).await.unwrap();
        }

        assert_eq!(feed.len().await, 5);
        assert_eq!(messages(&feed).await, vec!["n4", "n3", "n2", "n1", "n0"]);

        let ids: Vec<u64> = feed.notifications().await.iter().map(|n| n.id.0).collect();
        assert!(ids.windows(2).all(|w| w[0] > w[1]));
    }

    #[tokio::test]
    async fn test_malformed_frame_keeps_list_and_feed_alive() {
        let feed = SharedFeed::new();
        feed.accept_frame(&frame("first")).await.unwrap();
        feed.accept_frame(&frame("second")).await.unwrap();

        assert!(feed.accept_frame("{not json").await.is_err());
        assert_eq!(feed.len().await, 2);
        assert_eq!(feed.status().await.as_deref(), Some(MALFORMED_FRAME));

        feed.accept_frame(&frame("third")).await.unwrap();
        assert_eq!(messages(&feed).await, vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn test_dismiss_removes_exactly_one() {
        let feed = SharedFeed::new();
        let mut ids = Vec::new();
        for name in ["a", "b", "c", "d"] {
            ids.push(feed.accept_frame(&frame(name)).await.unwrap());
        }

        assert!(feed.dismiss(ids[1]).await);
        assert_eq!(messages(&feed).await, vec!["d", "c", "a"]);

        assert!(!feed.dismiss(ids[1]).await);
        assert!(!feed.dismiss(NotificationId(999)).await);
        assert_eq!(feed.len().await, 3);
    }

    #[tokio::test]
    async fn test_ids_unique_for_identical_frames() {
        let feed = SharedFeed::new();
        let a = feed.accept_frame(&frame("same")).await.unwrap();
        let b = feed.accept_frame(&frame("same")).await.unwrap();
        assert_ne!(a, b);

        assert!(feed.dismiss(a).await);
        assert_eq!(feed.notifications().await[0].id, b);
    }

    #[tokio::test]
    async fn test_sealed_feed_rejects_channel_mutations() {
        let feed = SharedFeed::new();
        feed.accept_frame(&frame("kept")).await.unwrap();
        feed.seal().await;

        assert!(matches!(
            feed.accept_frame(&frame("late")).await,
            Err(DashboardError::Cancelled)
        ));
        feed.set_status(Some(CONNECTION_ERROR.to_string())).await;

        assert_eq!(feed.len().await, 1);
        assert_eq!(feed.status().await, None);
        assert_eq!(feed.state().await, ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_binary_frames_need_valid_utf8() {
        let feed = SharedFeed::new();
        feed.accept_bytes(frame("bin").as_bytes()).await.unwrap();

        let invalid = b"{\"message\":\"bad \xFF\"}";
        assert!(matches!(
            feed.accept_bytes(invalid).await,
            Err(DashboardError::Frame(_))
        ));
        assert_eq!(messages(&feed).await, vec!["bin"]);
        assert_eq!(feed.status().await.as_deref(), Some(MALFORMED_FRAME));
    }

    #[tokio::test]
    async fn test_reset_starts_empty_with_fresh_ids() {
        let feed = SharedFeed::new();
        let old = feed.accept_frame(&frame("old")).await.unwrap();
        feed.accept_frame("{bad").await.unwrap_err();
        feed.seal().await;

        feed.reset().await;
        assert!(feed.is_empty().await);
        assert_eq!(feed.status().await, None);
        assert_eq!(feed.state().await, ConnectionState::Connecting);

        let new = feed.accept_frame(&frame("new")).await.unwrap();
        assert!(new > old);
    }

    #[tokio::test]
    async fn test_events_are_broadcast() {
        let feed = SharedFeed::new();
        let mut events = feed.subscribe();

        let id = feed.accept_frame(&frame("hello")).await.unwrap();
        feed.dismiss(id).await;

        assert!(matches!(events.recv().await.unwrap(), FeedEvent::Added(n) if n.id == id));
        assert!(matches!(events.recv().await.unwrap(), FeedEvent::Dismissed(d) if d == id));
    }
}
