use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, error, info, warn};

use super::feed::{ConnectionState, SharedFeed, CONNECTION_CLOSED, CONNECTION_ERROR};
use super::reconnect::ReconnectPolicy;
use crate::error::DashboardError;

enum Outcome {
    Unmounted,
    ServerClosed,
    Failed(DashboardError),
}

/// Owner of one live push connection (plus any reconnects its policy allows).
///
/// Dropping the handle also shuts the connection down; `close` additionally
/// waits until the close frame has been sent.
pub struct ChannelHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    feed: SharedFeed,
}

impl ChannelHandle {
    pub fn open(url: impl Into<String>, policy: ReconnectPolicy, feed: SharedFeed) -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let url = url.into();
        let task = tokio::spawn(run(url, policy, feed.clone(), shutdown_rx));

        Self {
            shutdown: Some(shutdown_tx),
            task: Some(task),
            feed,
        }
    }

    /// Terminates the connection. Calling it again is a no-op.
    pub async fn close(&mut self) {
        let Some(shutdown) = self.shutdown.take() else {
            return;
        };
        let _ = shutdown.send(());

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("Notification channel task failed: {}", e);
            }
        }
        self.feed.seal().await;
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_none()
    }

    /// True once the task stopped on its own (server close or error with no
    /// reconnect left) or after `close`
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |t| t.is_finished())
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

async fn run(
    url: String,
    policy: ReconnectPolicy,
    feed: SharedFeed,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut attempt = 0;

    loop {
        feed.set_state(ConnectionState::Connecting).await;
        info!("Connecting to notification channel: {}", url);

        let connected = tokio::select! {
            _ = &mut shutdown => {
                feed.seal().await;
                return;
            }
            result = connect_async(url.as_str()) => result,
        };

        let outcome = match connected {
            Ok((stream, _)) => {
                info!("Notification channel open");
                feed.set_state(ConnectionState::Open).await;
                feed.set_status(None).await;
                pump(stream, &feed, &mut shutdown).await
            }
            Err(e) => Outcome::Failed(e.into()),
        };

        match outcome {
            Outcome::Unmounted => {
                info!("Notification channel closed");
                feed.seal().await;
                return;
            }
            Outcome::ServerClosed => {
                info!("Notification channel closed by server");
                feed.set_status(Some(CONNECTION_CLOSED.to_string())).await;
                feed.set_state(ConnectionState::Closed).await;
            }
            Outcome::Failed(e) => {
                error!("Notification channel error: {}", e);
                feed.set_status(Some(CONNECTION_ERROR.to_string())).await;
                feed.set_state(ConnectionState::Errored).await;
            }
        }

        let Some(delay) = policy.next_delay(attempt) else {
            feed.ended();
            return;
        };
        attempt += 1;
        warn!(
            "Reconnecting notification channel in {:?} (attempt {}/{})",
            delay, attempt, policy.max_attempts
        );

        tokio::select! {
            _ = &mut shutdown => {
                feed.seal().await;
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

async fn pump<S>(stream: S, feed: &SharedFeed, shutdown: &mut oneshot::Receiver<()>) -> Outcome
where
    S: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Unpin,
{
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            _ = &mut *shutdown => {
                if let Err(e) = write.close().await {
                    debug!("Close handshake failed: {}", e);
                }
                return Outcome::Unmounted;
            }
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let _ = feed.accept_frame(&text).await;
                }
                Some(Ok(Message::Binary(bytes))) => {
                    let _ = feed.accept_bytes(&bytes).await;
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!("Close frame: {:?}", frame);
                    return Outcome::ServerClosed;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Outcome::Failed(e.into()),
                None => return Outcome::ServerClosed,
            }
        }
    }
}
