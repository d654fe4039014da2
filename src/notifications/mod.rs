//! Live push notifications.
//!
//! A [`ChannelHandle`] owns one WebSocket connection and feeds decoded
//! frames into a [`SharedFeed`], which the notifications view reads and
//! the user prunes through `dismiss`.

pub mod channel;
pub mod feed;
pub mod reconnect;

pub use channel::*;
pub use feed::*;
pub use reconnect::*;
