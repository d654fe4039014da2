pub mod bot;
pub mod history;
pub mod market;
pub mod notification;

pub use bot::*;
pub use history::*;
pub use market::*;
pub use notification::*;
