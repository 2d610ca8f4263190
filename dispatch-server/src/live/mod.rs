//! Live notification delivery — 实时通知分发

mod hub;
mod room;

pub use hub::{ConnectionId, NotificationHub, Session};
pub use room::{Room, is_reserved};
