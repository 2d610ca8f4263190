//! Shared types for the dispatch service
//!
//! Domain models, the notification socket protocol and the unified error
//! system used by the server and by client tooling.

pub mod error;
pub mod message;
pub mod models;
pub mod util;

pub use message::{ClientEvent, Notification, NotificationKind, ServerEvent};
pub use models::{Order, OrderStatus, Payment, PaymentStatus, PaymentType, Principal, Role};
