//! Notification socket protocol
//!
//! Every frame is JSON `{"event": <name>, "data": <payload>}`.
//!
//! - Client → Server: [`ClientEvent`] (`join-room`, `leave-room`)
//! - Server → Client: [`ServerEvent`] (`notification`, `error`)

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;

pub mod notification;
pub use notification::*;

/// Room prefix for role-scoped broadcasts (`role:kitchen`)
pub const ROLE_ROOM_PREFIX: &str = "role:";
/// Room prefix for identity-scoped delivery (`self:<principal id>`)
pub const SELF_ROOM_PREFIX: &str = "self:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRequest {
    pub room: String,
}

/// Client → server events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    JoinRoom(RoomRequest),
    LeaveRoom(RoomRequest),
}

/// Server → client events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    Notification(Notification),
    Error { code: ErrorCode, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_wire_format() {
        let ev: ClientEvent =
            serde_json::from_str(r#"{"event":"join-room","data":{"room":"promo"}}"#).unwrap();
        assert_eq!(
            ev,
            ClientEvent::JoinRoom(RoomRequest {
                room: "promo".to_string()
            })
        );

        let ev: ClientEvent =
            serde_json::from_str(r#"{"event":"leave-room","data":{"room":"promo"}}"#).unwrap();
        assert!(matches!(ev, ClientEvent::LeaveRoom(_)));
    }

    #[test]
    fn test_server_event_wire_format() {
        let ev = ServerEvent::Notification(Notification::system_alert(
            "maintenance",
            AlertLevel::Warning,
        ));
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "notification");
        assert_eq!(json["data"]["type"], "system_alert");
        assert_eq!(json["data"]["level"], "warning");
    }
}
