//! NotificationHub — 认证后按 room 分发通知
//!
//! ```text
//! connect(token) ──→ IdentityResolver ──→ Principal
//!       │
//!       ▼
//! NotificationHub
//!   ├── connections: handle id → (principal, rooms, mpsc::Sender)
//!   ├── identities:  principal id → handle ids   (同一身份可多设备)
//!   └── rooms:       room name → handle ids
//!         │
//!         ▼
//! publish_to_room / publish_to_identity ──try_send──→ socket task
//! ```
//!
//! 推送不会等待慢连接或已断开的连接：每个 handle 一个有界队列，
//! 队列满或已关闭时直接丢弃该消息。

use dashmap::DashMap;
use shared::message::{Notification, ServerEvent};
use shared::models::{Principal, Role};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

use super::room::{Room, is_reserved};
use crate::auth::{AuthError, IdentityResolver};
use crate::error::{DispatchError, DispatchResult};

/// Per-handle outbound queue length
const CONNECTION_QUEUE_CAPACITY: usize = 64;

pub type ConnectionId = u64;

struct Connection {
    principal: Principal,
    rooms: HashSet<String>,
    tx: mpsc::Sender<ServerEvent>,
}

struct HubInner {
    identity: Arc<dyn IdentityResolver>,
    connections: DashMap<ConnectionId, Connection>,
    identities: DashMap<String, HashSet<ConnectionId>>,
    rooms: DashMap<String, HashSet<ConnectionId>>,
    next_id: AtomicU64,
}

#[derive(Clone)]
pub struct NotificationHub {
    inner: Arc<HubInner>,
}

/// A live, registered handle
///
/// Dropping the session unregisters it from the hub.
pub struct Session {
    id: ConnectionId,
    principal: Principal,
    rx: mpsc::Receiver<ServerEvent>,
    hub: NotificationHub,
}

impl Session {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Next outbound event; `None` once the hub dropped this handle
    pub async fn recv(&mut self) -> Option<ServerEvent> {
        self.rx.recv().await
    }

    /// Non-blocking variant of [`Session::recv`]
    pub fn try_recv(&mut self) -> Option<ServerEvent> {
        self.rx.try_recv().ok()
    }

    pub fn join(&self, room: &str) -> DispatchResult<()> {
        self.hub.join_room(self.id, room)
    }

    pub fn leave(&self, room: &str) {
        self.hub.leave_room(self.id, room)
    }

    pub fn rooms(&self) -> Vec<String> {
        self.hub.rooms_of(self.id)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.hub.disconnect(self.id);
    }
}

impl NotificationHub {
    pub fn new(identity: Arc<dyn IdentityResolver>) -> Self {
        Self {
            inner: Arc::new(HubInner {
                identity,
                connections: DashMap::new(),
                identities: DashMap::new(),
                rooms: DashMap::new(),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Authenticate a handshake credential and register the handle
    ///
    /// A missing or rejected credential refuses the connection outright.
    pub async fn connect(&self, token: Option<&str>) -> DispatchResult<Session> {
        let Some(token) = token else {
            tracing::warn!("Notification connection refused: no credential");
            return Err(AuthError::Missing.into());
        };
        let principal = match self.inner.identity.resolve(token).await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "Notification connection refused");
                return Err(e.into());
            }
        };
        Ok(self.register(principal))
    }

    /// Register an already-authenticated principal
    pub fn register(&self, principal: Principal) -> Session {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(CONNECTION_QUEUE_CAPACITY);

        let implicit = [
            Room::role(principal.role).name(),
            Room::identity(principal.id.clone()).name(),
        ];

        self.inner.connections.insert(
            id,
            Connection {
                principal: principal.clone(),
                rooms: implicit.iter().cloned().collect(),
                tx,
            },
        );
        self.inner
            .identities
            .entry(principal.id.clone())
            .or_default()
            .insert(id);
        for room in implicit {
            self.inner.rooms.entry(room).or_default().insert(id);
        }

        tracing::info!(
            connection_id = id,
            principal_id = %principal.id,
            role = %principal.role,
            "Notification handle registered"
        );

        Session {
            id,
            principal,
            rx,
            hub: self.clone(),
        }
    }

    /// Remove a handle from the registry and every room it was in
    pub fn disconnect(&self, id: ConnectionId) {
        let Some((_, conn)) = self.inner.connections.remove(&id) else {
            return;
        };

        self.inner
            .identities
            .remove_if_mut(&conn.principal.id, |_, handles| {
                handles.remove(&id);
                handles.is_empty()
            });
        for room in &conn.rooms {
            self.inner.rooms.remove_if_mut(room, |_, members| {
                members.remove(&id);
                members.is_empty()
            });
        }

        tracing::info!(
            connection_id = id,
            principal_id = %conn.principal.id,
            "Notification handle disconnected"
        );
    }

    /// Join an explicit room
    ///
    /// Reserved `role:`/`self:` names are refused unless they are one of the
    /// handle's own implicit rooms (which it is already in).
    pub fn join_room(&self, id: ConnectionId, room: &str) -> DispatchResult<()> {
        let room = room.trim();
        if room.is_empty() {
            return Err(DispatchError::Validation("room name is required".to_string()));
        }

        {
            let mut conn = self
                .inner
                .connections
                .get_mut(&id)
                .ok_or_else(|| DispatchError::Unauthenticated("connection closed".to_string()))?;
            if is_reserved(room) {
                if conn.rooms.contains(room) {
                    return Ok(());
                }
                tracing::warn!(connection_id = id, room, "Join of reserved room refused");
                return Err(DispatchError::Unauthorized(format!(
                    "room {room} is reserved"
                )));
            }
            conn.rooms.insert(room.to_string());
            // Registered while the connection entry is still locked, so a
            // concurrent disconnect cannot miss this membership
            self.inner.rooms.entry(room.to_string()).or_default().insert(id);
        }

        tracing::debug!(connection_id = id, room, "Joined room");
        Ok(())
    }

    /// Leave an explicit room. Implicit rooms cannot be left.
    pub fn leave_room(&self, id: ConnectionId, room: &str) {
        let room = room.trim();
        if is_reserved(room) {
            tracing::debug!(connection_id = id, room, "Leave of implicit room ignored");
            return;
        }

        let removed = self
            .inner
            .connections
            .get_mut(&id)
            .map(|mut conn| conn.rooms.remove(room))
            .unwrap_or(false);
        if removed {
            self.inner.rooms.remove_if_mut(room, |_, members| {
                members.remove(&id);
                members.is_empty()
            });
            tracing::debug!(connection_id = id, room, "Left room");
        }
    }

    fn deliver(&self, targets: Vec<ConnectionId>, notification: &Notification) -> usize {
        let mut delivered = 0;
        for id in targets {
            let Some(conn) = self.inner.connections.get(&id) else {
                continue;
            };
            match conn
                .tx
                .try_send(ServerEvent::Notification(notification.clone()))
            {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(connection_id = id, "Notification dropped: queue full");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!(connection_id = id, "Notification dropped: handle closed");
                }
            }
        }
        delivered
    }

    /// Deliver to every live handle in `room`. Returns how many accepted it.
    pub fn publish_to_room(&self, room: &str, notification: &Notification) -> usize {
        let targets: Vec<ConnectionId> = self
            .inner
            .rooms
            .get(room)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default();
        let delivered = self.deliver(targets, notification);
        tracing::debug!(room, delivered, kind = ?notification.kind, "Published to room");
        delivered
    }

    /// Deliver to every handle registered under `principal_id`
    pub fn publish_to_identity(&self, principal_id: &str, notification: &Notification) -> usize {
        let targets: Vec<ConnectionId> = self
            .inner
            .identities
            .get(principal_id)
            .map(|handles| handles.iter().copied().collect())
            .unwrap_or_default();
        self.deliver(targets, notification)
    }

    pub fn broadcast_to_role(&self, role: Role, notification: &Notification) -> usize {
        self.publish_to_room(&Room::role(role).name(), notification)
    }

    /// Distinct principals with at least one live handle
    pub fn connected_principals(&self) -> Vec<Principal> {
        let mut seen = HashSet::new();
        self.inner
            .connections
            .iter()
            .filter(|c| seen.insert(c.principal.id.clone()))
            .map(|c| c.principal.clone())
            .collect()
    }

    /// Live handles held by principals of `role`
    pub fn connections_by_role(&self, role: Role) -> usize {
        self.inner
            .connections
            .iter()
            .filter(|c| c.principal.role == role)
            .count()
    }

    pub fn connection_count(&self) -> usize {
        self.inner.connections.len()
    }

    pub fn handles_of(&self, principal_id: &str) -> usize {
        self.inner
            .identities
            .get(principal_id)
            .map(|h| h.len())
            .unwrap_or(0)
    }

    pub fn rooms_of(&self, id: ConnectionId) -> Vec<String> {
        let mut rooms: Vec<String> = self
            .inner
            .connections
            .get(&id)
            .map(|c| c.rooms.iter().cloned().collect())
            .unwrap_or_default();
        rooms.sort();
        rooms
    }

    pub fn room_size(&self, room: &str) -> usize {
        self.inner.rooms.get(room).map(|m| m.len()).unwrap_or(0)
    }
}
