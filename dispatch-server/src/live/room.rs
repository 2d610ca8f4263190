//! Room names

use shared::message::{ROLE_ROOM_PREFIX, SELF_ROOM_PREFIX};
use shared::models::Role;
use std::fmt;

/// A broadcast group in the hub
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Room {
    /// `role:<role>`, joined implicitly by every handle of that role
    Role(Role),
    /// `self:<principal id>`, joined implicitly by every handle of that principal
    Identity(String),
    /// Anything else, joined explicitly
    Named(String),
}

impl Room {
    pub fn role(role: Role) -> Self {
        Room::Role(role)
    }

    pub fn identity(id: impl Into<String>) -> Self {
        Room::Identity(id.into())
    }

    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Room::Role(role) => write!(f, "{ROLE_ROOM_PREFIX}{role}"),
            Room::Identity(id) => write!(f, "{SELF_ROOM_PREFIX}{id}"),
            Room::Named(name) => f.write_str(name),
        }
    }
}

/// Rooms under the implicit prefixes; clients cannot join these by name
pub fn is_reserved(name: &str) -> bool {
    name.starts_with(ROLE_ROOM_PREFIX) || name.starts_with(SELF_ROOM_PREFIX)
}
