//! Room registry
//!
//! Concurrent directory of rooms keyed by name. Membership operations on a
//! room that does not exist are silent no-ops.

use super::Room;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use relay_core::PrincipalId;
use std::sync::Arc;
use thiserror::Error;

/// Room registry errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoomError {
    #[error("room already exists")]
    AlreadyExists { name: String },
}

impl RoomError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyExists { .. } => "ROOM_ALREADY_EXISTS",
        }
    }
}

/// Directory of named rooms
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: DashMap<String, Arc<Room>>,
}

impl RoomRegistry {
    /// Create a new room registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new room registry wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Create an empty room, failing if the name is taken
    pub fn create_room(&self, name: &str) -> Result<Arc<Room>, RoomError> {
        match self.rooms.entry(name.to_string()) {
            Entry::Occupied(_) => Err(RoomError::AlreadyExists {
                name: name.to_string(),
            }),
            Entry::Vacant(entry) => {
                let room = Arc::new(Room::new(name));
                entry.insert(room.clone());
                tracing::info!(room = %name, "Room created");
                Ok(room)
            }
        }
    }

    /// Look up a room by name
    pub fn get_room(&self, name: &str) -> Option<Arc<Room>> {
        let room = self.rooms.get(name).map(|r| r.value().clone());
        if room.is_none() {
            tracing::debug!(room = %name, "Room not found");
        }
        room
    }

    /// Look up a room, creating it on first reference
    pub fn get_or_create(&self, name: &str) -> Arc<Room> {
        self.rooms
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::info!(room = %name, "Room created");
                Arc::new(Room::new(name))
            })
            .value()
            .clone()
    }

    /// Delete a room if present
    pub fn delete_room(&self, name: &str) -> Option<Arc<Room>> {
        let removed = self.rooms.remove(name).map(|(_, room)| room);
        if removed.is_some() {
            tracing::info!(room = %name, "Room deleted");
        }
        removed
    }

    /// Add a member to a room; no-op if the room does not exist
    pub fn add_member(&self, name: &str, principal: PrincipalId) -> bool {
        self.get_room(name)
            .is_some_and(|room| room.add_member(principal))
    }

    /// Remove a member from a room; no-op if the room does not exist
    pub fn remove_member(&self, name: &str, principal: &str) -> bool {
        self.get_room(name)
            .is_some_and(|room| room.remove_member(principal))
    }

    /// Members of a room, empty if the room does not exist
    pub fn members(&self, name: &str) -> Vec<PrincipalId> {
        self.get_room(name)
            .map(|room| room.members())
            .unwrap_or_default()
    }

    pub fn names(&self) -> Vec<String> {
        self.rooms.iter().map(|r| r.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_room_rejects_taken_name() {
        let registry = RoomRegistry::new();
        registry.create_room("lobby").unwrap();

        let err = registry.create_room("lobby").unwrap_err();
        assert_eq!(err.to_string(), "room already exists");
        assert_eq!(err.code(), "ROOM_ALREADY_EXISTS");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_get_and_delete_room() {
        let registry = RoomRegistry::new();
        assert!(registry.get_room("lobby").is_none());

        let created = registry.create_room("lobby").unwrap();
        assert!(Arc::ptr_eq(&registry.get_room("lobby").unwrap(), &created));

        assert!(registry.delete_room("lobby").is_some());
        assert!(registry.delete_room("lobby").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_get_or_create_reuses_room() {
        let registry = RoomRegistry::new();
        let a = registry.get_or_create("lobby");
        let b = registry.get_or_create("lobby");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.names(), vec!["lobby".to_string()]);
    }

    #[test]
    fn test_member_ops_on_absent_room_are_noops() {
        let registry = RoomRegistry::new();
        assert!(!registry.add_member("ghost", PrincipalId::from("u1")));
        assert!(!registry.remove_member("ghost", "u1"));
        assert!(registry.members("ghost").is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_add_then_remove_member() {
        let registry = RoomRegistry::new();
        registry.create_room("r").unwrap();

        assert!(registry.add_member("r", PrincipalId::from("u1")));
        assert!(registry.remove_member("r", "u1"));
        assert!(registry.members("r").is_empty());
        assert!(!registry.remove_member("r", "u1"));
    }

    #[test]
    fn test_concurrent_creates_yield_one_room() {
        let registry = Arc::new(RoomRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.create_room("r").is_ok())
            })
            .collect();

        let created = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(created, 1);
    }
}
