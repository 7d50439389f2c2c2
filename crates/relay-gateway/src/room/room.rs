//! A named room and its membership

use parking_lot::Mutex;
use relay_core::PrincipalId;

/// A named set of member principals behind a per-room lock
#[derive(Debug)]
pub struct Room {
    name: String,
    members: Mutex<Vec<PrincipalId>>,
}

impl Room {
    /// Create an empty room
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a member; false if they were already present
    pub fn add_member(&self, principal: PrincipalId) -> bool {
        let mut members = self.members.lock();
        if members.contains(&principal) {
            return false;
        }
        members.push(principal);
        true
    }

    /// Remove the first matching member; false if they were not present
    pub fn remove_member(&self, principal: &str) -> bool {
        let mut members = self.members.lock();
        match members.iter().position(|m| m.as_str() == principal) {
            Some(index) => {
                members.remove(index);
                true
            }
            None => false,
        }
    }

    /// Snapshot of the current members
    pub fn members(&self) -> Vec<PrincipalId> {
        self.members.lock().clone()
    }

    pub fn contains(&self, principal: &str) -> bool {
        self.members.lock().iter().any(|m| m.as_str() == principal)
    }

    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.lock().is_empty()
    }
}
