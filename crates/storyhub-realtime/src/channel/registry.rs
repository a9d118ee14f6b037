//! Broadcast group registry: one fan-out group per session.

use std::collections::HashSet;

use dashmap::DashMap;

use storyhub_core::types::id::{ConnectionId, SessionId};

/// Registry of the connections joined to each session's group.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    groups: DashMap<SessionId, HashSet<ConnectionId>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to a session group.
    pub fn join(&self, session_id: SessionId, conn_id: ConnectionId) {
        self.groups.entry(session_id).or_default().insert(conn_id);
    }

    /// Removes a connection, dropping the group once it is empty.
    pub fn leave(&self, session_id: SessionId, conn_id: ConnectionId) {
        if let Some(mut members) = self.groups.get_mut(&session_id) {
            members.remove(&conn_id);
            if members.is_empty() {
                drop(members);
                self.groups.remove_if(&session_id, |_, m| m.is_empty());
            }
        }
    }

    /// Removes the whole group, returning its former members.
    pub fn dissolve(&self, session_id: SessionId) -> Vec<ConnectionId> {
        self.groups
            .remove(&session_id)
            .map(|(_, members)| members.into_iter().collect())
            .unwrap_or_default()
    }

    /// Connection ids currently in a group.
    pub fn members(&self, session_id: SessionId) -> Vec<ConnectionId> {
        self.groups
            .get(&session_id)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn member_count(&self, session_id: SessionId) -> usize {
        self.groups.get(&session_id).map(|m| m.len()).unwrap_or(0)
    }

    /// Returns total number of live groups.
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_leave_and_cleanup() {
        let registry = ChannelRegistry::new();
        let session = SessionId::new();
        let (a, b) = (ConnectionId::new(), ConnectionId::new());

        registry.join(session, a);
        registry.join(session, b);
        assert_eq!(registry.member_count(session), 2);

        registry.leave(session, a);
        assert_eq!(registry.members(session), vec![b]);

        registry.leave(session, b);
        assert_eq!(registry.group_count(), 0);
    }

    #[test]
    fn test_dissolve_returns_members() {
        let registry = ChannelRegistry::new();
        let session = SessionId::new();
        let a = ConnectionId::new();
        registry.join(session, a);
        assert_eq!(registry.dissolve(session), vec![a]);
        assert!(registry.members(session).is_empty());
    }
}
