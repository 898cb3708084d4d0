//! The map of live sessions, keyed by consumer-chosen id.

use std::collections::HashMap;

use conduit_common::{Geometry, SessionId};
use tracing::info;

use crate::session::ProcessSession;

#[derive(Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, ProcessSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The session for `id`, created unspawned at `geometry` if absent.
    pub fn get_or_create(&mut self, id: &SessionId, geometry: Geometry) -> &mut ProcessSession {
        self.sessions
            .entry(id.clone())
            .or_insert_with(|| ProcessSession::new(id.clone(), geometry))
    }

    pub fn get(&self, id: &SessionId) -> Option<&ProcessSession> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &SessionId) -> Option<&mut ProcessSession> {
        self.sessions.get_mut(id)
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    /// Kill and forget a session. Returns the removed entry.
    pub fn remove(&mut self, id: &SessionId) -> Option<ProcessSession> {
        let mut session = self.sessions.remove(id)?;
        session.kill();
        session.unbind();
        Some(session)
    }

    pub fn all(&self) -> impl Iterator<Item = &ProcessSession> {
        self.sessions.values()
    }

    /// Ids in sorted order.
    pub fn ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn active_count(&self) -> usize {
        self.sessions.values().filter(|s| s.is_active()).count()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Kill every process and clear the map. Safe to call repeatedly.
    /// Returns how many processes were running.
    pub fn kill_all(&mut self) -> usize {
        let active = self.active_count();
        for session in self.sessions.values_mut() {
            session.kill();
        }
        self.sessions.clear();
        if active > 0 {
            info!(count = active, "All sessions killed");
        }
        active
    }
}
