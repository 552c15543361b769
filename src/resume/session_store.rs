//! Resume session bookkeeping (§4.8): a server keeps a suspended session's
//! frame cache alive under its resume token for a bounded TTL so a
//! reconnecting client can recover it, grounded on the resume-token-keyed
//! expiring map pattern. Reimplemented on `std::time::Instant` rather than
//! pulling in an expiring-map crate, since the eviction rule here (TTL from
//! last touch) is a handful of lines.
use std::collections::HashMap;
use std::time::{Duration, Instant};

use bytes::Bytes;

use super::frame_cache::FrameCache;

/// A connection's state while it waits to be resumed.
pub struct Session {
    pub frame_cache: FrameCache,
    pub last_received_position: u64,
    touched_at: Instant,
}

impl Session {
    pub fn new() -> Session {
        Session {
            frame_cache: FrameCache::new(),
            last_received_position: 0,
            touched_at: Instant::now(),
        }
    }
}

/// Maps resume token -> suspended session, evicting entries untouched for
/// longer than `ttl`.
pub struct SessionStore {
    ttl: Duration,
    sessions: HashMap<Bytes, Session>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> SessionStore {
        SessionStore {
            ttl,
            sessions: HashMap::new(),
        }
    }

    pub fn register(&mut self, resume_token: Bytes, session: Session) {
        self.sessions.insert(resume_token, session);
    }

    /// Remove and return the session for `resume_token`, if one is both
    /// present and not yet expired. Expired entries are dropped as a side effect.
    pub fn take(&mut self, resume_token: &Bytes) -> Option<Session> {
        self.purge_expired();
        self.sessions.remove(resume_token)
    }

    pub fn touch(&mut self, resume_token: &Bytes) {
        if let Some(session) = self.sessions.get_mut(resume_token) {
            session.touched_at = Instant::now();
        }
    }

    fn purge_expired(&mut self) {
        let ttl = self.ttl;
        self.sessions.retain(|_, session| session.touched_at.elapsed() < ttl);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_registered_session_can_be_taken_back() {
        let mut store = SessionStore::new(Duration::from_secs(60));
        let token = Bytes::from_static(b"tok");
        store.register(token.clone(), Session::new());
        assert_eq!(store.len(), 1);
        assert!(store.take(&token).is_some());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn an_expired_session_cannot_be_taken() {
        let mut store = SessionStore::new(Duration::from_millis(1));
        let token = Bytes::from_static(b"tok");
        store.register(token.clone(), Session::new());
        std::thread::sleep(Duration::from_millis(10));
        assert!(store.take(&token).is_none());
    }
}
