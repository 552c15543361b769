//! Stream registry (§4.4): maps stream id -> handler, and owns this
//! connection's half of the id space via a [`StreamIdSequence`].
use std::collections::HashMap;

use crate::error::RSocketResult;

use super::stream_id::{Parity, StreamIdSequence};

/// Generic over the handler type so the registry has no dependency on any
/// particular interaction model; `streams::handlers` supplies the concrete `H`.
pub struct StreamRegistry<H> {
    sequence: StreamIdSequence,
    handlers: HashMap<u32, H>,
}

impl<H> StreamRegistry<H> {
    pub fn new(parity: Parity) -> StreamRegistry<H> {
        StreamRegistry {
            sequence: StreamIdSequence::new(parity),
            handlers: HashMap::new(),
        }
    }

    /// Allocate a fresh id of this endpoint's parity and register `handler` under it.
    pub fn allocate(&mut self, handler: H) -> RSocketResult<u32> {
        let handlers = &self.handlers;
        let id = self.sequence.allocate(|candidate| handlers.contains_key(&candidate))?;
        self.handlers.insert(id, handler);
        Ok(id)
    }

    /// Register a handler under an id chosen by the peer (responder side).
    pub fn insert(&mut self, id: u32, handler: H) {
        self.handlers.insert(id, handler);
    }

    /// Reserve an id of this endpoint's parity without yet knowing the
    /// handler to store under it (the handler often needs the id itself to
    /// build, e.g. to address its own CANCEL/REQUEST_N frames). Follow up
    /// with `insert`.
    pub fn reserve(&mut self) -> RSocketResult<u32> {
        let handlers = &self.handlers;
        self.sequence.allocate(|candidate| handlers.contains_key(&candidate))
    }

    pub fn get(&self, id: u32) -> Option<&H> {
        self.handlers.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut H> {
        self.handlers.get_mut(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.handlers.contains_key(&id)
    }

    /// Remove and release `id`. A stream's id becomes reusable by `allocate`
    /// the instant this is called (§4.4).
    pub fn finish(&mut self, id: u32) -> Option<H> {
        self.handlers.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.handlers.keys().copied()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = (u32, H)> + '_ {
        self.handlers.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_then_finish_frees_the_id() {
        let mut registry: StreamRegistry<&'static str> = StreamRegistry::new(Parity::Client);
        let id = registry.allocate("requester").unwrap();
        assert_eq!(id, 1);
        assert!(registry.contains(1));
        assert_eq!(registry.finish(1), Some("requester"));
        assert!(!registry.contains(1));
    }

    #[test]
    fn no_two_concurrent_streams_share_an_id() {
        let mut registry: StreamRegistry<&'static str> = StreamRegistry::new(Parity::Client);
        let a = registry.allocate("a").unwrap();
        let b = registry.allocate("b").unwrap();
        assert_ne!(a, b);
    }
}
