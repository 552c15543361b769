//! Per-connection outbound frame log used to replay frames a peer never
//! acknowledged across a RESUME (§4.8). Grounded on the position-keyed
//! ordered log pattern: positions are assigned densely and increase by one
//! per stored frame, so a contiguous range can always be replayed or purged.
use std::collections::VecDeque;

use crate::frame::Frame;

/// One stored frame plus the position it was assigned.
struct Entry {
    position: u64,
    frame: Frame,
}

/// Frames are appended as they're sent and purged once the peer confirms
/// receipt (via its own position in a KEEPALIVE or RESUME) up to some position.
#[derive(Default)]
pub struct FrameCache {
    entries: VecDeque<Entry>,
    last_position: u64,
}

impl FrameCache {
    pub fn new() -> FrameCache {
        FrameCache {
            entries: VecDeque::new(),
            last_position: 0,
        }
    }

    /// Append `frame`, returning the position it was assigned.
    pub fn store(&mut self, frame: Frame) -> u64 {
        self.last_position += 1;
        self.entries.push_back(Entry {
            position: self.last_position,
            frame,
        });
        self.last_position
    }

    pub fn last_position(&self) -> u64 {
        self.last_position
    }

    /// The oldest position still retained, or `last_position` if the cache is empty.
    pub fn earliest_position(&self) -> u64 {
        self.entries.front().map(|e| e.position).unwrap_or(self.last_position)
    }

    /// Whether `position` can still be replayed from, i.e. falls within the
    /// retained window (inclusive of one past the last stored frame, meaning
    /// "the peer has everything").
    pub fn contains(&self, position: u64) -> bool {
        position == self.last_position || (position >= self.earliest_position() && position <= self.last_position)
    }

    /// All frames stored strictly after `first_position`, in order.
    pub fn frames_from(&self, first_position: u64) -> impl Iterator<Item = &Frame> {
        self.entries
            .iter()
            .filter(move |e| e.position > first_position)
            .map(|e| &e.frame)
    }

    /// Drop every frame at or before `last_position`; the peer has confirmed
    /// receipt of everything up to there.
    pub fn clear_until(&mut self, last_position: u64) {
        while let Some(front) = self.entries.front() {
            if front.position <= last_position {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Cancel;

    fn frame(id: u32) -> Frame {
        Cancel::new(id, 0)
    }

    #[test]
    fn store_assigns_increasing_positions() {
        let mut cache = FrameCache::new();
        assert_eq!(cache.store(frame(1)), 1);
        assert_eq!(cache.store(frame(2)), 2);
        assert_eq!(cache.last_position(), 2);
    }

    #[test]
    fn frames_from_replays_only_the_unacknowledged_tail() {
        let mut cache = FrameCache::new();
        cache.store(frame(1));
        cache.store(frame(2));
        cache.store(frame(3));
        let replayed: Vec<u32> = cache.frames_from(1).map(|f| f.get_stream_id()).collect();
        assert_eq!(replayed, vec![2, 3]);
    }

    #[test]
    fn clear_until_purges_acknowledged_frames() {
        let mut cache = FrameCache::new();
        cache.store(frame(1));
        cache.store(frame(2));
        cache.clear_until(1);
        assert_eq!(cache.earliest_position(), 2);
        assert!(!cache.contains(1));
        assert!(cache.contains(2));
    }
}
