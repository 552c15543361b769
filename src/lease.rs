//! Lease-based admission control (§4.7, component 9): a peer that sent
//! `honor_lease` in SETUP may not issue a new request until it holds an
//! unexpired LEASE with remaining budget; exhausting the budget is a local
//! rejection, not a round trip to the peer.
//!
//! Grounded on the `SingleLeasePublisher`/`DefinedLease` pairing used in the
//! lease test suite: a lease carries a request-count budget and a TTL, and a
//! fresh LEASE frame always replaces whatever lease was outstanding.
use std::time::{Duration, Instant};

use crate::error::{RSocketError, RSocketResult};
use crate::frame::Lease as LeaseFrame;

/// The locally held budget granted by the peer's most recent LEASE frame.
#[derive(Debug, Clone, Copy)]
struct LeaseState {
    remaining_requests: u32,
    expires_at: Instant,
}

impl LeaseState {
    fn from_frame(frame: &LeaseFrame) -> LeaseState {
        LeaseState {
            remaining_requests: frame.get_number_of_requests(),
            expires_at: Instant::now() + Duration::from_millis(frame.get_time_to_live_millis() as u64),
        }
    }

    fn is_valid(&self) -> bool {
        self.remaining_requests > 0 && Instant::now() < self.expires_at
    }
}

/// Per-connection lease bookkeeping. A connection that never sent
/// `honor_lease` in SETUP admits every request unconditionally (§4.7: lease
/// is opt-in).
pub struct LeaseTracker {
    honor_lease: bool,
    current: Option<LeaseState>,
}

impl LeaseTracker {
    pub fn new(honor_lease: bool) -> LeaseTracker {
        LeaseTracker {
            honor_lease,
            current: None,
        }
    }

    /// A LEASE frame arrived from the peer; it replaces any outstanding lease.
    pub fn on_lease(&mut self, frame: &LeaseFrame) {
        self.current = Some(LeaseState::from_frame(frame));
    }

    /// Call before issuing a new request-stream-initiating frame. Consumes
    /// one unit of budget on success.
    pub fn admit_request(&mut self) -> RSocketResult<()> {
        if !self.honor_lease {
            return Ok(());
        }
        match &mut self.current {
            Some(state) if state.is_valid() => {
                state.remaining_requests -= 1;
                Ok(())
            }
            _ => Err(RSocketError::Rejected(
                "no valid lease outstanding for this connection".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lease_body(ttl_millis: u32, count: u32) -> LeaseFrame {
        let frame = LeaseFrame::builder(0, 0)
            .set_time_to_live_millis(ttl_millis)
            .set_number_of_requests(count)
            .build();
        match frame.into_body() {
            crate::frame::Body::Lease(lease) => lease,
            _ => unreachable!(),
        }
    }

    #[test]
    fn connections_without_honor_lease_always_admit() {
        let mut tracker = LeaseTracker::new(false);
        assert!(tracker.admit_request().is_ok());
        assert!(tracker.admit_request().is_ok());
    }

    #[test]
    fn honor_lease_rejects_until_a_lease_arrives() {
        let mut tracker = LeaseTracker::new(true);
        assert!(tracker.admit_request().is_err());
    }

    #[test]
    fn exhausting_the_request_budget_rejects_further_requests() {
        let mut tracker = LeaseTracker::new(true);
        tracker.on_lease(&lease_body(30_000, 2));
        assert!(tracker.admit_request().is_ok());
        assert!(tracker.admit_request().is_ok());
        assert!(tracker.admit_request().is_err());
    }

    #[test]
    fn an_expired_lease_rejects_even_with_budget_left() {
        let mut tracker = LeaseTracker::new(true);
        tracker.on_lease(&lease_body(0, 10));
        std::thread::sleep(Duration::from_millis(5));
        assert!(tracker.admit_request().is_err());
    }

    #[test]
    fn a_fresh_lease_replaces_the_outstanding_one() {
        let mut tracker = LeaseTracker::new(true);
        tracker.on_lease(&lease_body(30_000, 1));
        tracker.on_lease(&lease_body(30_000, 5));
        for _ in 0..5 {
            assert!(tracker.admit_request().is_ok());
        }
        assert!(tracker.admit_request().is_err());
    }
}
