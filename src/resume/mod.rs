//! Connection resumption (§4.8, component 11): frame cache, session store,
//! and the RESUME/RESUME_OK handshake's validation rules.
pub mod frame_cache;
pub mod session_store;

pub use frame_cache::FrameCache;
pub use session_store::{Session, SessionStore};

use crate::error::{ConnectionErrorKind, RSocketError, RSocketResult};
use crate::frame::Resume;

/// Validate an incoming RESUME against the session it names.
///
/// Resolves the open question on a backwards-moving or already-purged
/// position the same way: if `last_received_server_position` names a point
/// this side can no longer replay from (purged, or never reached), the
/// resume is rejected outright rather than silently resuming from whatever
/// is available. A stale/incorrect resume position is a client bug or an
/// attacker probing state, not something to paper over.
pub fn validate_resume(session: &Session, frame: &Resume) -> RSocketResult<()> {
    let requested = frame.get_last_received_server_position();
    if !session.frame_cache.contains(requested) {
        return Err(RSocketError::Connection(
            ConnectionErrorKind::RejectedResume,
            None,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Cancel;
    use bytes::Bytes;

    fn resume_frame(last_received_server_position: u64) -> Resume {
        let frame = Resume::new(
            0,
            crate::frame::Version { major: 1, minor: 0 },
            Bytes::from_static(b"token"),
            last_received_server_position,
            0,
        );
        match frame.into_body() {
            crate::frame::Body::Resume(resume) => resume,
            _ => unreachable!(),
        }
    }

    #[test]
    fn resume_within_the_retained_window_is_accepted() {
        let mut session = Session::new();
        session.frame_cache.store(Cancel::new(1, 0));
        session.frame_cache.store(Cancel::new(2, 0));
        assert!(validate_resume(&session, &resume_frame(1)).is_ok());
    }

    #[test]
    fn resume_before_the_retained_window_is_rejected() {
        let mut session = Session::new();
        session.frame_cache.store(Cancel::new(1, 0));
        session.frame_cache.store(Cancel::new(2, 0));
        session.frame_cache.clear_until(1);
        let err = validate_resume(&session, &resume_frame(0)).unwrap_err();
        assert!(err.is_connection_fatal());
    }

    #[test]
    fn resume_past_everything_stored_is_rejected() {
        let session = Session::new();
        let err = validate_resume(&session, &resume_frame(5)).unwrap_err();
        assert!(err.is_connection_fatal());
    }
}
