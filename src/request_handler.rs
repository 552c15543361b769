//! The application-facing contract (§6): implement `RequestHandler` to
//! answer requests arriving on a connection. `BaseRequestHandler` supplies
//! the same "reject everything by default" defaults as the grounding source,
//! so an application only overrides the interaction models it actually serves.
use futures::future::BoxFuture;

use crate::error::{RSocketError, RSocketResult};
use crate::extension::CompositeMetadata;
use crate::frame::Payload;
use crate::reactive::{Publisher, Subscriber};

/// One connection's application logic. Every method has a default that
/// rejects or ignores, so implementations only need to override what they
/// actually serve (§6: "a handler that implements nothing is a valid, if
/// useless, handler").
pub trait RequestHandler: Send {
    fn on_setup(&mut self, data_mime_type: &str, metadata_mime_type: &str, payload: Payload) -> RSocketResult<()> {
        let _ = (data_mime_type, metadata_mime_type, payload);
        Ok(())
    }

    fn on_metadata_push(&mut self, metadata: Payload) {
        let _ = metadata;
    }

    fn request_fire_and_forget(&mut self, payload: Payload) {
        let _ = payload;
    }

    fn request_response(&mut self, payload: Payload) -> BoxFuture<'static, RSocketResult<Payload>> {
        let _ = payload;
        Box::pin(async { Err(not_implemented()) })
    }

    fn request_stream(&mut self, payload: Payload) -> RSocketResult<Box<dyn Publisher>> {
        let _ = payload;
        Err(not_implemented())
    }

    /// Returns the local publisher to drain into the requester (the responder's
    /// own outgoing half) and, optionally, a subscriber to receive the
    /// requester's items (the responder's incoming half). `None` for the
    /// subscriber means this handler doesn't care about the remote items.
    fn request_channel(
        &mut self,
        payload: Payload,
    ) -> RSocketResult<(Box<dyn Publisher>, Option<Box<dyn Subscriber>>)> {
        let _ = payload;
        Err(not_implemented())
    }

    fn on_error(&mut self, error: &RSocketError) {
        log::error!("unhandled connection error: {}", error);
    }

    fn parse_composite_metadata(&self, metadata: &bytes::Bytes) -> RSocketResult<CompositeMetadata> {
        CompositeMetadata::parse(metadata)
    }
}

fn not_implemented() -> RSocketError {
    RSocketError::Stream(crate::error::StreamErrorKind::Rejected, None)
}

/// A handler that rejects every request; useful as a base to override
/// selectively, or as a placeholder while a connection is being assembled.
#[derive(Default)]
pub struct BaseRequestHandler;

impl RequestHandler for BaseRequestHandler {}
