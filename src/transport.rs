//! The abstract transport contract (§6): anything that can carry a duplex
//! stream of already-decoded frames. Concrete transports (TCP, websocket,
//! QUIC, ...) are out of scope here and live in their own crates, the same
//! way the wire codec (`codec`) is kept separate from any particular socket
//! type; this trait is the seam between them.
use futures::{Sink, Stream};

use crate::error::RSocketError;
use crate::frame::Frame;

/// A duplex channel of RSocket frames. Any `Stream<Item = Result<Frame, _>>`
/// that is also a `Sink<Frame>` qualifies automatically; a connection only
/// ever talks to this trait, never to a concrete transport.
pub trait FrameTransport:
    Stream<Item = Result<Frame, RSocketError>> + Sink<Frame, Error = RSocketError> + Send + Unpin
{
}

impl<T> FrameTransport for T where
    T: Stream<Item = Result<Frame, RSocketError>> + Sink<Frame, Error = RSocketError> + Send + Unpin
{
}
