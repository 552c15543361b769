//! Per-interaction-model stream handler state machines (§4.5, component 6).
//!
//! Fire-and-forget and metadata push need no entry here: neither is ever
//! registered in a [`super::StreamRegistry`] (§4.5: "fire-and-forget and
//! metadata push are stream-less; there is nothing to cancel or complete").
pub mod request_channel;
pub mod request_response;
pub mod request_stream;

pub use request_channel::RequestChannelHandler;
pub use request_response::{RequestResponseRequester, RequestResponseResponder};
pub use request_stream::{RequestStreamRequester, RequestStreamResponder};

use tokio::sync::mpsc::UnboundedSender;

use crate::error::RSocketResult;
use crate::frame::Frame;

/// Outbound frames a handler emits on its own (CANCEL, REQUEST_N, a
/// responder's reply) are pushed onto this sink rather than written directly,
/// so handlers stay transport-agnostic; `connection` owns the receiving half.
pub type OutboundSink = UnboundedSender<Frame>;

/// What the registry should do with a stream after one frame was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerEvent {
    Continue,
    Finished,
}

/// A live stream's state machine, tagged by interaction model rather than
/// dispatched through a trait object (§9: "replace runtime polymorphism with
/// a tagged variant of stream handlers").
pub enum StreamHandler {
    RequestResponseRequester(RequestResponseRequester),
    RequestResponseResponder(RequestResponseResponder),
    RequestStreamRequester(RequestStreamRequester),
    RequestStreamResponder(RequestStreamResponder),
    RequestChannel(RequestChannelHandler),
}

impl StreamHandler {
    pub fn handle_frame(&mut self, frame: Frame) -> RSocketResult<HandlerEvent> {
        match self {
            StreamHandler::RequestResponseRequester(h) => h.handle_frame(frame),
            StreamHandler::RequestResponseResponder(h) => h.handle_frame(frame),
            StreamHandler::RequestStreamRequester(h) => h.handle_frame(frame),
            StreamHandler::RequestStreamResponder(h) => h.handle_frame(frame),
            StreamHandler::RequestChannel(h) => h.handle_frame(frame),
        }
    }
}
