//! Request/response handler (§4.5): requester side fulfills a one-slot
//! completion, responder side sends exactly one terminal frame back.
//!
//! Grounded on the requester's `frame_received`/`cancel` shape; the single
//! outcome is modeled as a oneshot channel rather than a `Subscriber`, per the
//! design note on futures as stream outputs.
use tokio::sync::oneshot;

use super::{HandlerEvent, OutboundSink};
use crate::error::{RSocketError, RSocketResult};
use crate::fragmentation::Fragmenter;
use crate::frame::{
    Body, Cancel, Error as ErrorFrame, Frame, Payload, ERR_APPLICATION, FLAG_FOLLOW,
};

pub type ResponseSender = oneshot::Sender<RSocketResult<Payload>>;
pub type ResponseReceiver = oneshot::Receiver<RSocketResult<Payload>>;

pub struct RequestResponseRequester {
    stream_id: u32,
    outbound: OutboundSink,
    completion: Option<ResponseSender>,
}

impl RequestResponseRequester {
    pub fn new(stream_id: u32, outbound: OutboundSink) -> (RequestResponseRequester, ResponseReceiver) {
        let (tx, rx) = oneshot::channel();
        (
            RequestResponseRequester {
                stream_id,
                outbound,
                completion: Some(tx),
            },
            rx,
        )
    }

    pub fn handle_frame(&mut self, frame: Frame) -> RSocketResult<HandlerEvent> {
        let sender = match self.completion.take() {
            Some(sender) => sender,
            // Already resolved (e.g. by a local cancel racing the reply); drop silently.
            None => return Ok(HandlerEvent::Finished),
        };
        match frame.into_body() {
            Body::Payload(payload) => {
                let _ = sender.send(Ok(payload));
                Ok(HandlerEvent::Finished)
            }
            Body::Error(body) => {
                let _ = sender.send(Err(RSocketError::from_error_frame(self.stream_id, &body)));
                Ok(HandlerEvent::Finished)
            }
            other => Err(RSocketError::InvalidFrame(format!(
                "request/response requester cannot handle {:?}",
                other
            ))),
        }
    }

    /// The application gave up waiting: tell the peer and drop the slot.
    pub fn cancel(&mut self) {
        self.completion = None;
        let _ = self.outbound.send(Cancel::new(self.stream_id, 0));
    }
}

pub struct RequestResponseResponder {
    stream_id: u32,
    outbound: OutboundSink,
    responded: bool,
    mtu: usize,
}

impl RequestResponseResponder {
    pub fn new(stream_id: u32, outbound: OutboundSink, mtu: usize) -> RequestResponseResponder {
        RequestResponseResponder {
            stream_id,
            outbound,
            responded: false,
            mtu,
        }
    }

    /// The application's future resolved; send the reply, fragmenting it per
    /// `mtu` (§4.3) when it doesn't fit in one frame. ERROR replies are never
    /// fragmented: the spec reserves FOLLOWS-chaining for PAYLOAD/request-
    /// initiating frames, and error bodies are expected to stay small.
    pub fn respond(&mut self, result: RSocketResult<Payload>) -> HandlerEvent {
        self.responded = true;
        match result {
            Ok(payload) => {
                let (data, metadata) = payload.split();
                let mut chunks = Fragmenter::split(metadata, data, self.mtu).into_iter().peekable();
                while let Some(chunk) = chunks.next() {
                    let is_last = chunks.peek().is_none();
                    let flag = if is_last { 0 } else { FLAG_FOLLOW };
                    let mut builder = Payload::builder(self.stream_id, flag).set_all((chunk.data, chunk.metadata));
                    if is_last {
                        builder = builder.set_next(true).set_complete(true);
                    }
                    let _ = self.outbound.send(builder.build());
                }
            }
            Err(error) => {
                let code = error.error_code().unwrap_or(ERR_APPLICATION);
                let mut builder = ErrorFrame::builder(self.stream_id, 0, code);
                if let Some(data) = error.data() {
                    builder = builder.set_data(data.clone());
                }
                let _ = self.outbound.send(builder.build());
            }
        }
        HandlerEvent::Finished
    }

    /// The requester canceled before the application's future resolved. The
    /// reply is suppressed (`responded` stays false but the handler is torn
    /// down regardless), but the in-flight `BoxFuture` itself is not stopped:
    /// see the CANCEL-vs-in-flight-future entry in DESIGN.md's open question list.
    pub fn handle_frame(&mut self, frame: Frame) -> RSocketResult<HandlerEvent> {
        if self.responded {
            return Ok(HandlerEvent::Finished);
        }
        match frame.into_body() {
            Body::Cancel() => Ok(HandlerEvent::Finished),
            other => Err(RSocketError::InvalidFrame(format!(
                "request/response responder cannot handle {:?}",
                other
            ))),
        }
    }
}
