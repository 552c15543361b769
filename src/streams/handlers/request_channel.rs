//! Request/channel handler (§4.5): symmetric, each side is both a publisher
//! and a subscriber. A stream only finishes once both directions have sent
//! their own completion and observed the peer's (`mark_completed_and_finish`
//! in the grounding source tracks exactly this pair of flags).
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use super::{HandlerEvent, OutboundSink};
use crate::error::{RSocketError, RSocketResult};
use crate::flow_control::Demand;
use crate::fragmentation::Fragmenter;
use crate::frame::{
    Body, Cancel, Error as ErrorFrame, Frame, Payload, RequestN, ERR_APPLICATION, FLAG_FOLLOW,
};
use crate::reactive::{Subscriber, Subscription};

#[derive(Default)]
struct ChannelState {
    received_complete: bool,
    sent_complete: bool,
    local_subscription: Option<Box<dyn Subscription>>,
    demand: Demand,
}

impl ChannelState {
    fn both_closed(&self) -> bool {
        self.received_complete && self.sent_complete
    }
}

pub struct RequestChannelHandler {
    stream_id: u32,
    outbound: OutboundSink,
    state: Arc<Mutex<ChannelState>>,
    remote_subscriber: Option<Box<dyn Subscriber>>,
    mtu: usize,
}

/// Given to the application's local publisher on `subscribe`; each `on_next`
/// becomes an outbound PAYLOAD(NEXT), each `on_complete`/`on_error` the
/// stream's own half of completion.
pub struct ChannelSubscriber {
    stream_id: u32,
    outbound: OutboundSink,
    state: Arc<Mutex<ChannelState>>,
    mtu: usize,
}

impl Subscriber for ChannelSubscriber {
    fn on_subscribe(&mut self, subscription: Box<dyn Subscription>) {
        self.state.lock().unwrap().local_subscription = Some(subscription);
    }

    /// Gated on outstanding REQUEST_N credit (§8), symmetric with
    /// `ResponderSubscriber::on_next` in the request/stream handler.
    fn on_next(&mut self, item: Payload) {
        let has_demand = self.state.lock().unwrap().demand.take_one();
        if !has_demand {
            if let Some(mut subscription) = self.state.lock().unwrap().local_subscription.take() {
                subscription.cancel();
            }
            let builder = ErrorFrame::builder(self.stream_id, 0, ERR_APPLICATION)
                .set_data(Bytes::from_static(b"emitted without available demand"));
            let _ = self.outbound.send(builder.build());
            self.state.lock().unwrap().sent_complete = true;
            return;
        }
        let (data, metadata) = item.split();
        let mut chunks = Fragmenter::split(metadata, data, self.mtu).into_iter().peekable();
        while let Some(chunk) = chunks.next() {
            let is_last = chunks.peek().is_none();
            let flag = if is_last { 0 } else { FLAG_FOLLOW };
            let mut builder = Payload::builder(self.stream_id, flag).set_all((chunk.data, chunk.metadata));
            if is_last {
                builder = builder.set_next(true);
            }
            let _ = self.outbound.send(builder.build());
        }
    }

    fn on_complete(&mut self) {
        let frame = Payload::builder(self.stream_id, 0).set_complete(true).build();
        let _ = self.outbound.send(frame);
        self.state.lock().unwrap().sent_complete = true;
    }

    fn on_error(&mut self, error: RSocketError) {
        let code = error.error_code().unwrap_or(ERR_APPLICATION);
        let mut builder = ErrorFrame::builder(self.stream_id, 0, code);
        if let Some(data) = error.data() {
            builder = builder.set_data(data.clone());
        }
        let _ = self.outbound.send(builder.build());
        self.state.lock().unwrap().sent_complete = true;
    }
}

impl RequestChannelHandler {
    /// `remote_subscriber` is the application's subscriber for the *peer's*
    /// items (`None` if the application chose not to consume the remote
    /// half, per `request_channel` returning `(Publisher, Option<Subscriber>)`).
    pub fn new(
        stream_id: u32,
        outbound: OutboundSink,
        remote_subscriber: Option<Box<dyn Subscriber>>,
        mtu: usize,
    ) -> (RequestChannelHandler, ChannelSubscriber) {
        let state = Arc::new(Mutex::new(ChannelState::default()));
        let mut handler = RequestChannelHandler {
            stream_id,
            outbound: outbound.clone(),
            state: state.clone(),
            remote_subscriber,
            mtu,
        };
        if handler.remote_subscriber.is_none() {
            handler.state.lock().unwrap().received_complete = true;
        }
        (
            handler,
            ChannelSubscriber {
                stream_id,
                outbound,
                state,
                mtu,
            },
        )
    }

    pub fn is_finished(&self) -> bool {
        self.state.lock().unwrap().both_closed()
    }

    /// The initial REQUEST_CHANNEL carried its own `initial_request_n`, same
    /// role as `RequestStreamResponder::grant_initial`.
    pub fn grant_initial(&mut self, n: u32) {
        let mut state = self.state.lock().unwrap();
        let _ = state.demand.increase(n);
        if let Some(subscription) = state.local_subscription.as_mut() {
            subscription.request(n);
        }
    }

    pub fn handle_frame(&mut self, frame: Frame) -> RSocketResult<HandlerEvent> {
        let complete = frame.has_complete();
        let next = frame.has_next();
        match frame.into_body() {
            Body::RequestN(body) => {
                let mut state = self.state.lock().unwrap();
                let _ = state.demand.increase(body.get_request_n());
                if let Some(subscription) = state.local_subscription.as_mut() {
                    subscription.request(body.get_request_n());
                }
                Ok(HandlerEvent::Continue)
            }
            Body::Cancel() => {
                let mut state = self.state.lock().unwrap();
                if let Some(mut subscription) = state.local_subscription.take() {
                    subscription.cancel();
                }
                Ok(HandlerEvent::Finished)
            }
            Body::Payload(payload) => {
                if next {
                    if let Some(subscriber) = self.remote_subscriber.as_mut() {
                        subscriber.on_next(payload);
                    }
                }
                if complete {
                    if let Some(subscriber) = self.remote_subscriber.as_mut() {
                        subscriber.on_complete();
                    }
                    self.state.lock().unwrap().received_complete = true;
                }
                if self.is_finished() {
                    Ok(HandlerEvent::Finished)
                } else {
                    Ok(HandlerEvent::Continue)
                }
            }
            Body::Error(body) => {
                if let Some(subscriber) = self.remote_subscriber.as_mut() {
                    subscriber.on_error(RSocketError::from_error_frame(self.stream_id, &body));
                }
                self.state.lock().unwrap().received_complete = true;
                Ok(HandlerEvent::Finished)
            }
            other => Err(RSocketError::InvalidFrame(format!(
                "request/channel handler cannot handle {:?}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    struct NullSubscriber;
    impl Subscriber for NullSubscriber {
        fn on_subscribe(&mut self, _subscription: Box<dyn Subscription>) {}
        fn on_next(&mut self, _item: Payload) {}
        fn on_complete(&mut self) {}
        fn on_error(&mut self, _error: RSocketError) {}
    }

    #[test]
    fn both_sides_must_complete_before_finish() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let (mut handler, mut local) =
            RequestChannelHandler::new(5, tx, Some(Box::new(NullSubscriber)), 0);
        assert!(!handler.is_finished());

        let inbound_complete = Payload::builder(5, 0).set_complete(true).build();
        let event = handler.handle_frame(inbound_complete).unwrap();
        assert_eq!(event, HandlerEvent::Continue);
        assert!(!handler.is_finished());

        local.on_complete();
        assert!(handler.is_finished());
    }

    #[test]
    fn a_final_payload_combining_next_and_complete_delivers_both_to_the_remote_subscriber() {
        struct RecordingSubscriber {
            items: Arc<Mutex<Vec<Payload>>>,
            completed: Arc<Mutex<bool>>,
        }
        impl Subscriber for RecordingSubscriber {
            fn on_subscribe(&mut self, _subscription: Box<dyn Subscription>) {}
            fn on_next(&mut self, item: Payload) {
                self.items.lock().unwrap().push(item);
            }
            fn on_complete(&mut self) {
                *self.completed.lock().unwrap() = true;
            }
            fn on_error(&mut self, _error: RSocketError) {}
        }

        let items = Arc::new(Mutex::new(Vec::new()));
        let completed = Arc::new(Mutex::new(false));
        let (tx, _rx) = mpsc::unbounded_channel();
        let (mut handler, _local) = RequestChannelHandler::new(
            7,
            tx,
            Some(Box::new(RecordingSubscriber {
                items: items.clone(),
                completed: completed.clone(),
            })),
            0,
        );

        let last = Payload::builder(7, 0)
            .set_data(bytes::Bytes::from_static(b"final"))
            .set_next(true)
            .set_complete(true)
            .build();
        handler.handle_frame(last).unwrap();

        assert_eq!(items.lock().unwrap().len(), 1);
        assert!(*completed.lock().unwrap());
    }

    #[test]
    fn missing_remote_subscriber_counts_as_received_complete() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let (handler, _local) = RequestChannelHandler::new(6, tx, None, 0);
        assert!(!handler.is_finished());
    }

    #[test]
    fn request_n_forwards_to_local_subscription() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let (mut handler, _local) =
            RequestChannelHandler::new(8, tx, Some(Box::new(NullSubscriber)), 0);
        let event = handler.handle_frame(RequestN::new(8, 3, 0)).unwrap();
        assert_eq!(event, HandlerEvent::Continue);
    }

    #[test]
    fn on_next_without_demand_is_rejected_not_forwarded() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (_handler, mut local) =
            RequestChannelHandler::new(11, tx, Some(Box::new(NullSubscriber)), 0);
        local.on_next(Payload::new(Some(bytes::Bytes::from_static(b"a")), None));
        let frame = rx.try_recv().unwrap();
        match frame.into_body() {
            Body::Error(_) => {}
            other => panic!("expected an ERROR frame, got {:?}", other),
        }
    }

    #[test]
    fn on_next_fragments_an_item_larger_than_the_mtu() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (mut handler, mut local) =
            RequestChannelHandler::new(12, tx, Some(Box::new(NullSubscriber)), 4);
        handler.grant_initial(1);
        local.on_next(Payload::new(Some(bytes::Bytes::from(vec![b'x'; 10])), None));

        let first = rx.try_recv().unwrap();
        assert!(first.has_follows() && !first.has_next());
        let second = rx.try_recv().unwrap();
        assert!(second.has_follows());
        let last = rx.try_recv().unwrap();
        assert!(!last.has_follows() && last.has_next());
        assert!(rx.try_recv().is_err());
    }
}
