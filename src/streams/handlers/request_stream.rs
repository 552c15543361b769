//! Request/stream handler (§4.5): requester delivers inbound PAYLOADs to a
//! local `Subscriber`; responder forwards inbound REQUEST_N/CANCEL as demand
//! to a local `Subscription` obtained from the application's `Publisher`.
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

pub struct RequestStreamRequester {
    stream_id: u32,
    outbound: OutboundSink,
    subscriber: Box<dyn Subscriber>,
}

/// Handed to the application's local `Subscriber` so `request`/`cancel` calls
/// turn into REQUEST_N/CANCEL frames on the wire.
struct RequesterSubscription {
    stream_id: u32,
    outbound: OutboundSink,
}

impl Subscription for RequesterSubscription {
    fn request(&mut self, n: u32) {
        let _ = self.outbound.send(RequestN::new(self.stream_id, n, 0));
    }

    fn cancel(&mut self) {
        let _ = self.outbound.send(Cancel::new(self.stream_id, 0));
    }
}

impl RequestStreamRequester {
    /// `subscriber` receives items; its initial demand was already sent as
    /// the REQUEST_STREAM frame's `initial_request_n`, so no separate
    /// REQUEST_N is issued here.
    pub fn new(
        stream_id: u32,
        outbound: OutboundSink,
        mut subscriber: Box<dyn Subscriber>,
    ) -> RequestStreamRequester {
        subscriber.on_subscribe(Box::new(RequesterSubscription {
            stream_id,
            outbound: outbound.clone(),
        }));
        RequestStreamRequester {
            stream_id,
            outbound,
            subscriber,
        }
    }

    pub fn handle_frame(&mut self, frame: Frame) -> RSocketResult<HandlerEvent> {
        let complete = frame.has_complete();
        match frame.into_body() {
            Body::Payload(payload) => {
                self.subscriber.on_next(payload);
                if complete {
                    self.subscriber.on_complete();
                    Ok(HandlerEvent::Finished)
                } else {
                    Ok(HandlerEvent::Continue)
                }
            }
            Body::Error(body) => {
                self.subscriber
                    .on_error(RSocketError::from_error_frame(self.stream_id, &body));
                Ok(HandlerEvent::Finished)
            }
            other => Err(RSocketError::InvalidFrame(format!(
                "request/stream requester cannot handle {:?}",
                other
            ))),
        }
    }
}

pub struct RequestStreamResponder {
    stream_id: u32,
    outbound: OutboundSink,
    subscription: Arc<Mutex<Option<Box<dyn Subscription>>>>,
    demand: Arc<Mutex<Demand>>,
    finished: Arc<Mutex<bool>>,
    mtu: usize,
}

/// Adapts the application's `Publisher::subscribe` call into PAYLOAD/ERROR
/// frames sent to the requester.
pub struct ResponderSubscriber {
    stream_id: u32,
    outbound: OutboundSink,
    subscription: Arc<Mutex<Option<Box<dyn Subscription>>>>,
    demand: Arc<Mutex<Demand>>,
    finished: Arc<Mutex<bool>>,
    mtu: usize,
}

impl Subscriber for ResponderSubscriber {
    fn on_subscribe(&mut self, subscription: Box<dyn Subscription>) {
        *self.subscription.lock().unwrap() = Some(subscription);
    }

    /// Gated on outstanding REQUEST_N credit (§8): a publisher that emits
    /// without available demand is stopped rather than let the invariant
    /// "outbound PAYLOAD(NEXT) count <= cumulative REQUEST_N received" break.
    fn on_next(&mut self, item: Payload) {
        if !self.demand.lock().unwrap().take_one() {
            if let Some(mut subscription) = self.subscription.lock().unwrap().take() {
                subscription.cancel();
            }
            let builder = ErrorFrame::builder(self.stream_id, 0, ERR_APPLICATION)
                .set_data(Bytes::from_static(b"emitted without available demand"));
            let _ = self.outbound.send(builder.build());
            *self.finished.lock().unwrap() = true;
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
        *self.finished.lock().unwrap() = true;
    }

    fn on_error(&mut self, error: RSocketError) {
        let code = error.error_code().unwrap_or(ERR_APPLICATION);
        let mut builder = ErrorFrame::builder(self.stream_id, 0, code);
        if let Some(data) = error.data() {
            builder = builder.set_data(data.clone());
        }
        let _ = self.outbound.send(builder.build());
        *self.finished.lock().unwrap() = true;
    }
}

impl RequestStreamResponder {
    pub fn new(
        stream_id: u32,
        outbound: OutboundSink,
        mtu: usize,
    ) -> (RequestStreamResponder, ResponderSubscriber) {
        let subscription = Arc::new(Mutex::new(None));
        let demand = Arc::new(Mutex::new(Demand::new()));
        let finished = Arc::new(Mutex::new(false));
        (
            RequestStreamResponder {
                stream_id,
                outbound: outbound.clone(),
                subscription: subscription.clone(),
                demand: demand.clone(),
                finished: finished.clone(),
                mtu,
            },
            ResponderSubscriber {
                stream_id,
                outbound,
                subscription,
                demand,
                finished,
                mtu,
            },
        )
    }

    /// The initial REQUEST_STREAM carried its own `initial_request_n`; feed
    /// it in as both local demand credit and a request to the application's
    /// publisher, once it has subscribed. The publisher may complete
    /// synchronously from within this call (e.g. a publisher with fewer
    /// items than the initial grant); callers must check `is_finished`
    /// afterwards rather than unconditionally registering this responder.
    pub fn grant_initial(&mut self, n: u32) {
        let _ = self.demand.lock().unwrap().increase(n);
        if let Some(subscription) = self.subscription.lock().unwrap().as_mut() {
            subscription.request(n);
        }
    }

    pub fn is_finished(&self) -> bool {
        *self.finished.lock().unwrap()
    }

    pub fn handle_frame(&mut self, frame: Frame) -> RSocketResult<HandlerEvent> {
        match frame.into_body() {
            Body::RequestN(body) => {
                let _ = self.demand.lock().unwrap().increase(body.get_request_n());
                if let Some(subscription) = self.subscription.lock().unwrap().as_mut() {
                    subscription.request(body.get_request_n());
                }
                if self.is_finished() {
                    Ok(HandlerEvent::Finished)
                } else {
                    Ok(HandlerEvent::Continue)
                }
            }
            Body::Cancel() => {
                if let Some(mut subscription) = self.subscription.lock().unwrap().take() {
                    subscription.cancel();
                }
                Ok(HandlerEvent::Finished)
            }
            other => Err(RSocketError::InvalidFrame(format!(
                "request/stream responder cannot handle {:?}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tokio::sync::mpsc;

    struct CollectingSubscriber {
        items: Vec<Payload>,
        completed: bool,
    }

    impl Subscriber for CollectingSubscriber {
        fn on_subscribe(&mut self, _subscription: Box<dyn Subscription>) {}
        fn on_next(&mut self, item: Payload) {
            self.items.push(item);
        }
        fn on_complete(&mut self) {
            self.completed = true;
        }
        fn on_error(&mut self, _error: RSocketError) {}
    }

    #[test]
    fn responder_forwards_request_n_to_local_subscription() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (mut responder, mut subscriber) = RequestStreamResponder::new(3, tx, 0);
        responder.grant_initial(1);
        subscriber.on_next(Payload::new(Some(Bytes::from_static(b"a")), None));
        let frame = rx.try_recv().unwrap();
        assert!(frame.has_next());

        responder
            .handle_frame(RequestN::new(3, 5, 0))
            .unwrap();
        responder.handle_frame(Cancel::new(3, 0)).unwrap();
    }

    #[test]
    fn on_next_without_demand_is_rejected_and_finishes() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (responder, mut subscriber) = RequestStreamResponder::new(4, tx, 0);
        subscriber.on_next(Payload::new(Some(Bytes::from_static(b"a")), None));
        let frame = rx.try_recv().unwrap();
        match frame.into_body() {
            Body::Error(_) => {}
            other => panic!("expected an ERROR frame, got {:?}", other),
        }
        assert!(responder.is_finished());
    }

    #[test]
    fn on_next_fragments_an_item_larger_than_the_mtu() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (mut responder, mut subscriber) = RequestStreamResponder::new(10, tx, 4);
        responder.grant_initial(1);
        subscriber.on_next(Payload::new(Some(Bytes::from(vec![b'x'; 10])), None));

        let first = rx.try_recv().unwrap();
        assert!(first.has_follows() && !first.has_next());
        let second = rx.try_recv().unwrap();
        assert!(second.has_follows());
        let last = rx.try_recv().unwrap();
        assert!(!last.has_follows() && last.has_next());
        assert!(rx.try_recv().is_err());
    }
}
