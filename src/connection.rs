//! The connection engine (§4.6, component 7 of the core): SETUP exchange,
//! keepalive bookkeeping, connection-level (stream id 0) frame dispatch, and
//! the requester-side entry points that turn application calls into frames.
//!
//! `Connection` owns no transport and runs no event loop of its own. It is
//! fed frames one at a time through `handle_frame` and hands outbound frames
//! to whoever owns the actual socket through the `OutboundSink` receiver
//! returned by `new`; that split mirrors the one already drawn between
//! `transport::FrameTransport` (the wire) and everything above it. The only
//! asynchronous boundary a caller must drive itself is `Dispatch::AwaitResponse`:
//! request/response responders answer through a `BoxFuture`, since unlike
//! request/stream and request/channel the application has no synchronous
//! accept/reject step (§9: "futures as stream outputs").
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::future::BoxFuture;
use tokio::sync::mpsc;

use crate::config::ConnectionConfig;
use crate::error::{ConnectionErrorKind, RSocketError, RSocketResult};
use crate::fragmentation::{Fragmenter, Reassembler};
use crate::frame::{
    Body, Error as ErrorFrame, Frame, Keepalive, MetadataPush, Payload, RequestChannel,
    RequestFNF, RequestResponse, RequestStream, Resume, ResumeOK, Setup, CURRENT_VERSION,
    ERR_APPLICATION, ERR_REJECT_RESUME, FLAG_FOLLOW, TYPE_CANCEL, TYPE_ERROR, TYPE_PAYLOAD,
    TYPE_REQUEST_CHANNEL, TYPE_REQUEST_FNF, TYPE_REQUEST_N, TYPE_REQUEST_RESPONSE,
    TYPE_REQUEST_STREAM,
};
use crate::lease::LeaseTracker;
use crate::reactive::{Publisher, Subscriber};
use crate::request_handler::RequestHandler;
use crate::resume::{validate_resume, FrameCache, SessionStore};
use crate::streams::handlers::request_response::ResponseReceiver;
use crate::streams::handlers::{
    HandlerEvent, OutboundSink, RequestChannelHandler, RequestResponseRequester,
    RequestResponseResponder, RequestStreamRequester, RequestStreamResponder, StreamHandler,
};
use crate::streams::{Parity, StreamRegistry};

/// What a caller must still do after handing a frame to [`Connection::handle_frame`].
pub enum Dispatch {
    /// Nothing further needed; any reply was already queued on the outbound sink.
    None,
    /// A request/response responder is waiting on the application's future.
    /// Drive it to completion and feed the result back through
    /// [`Connection::complete_response`].
    AwaitResponse {
        stream_id: u32,
        future: BoxFuture<'static, RSocketResult<Payload>>,
    },
}

/// One RSocket connection's protocol state: stream multiplexing, lease
/// admission, fragment reassembly, and the frames exchanged at stream id 0.
pub struct Connection {
    handler: Box<dyn RequestHandler>,
    config: ConnectionConfig,
    registry: StreamRegistry<StreamHandler>,
    reassembler: Reassembler,
    lease: LeaseTracker,
    frame_cache: FrameCache,
    outbound: OutboundSink,
    /// REQUEST_STREAM/REQUEST_CHANNEL's `initial_request_n` only rides the
    /// first fragment; a multi-fragment chain needs it held here until
    /// reassembly hands back the complete logical frame.
    pending_initial_request_n: HashMap<u32, u32>,
    /// Count of frames received so far, reported back to the peer in this
    /// side's own KEEPALIVE so it knows how much of its frame cache it may purge.
    received_position: u64,
    setup_complete: bool,
    /// Suspended sessions this side can resume a reconnecting peer into.
    /// Shared across every `Connection` a server holds, since the session a
    /// RESUME frame names is almost never this one's own predecessor (it
    /// belongs to whichever connection a token's session was suspended
    /// under). `None` means this connection never accepts RESUME at all.
    resume_store: Option<Arc<Mutex<SessionStore>>>,
}

impl Connection {
    /// Builds a fresh connection of the given parity. Returns the receiving
    /// half of the outbound channel; the caller drains it, writes each frame
    /// to its transport, and (if resume is negotiated) calls `record_sent`
    /// with that same frame immediately after, in order.
    pub fn new(
        parity: Parity,
        config: ConnectionConfig,
        handler: Box<dyn RequestHandler>,
    ) -> (Connection, mpsc::UnboundedReceiver<Frame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let lease = LeaseTracker::new(config.honor_lease);
        let connection = Connection {
            handler,
            setup_complete: parity == Parity::Server,
            registry: StreamRegistry::new(parity),
            reassembler: Reassembler::new(),
            lease,
            frame_cache: FrameCache::new(),
            outbound: tx,
            pending_initial_request_n: HashMap::new(),
            received_position: 0,
            resume_store: None,
            config,
        };
        (connection, rx)
    }

    /// Let this connection accept RESUME frames against `store`. Without this,
    /// every incoming RESUME is rejected outright (§4.8).
    pub fn enable_resume(&mut self, store: Arc<Mutex<SessionStore>>) {
        self.resume_store = Some(store);
    }

    pub fn is_setup_complete(&self) -> bool {
        self.setup_complete
    }

    pub fn active_streams(&self) -> usize {
        self.registry.len()
    }

    pub fn frame_cache(&self) -> &FrameCache {
        &self.frame_cache
    }

    /// Client-side: build and send the SETUP frame from this connection's config.
    pub fn send_setup(&mut self) -> RSocketResult<()> {
        let mut builder = Setup::builder(0, 0)
            .set_version(CURRENT_VERSION.major, CURRENT_VERSION.minor)
            .set_keepalive_interval_millis(self.config.keepalive_interval.as_millis() as u32)
            .set_max_lifetime_millis(self.config.max_lifetime.as_millis() as u32)
            .set_honor_lease(self.config.honor_lease)
            .set_data_mime_type(self.config.data_mime_type.clone())
            .set_metadata_mime_type(self.config.metadata_mime_type.clone());
        if let Some(token) = &self.config.resume_token {
            builder = builder.set_resume_token(token.clone());
        }
        self.setup_complete = true;
        self.send(builder.build())
    }

    /// Record a frame this connection is about to write to the wire, for
    /// resume replay. A no-op when resume wasn't negotiated. Call after
    /// serializing `frame` (`Writeable::write_to` only borrows) and before
    /// dropping it.
    pub fn record_sent(&mut self, frame: Frame) -> u64 {
        if self.config.resume_token.is_none() {
            return self.frame_cache.last_position();
        }
        self.frame_cache.store(frame)
    }

    fn send(&mut self, frame: Frame) -> RSocketResult<()> {
        self.outbound
            .send(frame)
            .map_err(|_| RSocketError::Transport("outbound channel closed".into()))
    }

    fn send_stream_error(&mut self, stream_id: u32, error: RSocketError) -> RSocketResult<()> {
        let code = error.error_code().unwrap_or(ERR_APPLICATION);
        let mut builder = ErrorFrame::builder(stream_id, 0, code);
        if let Some(data) = error.data() {
            builder = builder.set_data(data.clone());
        }
        self.send(builder.build())
    }

    // ---- requester-side entry points -------------------------------------

    /// Send `metadata`/`data` as a request-initiating message, fragmenting per
    /// `config.mtu` (§4.3) when it doesn't fit in one frame: the first chunk
    /// becomes whatever frame `build_first` constructs (carrying FLAG_FOLLOW
    /// when more chunks remain), and every later chunk rides as a bare
    /// PAYLOAD continuation, exactly what `Reassembler` expects on the other end.
    fn send_fragmented_request(
        &mut self,
        stream_id: u32,
        metadata: Option<Bytes>,
        data: Option<Bytes>,
        build_first: impl FnOnce(Option<Bytes>, Option<Bytes>, u16) -> Frame,
    ) -> RSocketResult<()> {
        let mut chunks = Fragmenter::split(metadata, data, self.config.mtu)
            .into_iter()
            .peekable();
        let first = chunks
            .next()
            .expect("Fragmenter::split always yields at least one chunk");
        let flag = if chunks.peek().is_some() { FLAG_FOLLOW } else { 0 };
        self.send(build_first(first.data, first.metadata, flag))?;
        while let Some(chunk) = chunks.next() {
            let flag = if chunks.peek().is_some() { FLAG_FOLLOW } else { 0 };
            let frame = Payload::builder(stream_id, flag)
                .set_all((chunk.data, chunk.metadata))
                .build();
            self.send(frame)?;
        }
        Ok(())
    }

    pub fn request_response(&mut self, payload: Payload) -> RSocketResult<ResponseReceiver> {
        self.lease.admit_request()?;
        let stream_id = self.registry.reserve()?;
        let (handler, receiver) = RequestResponseRequester::new(stream_id, self.outbound.clone());
        self.registry
            .insert(stream_id, StreamHandler::RequestResponseRequester(handler));
        let (data, metadata) = payload.split();
        self.send_fragmented_request(stream_id, metadata, data, |data, metadata, flag| {
            RequestResponse::builder(stream_id, flag)
                .set_all((data, metadata))
                .build()
        })?;
        Ok(receiver)
    }

    pub fn request_fire_and_forget(&mut self, payload: Payload) -> RSocketResult<()> {
        self.lease.admit_request()?;
        let stream_id = self.registry.reserve()?;
        let (data, metadata) = payload.split();
        self.send_fragmented_request(stream_id, metadata, data, |data, metadata, flag| {
            RequestFNF::builder(stream_id, flag)
                .set_all((data, metadata))
                .build()
        })
    }

    pub fn request_stream(
        &mut self,
        payload: Payload,
        initial_request_n: u32,
        subscriber: Box<dyn Subscriber>,
    ) -> RSocketResult<()> {
        self.lease.admit_request()?;
        let stream_id = self.registry.reserve()?;
        let handler = RequestStreamRequester::new(stream_id, self.outbound.clone(), subscriber);
        self.registry
            .insert(stream_id, StreamHandler::RequestStreamRequester(handler));
        let (data, metadata) = payload.split();
        self.send_fragmented_request(stream_id, metadata, data, |data, metadata, flag| {
            RequestStream::builder(stream_id, flag)
                .set_initial_request_n(initial_request_n)
                .set_all((data, metadata))
                .build()
        })
    }

    pub fn request_channel(
        &mut self,
        payload: Payload,
        initial_request_n: u32,
        local_publisher: Box<dyn Publisher>,
        remote_subscriber: Option<Box<dyn Subscriber>>,
    ) -> RSocketResult<()> {
        self.lease.admit_request()?;
        let stream_id = self.registry.reserve()?;
        let (handler, channel_subscriber) = RequestChannelHandler::new(
            stream_id,
            self.outbound.clone(),
            remote_subscriber,
            self.config.mtu,
        );
        self.registry
            .insert(stream_id, StreamHandler::RequestChannel(handler));
        local_publisher.subscribe(Box::new(channel_subscriber));
        let (data, metadata) = payload.split();
        self.send_fragmented_request(stream_id, metadata, data, |data, metadata, flag| {
            RequestChannel::builder(stream_id, flag)
                .set_initial_request_n(initial_request_n)
                .set_all((data, metadata))
                .build()
        })
    }

    pub fn metadata_push(&mut self, metadata: Bytes) -> RSocketResult<()> {
        self.send(MetadataPush::new(metadata))
    }

    // ---- inbound dispatch ---------------------------------------------

    pub fn handle_frame(&mut self, frame: Frame) -> RSocketResult<Dispatch> {
        self.received_position += 1;
        if frame.get_stream_id() == 0 {
            self.handle_connection_frame(frame)?;
            return Ok(Dispatch::None);
        }
        self.handle_stream_frame(frame)
    }

    fn handle_connection_frame(&mut self, frame: Frame) -> RSocketResult<()> {
        let respond = frame.has_follows();
        match frame.into_body() {
            Body::Setup(setup) => self.on_setup(setup),
            Body::Lease(lease) => {
                self.lease.on_lease(&lease);
                Ok(())
            }
            Body::Keepalive(keepalive) => self.on_keepalive(respond, keepalive),
            Body::Error(body) => self.on_connection_error(body),
            Body::MetadataPush(push) => {
                self.handler
                    .on_metadata_push(Payload::new(None, Some(push.get_metadata().clone())));
                Ok(())
            }
            Body::Resume(resume) => self.on_resume(resume),
            Body::ResumeOK(ok) => {
                self.frame_cache
                    .clear_until(ok.get_last_received_client_position());
                Ok(())
            }
            Body::Ext(_) => Ok(()),
            other => Err(RSocketError::InvalidFrame(format!(
                "unexpected stream-0 body {:?}",
                other
            ))),
        }
    }

    fn on_setup(&mut self, setup: Setup) -> RSocketResult<()> {
        if setup.get_version().major != CURRENT_VERSION.major {
            return Err(RSocketError::Connection(
                ConnectionErrorKind::UnsupportedSetup,
                None,
            ));
        }
        let data_mime = setup.get_data_mime_type().to_string();
        let metadata_mime = setup.get_metadata_mime_type().to_string();
        let (data, metadata) = (setup.get_data().clone(), setup.get_metadata().clone());
        self.handler
            .on_setup(&data_mime, &metadata_mime, Payload::new(data, metadata))?;
        self.setup_complete = true;
        Ok(())
    }

    fn on_keepalive(&mut self, respond: bool, keepalive: Keepalive) -> RSocketResult<()> {
        self.frame_cache
            .clear_until(keepalive.get_last_received_position());
        if respond {
            let reply = Keepalive::builder(0, 0)
                .set_last_received_position(self.received_position)
                .build();
            self.send(reply)?;
        }
        Ok(())
    }

    /// A peer asked to reattach to a suspended session (§4.8). Looks the
    /// token up in `resume_store`, validates it against the requested
    /// position, and replies RESUME_OK (adopting the recovered session's
    /// frame cache and replaying whatever the peer hasn't acknowledged yet)
    /// or ERROR(REJECTED_RESUME).
    fn on_resume(&mut self, resume: Resume) -> RSocketResult<()> {
        let store = match self.resume_store.clone() {
            Some(store) => store,
            None => return self.reject_resume(),
        };
        let session = store.lock().unwrap().take(resume.get_resume_token());
        let session = match session {
            Some(session) => session,
            None => return self.reject_resume(),
        };
        if let Err(error) = validate_resume(&session, &resume) {
            self.reject_resume()?;
            return Err(error);
        }
        let requested = resume.get_last_received_server_position();
        let last_received_client_position = session.last_received_position;
        self.frame_cache = session.frame_cache;
        self.received_position = session.last_received_position;
        self.send(ResumeOK::new(0, last_received_client_position))?;
        let replay: Vec<Frame> = self.frame_cache.frames_from(requested).cloned().collect();
        for frame in replay {
            self.send(frame)?;
        }
        Ok(())
    }

    fn reject_resume(&mut self) -> RSocketResult<()> {
        self.send(ErrorFrame::builder(0, 0, ERR_REJECT_RESUME).build())
    }

    fn on_connection_error(&mut self, body: crate::frame::Error) -> RSocketResult<()> {
        let error = RSocketError::from_error_frame(0, &body);
        self.handler.on_error(&error);
        if error.is_connection_fatal() {
            Err(error)
        } else {
            Ok(())
        }
    }

    fn handle_stream_frame(&mut self, frame: Frame) -> RSocketResult<Dispatch> {
        let stream_id = frame.get_stream_id();
        match frame.get_frame_type() {
            TYPE_REQUEST_RESPONSE | TYPE_REQUEST_FNF | TYPE_REQUEST_STREAM | TYPE_REQUEST_CHANNEL => {
                self.handle_initiating_frame(stream_id, frame)
            }
            TYPE_PAYLOAD => self.handle_payload_frame(stream_id, frame),
            TYPE_REQUEST_N | TYPE_CANCEL | TYPE_ERROR => self.dispatch_to_handler(stream_id, frame),
            other => Err(RSocketError::InvalidFrame(format!(
                "unexpected frame type {} on stream {}",
                other, stream_id
            ))),
        }
    }

    fn handle_initiating_frame(&mut self, stream_id: u32, frame: Frame) -> RSocketResult<Dispatch> {
        let follows = frame.has_follows();
        let frame_type = frame.get_frame_type();
        let (metadata, data, initial_n) = match frame.get_body() {
            Body::RequestResponse(b) => (b.get_metadata().clone(), b.get_data().clone(), None),
            Body::RequestFNF(b) => (b.get_metadata().clone(), b.get_data().clone(), None),
            Body::RequestStream(b) => (
                b.get_metadata().clone(),
                b.get_data().clone(),
                Some(b.get_initial_request_n()),
            ),
            Body::RequestChannel(b) => (
                b.get_metadata().clone(),
                b.get_data().clone(),
                Some(b.get_initial_request_n()),
            ),
            other => {
                return Err(RSocketError::InvalidFrame(format!(
                    "not a request-initiating body: {:?}",
                    other
                )))
            }
        };
        if let Some(n) = initial_n {
            self.pending_initial_request_n.insert(stream_id, n);
        }
        match self
            .reassembler
            .accept(stream_id, frame_type, follows, metadata, data)?
        {
            Some((metadata, data)) => self.dispatch_new_stream(stream_id, frame_type, metadata, data),
            None => Ok(Dispatch::None),
        }
    }

    fn dispatch_new_stream(
        &mut self,
        stream_id: u32,
        frame_type: u16,
        metadata: Option<Bytes>,
        data: Option<Bytes>,
    ) -> RSocketResult<Dispatch> {
        let payload = Payload::new(data, metadata);
        match frame_type {
            TYPE_REQUEST_RESPONSE => {
                let responder =
                    RequestResponseResponder::new(stream_id, self.outbound.clone(), self.config.mtu);
                self.registry
                    .insert(stream_id, StreamHandler::RequestResponseResponder(responder));
                let future = self.handler.request_response(payload);
                Ok(Dispatch::AwaitResponse { stream_id, future })
            }
            TYPE_REQUEST_FNF => {
                self.handler.request_fire_and_forget(payload);
                Ok(Dispatch::None)
            }
            TYPE_REQUEST_STREAM => {
                let initial_n = self.pending_initial_request_n.remove(&stream_id).unwrap_or(1);
                let (mut responder, subscriber) =
                    RequestStreamResponder::new(stream_id, self.outbound.clone(), self.config.mtu);
                match self.handler.request_stream(payload) {
                    Ok(publisher) => {
                        publisher.subscribe(Box::new(subscriber));
                        responder.grant_initial(initial_n);
                        // the publisher may have completed synchronously
                        // within grant_initial (e.g. fewer items than the
                        // initial request_n); such a stream needs no
                        // registry entry since no further frames can
                        // legally arrive for it.
                        if !responder.is_finished() {
                            self.registry
                                .insert(stream_id, StreamHandler::RequestStreamResponder(responder));
                        }
                    }
                    Err(error) => self.send_stream_error(stream_id, error)?,
                }
                Ok(Dispatch::None)
            }
            TYPE_REQUEST_CHANNEL => {
                let initial_n = self.pending_initial_request_n.remove(&stream_id).unwrap_or(1);
                match self.handler.request_channel(payload) {
                    Ok((local_publisher, remote_subscriber)) => {
                        let (mut channel, channel_subscriber) = RequestChannelHandler::new(
                            stream_id,
                            self.outbound.clone(),
                            remote_subscriber,
                            self.config.mtu,
                        );
                        local_publisher.subscribe(Box::new(channel_subscriber));
                        channel.grant_initial(initial_n);
                        // symmetric with request/stream: a channel with no
                        // remote half to wait on and a local publisher that
                        // completed synchronously is already finished.
                        if !channel.is_finished() {
                            self.registry
                                .insert(stream_id, StreamHandler::RequestChannel(channel));
                        }
                    }
                    Err(error) => self.send_stream_error(stream_id, error)?,
                }
                Ok(Dispatch::None)
            }
            _ => unreachable!("handle_initiating_frame only dispatches request-initiating types"),
        }
    }

    fn handle_payload_frame(&mut self, stream_id: u32, frame: Frame) -> RSocketResult<Dispatch> {
        let follows = frame.has_follows();
        let flag = frame.get_flag();
        let (metadata, data) = match frame.get_body() {
            Body::Payload(p) => (p.get_metadata().clone(), p.get_data().clone()),
            other => {
                return Err(RSocketError::InvalidFrame(format!(
                    "expected PAYLOAD body, got {:?}",
                    other
                )))
            }
        };
        match self
            .reassembler
            .accept(stream_id, TYPE_PAYLOAD, follows, metadata, data)?
        {
            Some((metadata, data)) => {
                if !self.registry.contains(stream_id) {
                    // Raced with this stream already finishing locally (§9
                    // open question on CANCEL vs in-flight PAYLOAD): drop.
                    return Ok(Dispatch::None);
                }
                let synthetic = Payload::builder(stream_id, flag)
                    .set_all((data, metadata))
                    .build();
                self.dispatch_to_handler(stream_id, synthetic)
            }
            None => Ok(Dispatch::None),
        }
    }

    fn dispatch_to_handler(&mut self, stream_id: u32, frame: Frame) -> RSocketResult<Dispatch> {
        let handler = match self.registry.get_mut(stream_id) {
            Some(handler) => handler,
            None => return Ok(Dispatch::None),
        };
        match handler.handle_frame(frame)? {
            HandlerEvent::Continue => Ok(Dispatch::None),
            HandlerEvent::Finished => {
                self.registry.finish(stream_id);
                self.reassembler.discard(stream_id);
                Ok(Dispatch::None)
            }
        }
    }

    /// The application's request/response future (from a `Dispatch::AwaitResponse`)
    /// resolved; send its reply and release the stream.
    pub fn complete_response(&mut self, stream_id: u32, result: RSocketResult<Payload>) {
        if let Some(StreamHandler::RequestResponseResponder(responder)) =
            self.registry.get_mut(stream_id)
        {
            responder.respond(result);
        }
        self.registry.finish(stream_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request_handler::BaseRequestHandler;
    use std::sync::{Arc, Mutex};

    fn client() -> (Connection, mpsc::UnboundedReceiver<Frame>) {
        Connection::new(
            Parity::Client,
            ConnectionConfig::default(),
            Box::new(BaseRequestHandler),
        )
    }

    fn server(handler: Box<dyn RequestHandler>) -> (Connection, mpsc::UnboundedReceiver<Frame>) {
        Connection::new(Parity::Server, ConnectionConfig::default(), handler)
    }

    #[test]
    fn requester_request_response_resolves_on_reply() {
        let (mut connection, mut rx) = client();
        let mut receiver = connection
            .request_response(Payload::new(Some(Bytes::from_static(b"ping")), None))
            .unwrap();

        let sent = rx.try_recv().unwrap();
        assert_eq!(sent.get_stream_id(), 1);

        let reply = Payload::builder(1, 0)
            .set_data(Bytes::from_static(b"pong"))
            .set_next(true)
            .set_complete(true)
            .build();
        matches!(connection.handle_frame(reply).unwrap(), Dispatch::None);

        let result = receiver.try_recv().unwrap().unwrap();
        assert_eq!(result.get_data(), &Some(Bytes::from_static(b"pong")));
        assert_eq!(connection.active_streams(), 0);
    }

    #[tokio::test]
    async fn responder_awaits_application_future_then_replies() {
        struct EchoHandler;
        impl RequestHandler for EchoHandler {
            fn request_response(&mut self, payload: Payload) -> BoxFuture<'static, RSocketResult<Payload>> {
                Box::pin(async move { Ok(payload) })
            }
        }

        let (mut connection, mut rx) = server(Box::new(EchoHandler));
        let request = RequestResponse::builder(2, 0)
            .set_data(Bytes::from_static(b"hi"))
            .build();

        let dispatch = connection.handle_frame(request).unwrap();
        let (stream_id, future) = match dispatch {
            Dispatch::AwaitResponse { stream_id, future } => (stream_id, future),
            Dispatch::None => panic!("expected a pending response"),
        };
        assert_eq!(connection.active_streams(), 1);

        let result = future.await;
        connection.complete_response(stream_id, result);

        let reply = rx.try_recv().unwrap();
        assert!(reply.has_next() && reply.has_complete());
        assert_eq!(connection.active_streams(), 0);
    }

    #[test]
    fn fire_and_forget_does_not_register_a_stream() {
        let (mut connection, mut rx) = client();
        connection
            .request_fire_and_forget(Payload::new(Some(Bytes::from_static(b"go")), None))
            .unwrap();
        assert_eq!(connection.active_streams(), 0);
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn keepalive_respond_echoes_last_received_position() {
        let (mut connection, mut rx) = server(Box::new(BaseRequestHandler));
        let keepalive = Keepalive::builder(0, 0).set_respond(true).build();
        connection.handle_frame(keepalive).unwrap();
        let reply = rx.try_recv().unwrap();
        match reply.into_body() {
            Body::Keepalive(k) => assert_eq!(k.get_last_received_position(), 1),
            other => panic!("expected KEEPALIVE, got {:?}", other),
        }
    }

    #[test]
    fn lease_gated_connection_rejects_until_a_lease_arrives() {
        let config = ConnectionConfig::default().with_honor_lease(true);
        let (mut connection, _rx) = Connection::new(Parity::Client, config, Box::new(BaseRequestHandler));

        assert!(connection.request_fire_and_forget(Payload::default()).is_err());

        let lease = crate::frame::Lease::builder(0, 0)
            .set_time_to_live_millis(30_000)
            .set_number_of_requests(1)
            .build();
        connection.handle_frame(lease).unwrap();

        assert!(connection.request_fire_and_forget(Payload::default()).is_ok());
    }

    #[test]
    fn fragmented_request_response_reassembles_before_reaching_the_handler() {
        #[derive(Clone, Default)]
        struct Seen(Arc<Mutex<Option<Payload>>>);
        impl RequestHandler for Seen {
            fn request_response(&mut self, payload: Payload) -> BoxFuture<'static, RSocketResult<Payload>> {
                *self.0 .0.lock().unwrap() = Some(payload);
                Box::pin(async { Err(RSocketError::Rejected("unused".into())) })
            }
        }

        let seen = Seen::default();
        let (mut connection, _rx) = server(Box::new(seen.clone()));

        let first = RequestResponse::builder(4, crate::frame::FLAG_FOLLOW)
            .set_data(Bytes::from_static(b"hel"))
            .build();
        let last = Payload::builder(4, 0).set_data(Bytes::from_static(b"lo")).build();

        assert!(matches!(connection.handle_frame(first).unwrap(), Dispatch::None));
        match connection.handle_frame(last).unwrap() {
            Dispatch::AwaitResponse { .. } => {}
            Dispatch::None => panic!("expected reassembly to complete on the second fragment"),
        }

        let payload = seen.0 .0.lock().unwrap().take().unwrap();
        assert_eq!(payload.get_data(), &Some(Bytes::from_static(b"hello")));
    }
}
