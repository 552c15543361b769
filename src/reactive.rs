//! Reactive primitives (§4.5/§9, component 10 of the core): the
//! publisher/subscriber/subscription contracts used on the boundary between
//! a stream handler and the user-supplied request handler.
//!
//! Request/response deliberately does *not* use these: per the design note
//! in §9 ("Futures as stream outputs"), a single-shot completion is modeled
//! as a one-slot channel (`tokio::sync::oneshot`) instead of a one-item
//! stream, so `streams::handlers::request_response` talks to the user's
//! handler future directly rather than through a `Subscriber`.
use crate::error::RSocketError;
use crate::frame::Payload;

/// The demand side of a stream: lets a subscriber pull more items or give up.
pub trait Subscription: Send {
    /// Request `n` more items be delivered to `on_next`. `n` must be > 0;
    /// callers should reject `n <= 0` themselves (see `flow_control`).
    fn request(&mut self, n: u32);
    fn cancel(&mut self);
}

/// Receives items from a `Publisher`. Exactly one of `on_complete`/`on_error`
/// is ever called, and only after `on_subscribe` (§8: "exactly one terminal
/// signal per stream per side").
pub trait Subscriber: Send {
    fn on_subscribe(&mut self, subscription: Box<dyn Subscription>);
    fn on_next(&mut self, item: Payload);
    fn on_complete(&mut self);
    fn on_error(&mut self, error: RSocketError);
}

/// A source of items that only starts producing once subscribed, and only
/// produces as much as the subscriber's `Subscription::request` permits.
pub trait Publisher: Send {
    fn subscribe(self: Box<Self>, subscriber: Box<dyn Subscriber>);
}

/// A `Subscription` that never emits, for publishers that complete immediately
/// (e.g. an empty request/channel remote half) and so have no in-flight demand.
pub struct NoopSubscription;

impl Subscription for NoopSubscription {
    fn request(&mut self, _n: u32) {}
    fn cancel(&mut self) {}
}
