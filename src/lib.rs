//! Core framing, stream multiplexing, and flow control for the RSocket
//! protocol (§1 OVERVIEW). This crate implements the wire format, fragment
//! reassembly, lease admission, connection resumption, and the per-stream
//! state machines that together make up one connection's protocol engine;
//! it deliberately stops short of any concrete transport, server, or client
//! orchestration layer (§9 Non-goals).
//!
//! The modules mirror the core's component list:
//! [`codec`] (1, outer framing) -> [`frame`] (2, the 14 frame bodies) ->
//! [`extension`] (3, composite metadata) -> [`fragmentation`] (4, split/rejoin)
//! -> [`streams`] (5/6, multiplexing and per-interaction-model handlers) ->
//! [`flow_control`] (8, credit accounting) -> [`lease`] (9, admission control)
//! -> [`resume`] (11, resumption) -> [`connection`] (7, tying it together).
pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod extension;
pub mod flow_control;
pub mod fragmentation;
pub mod frame;
pub mod lease;
pub mod reactive;
pub mod request_handler;
pub mod resume;
pub mod streams;
pub mod transport;

pub use config::ConnectionConfig;
pub use connection::{Connection, Dispatch};
pub use error::{RSocketError, RSocketResult};
pub use frame::{Frame, Payload};
pub use reactive::{Publisher, Subscriber, Subscription};
pub use request_handler::{BaseRequestHandler, RequestHandler};
pub use streams::Parity;
pub use transport::FrameTransport;
