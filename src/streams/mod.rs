//! Stream multiplexing (§4.4, component 5 of the core): id allocation,
//! the handler registry, and the per-interaction-model handler state machines.
pub mod handlers;
pub mod registry;
pub mod stream_id;

pub use registry::StreamRegistry;
pub use stream_id::{Parity, StreamIdSequence};
