//! The outer length-prefixed buffer codec (§4.1, component 1 of the core):
//! turns a stream of arbitrary byte chunks into a lazy sequence of frames,
//! and turns a frame back into the bytes a byte-oriented transport writes.
//!
//! Datagram transports (QUIC streams) already deliver one frame per datagram
//! and can call [`Frame::decode`]/[`Frame::write_to`] directly, skipping this
//! module's length prefix (see §4.1).
use bytes::{Buf, BufMut, BytesMut};
use log::trace;

use crate::error::{RSocketError, RSocketResult};
use crate::frame::utils::Writeable;
use crate::frame::Frame;

const LENGTH_PREFIX_BYTES: usize = 3;
const MAX_FRAME_LEN: u32 = 0x00FF_FFFF;

/// Accumulates bytes fed from the transport and yields complete frames,
/// retaining any partial tail until the next feed.
#[derive(Default)]
pub struct FrameCodec {
    buffer: BytesMut,
}

impl FrameCodec {
    pub fn new() -> FrameCodec {
        FrameCodec {
            buffer: BytesMut::new(),
        }
    }

    /// Append newly received transport bytes. Does not parse anything yet.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Pull the next complete frame out of the buffer, if one is fully present.
    /// Returns `Ok(None)` when only a partial frame (or nothing) is buffered.
    pub fn next_frame(&mut self) -> RSocketResult<Option<Frame>> {
        if self.buffer.remaining() < LENGTH_PREFIX_BYTES {
            return Ok(None);
        }
        let declared_len = peek_u24(&self.buffer) as usize;
        if self.buffer.remaining() < LENGTH_PREFIX_BYTES + declared_len {
            return Ok(None);
        }
        self.buffer.advance(LENGTH_PREFIX_BYTES);
        let mut frame_bytes = self.buffer.split_to(declared_len);
        trace!("decoding frame of {} bytes", declared_len);
        Frame::decode(&mut frame_bytes).map(Some)
    }

    /// Encode one frame with its u24 length prefix, ready to hand to a
    /// stream-oriented transport's `send_frame`.
    pub fn encode_frame(frame: &Frame) -> RSocketResult<BytesMut> {
        let body_len = frame.len();
        if body_len > MAX_FRAME_LEN {
            return Err(RSocketError::MalformedFrame(format!(
                "frame of {} bytes exceeds the u24 length prefix's range",
                body_len
            )));
        }
        let mut out = BytesMut::with_capacity(LENGTH_PREFIX_BYTES + body_len as usize);
        out.put_uint(body_len as u64, LENGTH_PREFIX_BYTES);
        frame.write_to(&mut out);
        Ok(out)
    }
}

fn peek_u24(buf: &BytesMut) -> u32 {
    ((buf[0] as u32) << 16) | ((buf[1] as u32) << 8) | (buf[2] as u32)
}
