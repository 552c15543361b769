//! The RSocket wire frame: the 14 typed frame bodies (§3/§4.1) and their
//! common 6-byte header (stream id + 6-bit type + 10-bit flags).
//!
//! This module only knows how to turn one already-length-delimited frame's
//! bytes into a `Frame` and back; the outer u24 length prefix used by
//! stream-oriented transports lives in [`crate::codec`].
use bytes::{Buf, BufMut, Bytes, BytesMut};

pub mod cancel;
pub mod error;
pub mod keepalive;
pub mod lease;
pub mod metadata_push;
pub mod payload;
pub mod request_channel;
pub mod request_fnf;
pub mod request_n;
pub mod request_response;
pub mod request_stream;
pub mod resume;
pub mod resume_ok;
pub mod setup;
pub mod utils;

pub use cancel::Cancel;
pub use error::Error;
pub use keepalive::Keepalive;
pub use lease::Lease;
pub use metadata_push::MetadataPush;
pub use payload::{Payload, PayloadBuilder};
pub use request_channel::RequestChannel;
pub use request_fnf::RequestFNF;
pub use request_n::RequestN;
pub use request_response::RequestResponse;
pub use request_stream::RequestStream;
pub use resume::Resume;
pub use resume_ok::ResumeOK;
pub use setup::{Setup, SetupBuilder, Version, CURRENT_VERSION};
pub use utils::Writeable;

use crate::error::{RSocketError, RSocketResult};

pub const FLAG_NEXT: u16 = 0x01 << 5;
pub const FLAG_COMPLETE: u16 = 0x01 << 6;
pub const FLAG_FOLLOW: u16 = 0x01 << 7;
pub const FLAG_METADATA: u16 = 0x01 << 8;
pub const FLAG_IGNORE: u16 = 0x01 << 9;
/// SETUP reuses the COMPLETE bit position to mean "this peer will honor LEASE".
pub const FLAG_LEASE: u16 = FLAG_COMPLETE;
/// SETUP reuses the FOLLOWS bit position to mean "a resume token follows".
pub const FLAG_RESUME: u16 = FLAG_FOLLOW;
/// KEEPALIVE reuses the FOLLOWS bit position to mean "reply with a KEEPALIVE".
pub const FLAG_RESPOND: u16 = FLAG_FOLLOW;

pub const TYPE_SETUP: u16 = 0x01;
pub const TYPE_LEASE: u16 = 0x02;
pub const TYPE_KEEPALIVE: u16 = 0x03;
pub const TYPE_REQUEST_RESPONSE: u16 = 0x04;
pub const TYPE_REQUEST_FNF: u16 = 0x05;
pub const TYPE_REQUEST_STREAM: u16 = 0x06;
pub const TYPE_REQUEST_CHANNEL: u16 = 0x07;
pub const TYPE_REQUEST_N: u16 = 0x08;
pub const TYPE_CANCEL: u16 = 0x09;
pub const TYPE_PAYLOAD: u16 = 0x0A;
pub const TYPE_ERROR: u16 = 0x0B;
pub const TYPE_METADATA_PUSH: u16 = 0x0C;
pub const TYPE_RESUME: u16 = 0x0D;
pub const TYPE_RESUME_OK: u16 = 0x0E;
pub const TYPE_EXT: u16 = 0x3F;

pub const ERR_INVALID_SETUP: u32 = 0x0000_0001;
pub const ERR_UNSUPPORTED_SETUP: u32 = 0x0000_0002;
pub const ERR_REJECT_SETUP: u32 = 0x0000_0003;
pub const ERR_REJECT_RESUME: u32 = 0x0000_0004;
pub const ERR_CONN_FAILED: u32 = 0x0000_0101;
pub const ERR_CONN_CLOSED: u32 = 0x0000_0102;
pub const ERR_APPLICATION: u32 = 0x0000_0201;
pub const ERR_REJECTED: u32 = 0x0000_0202;
pub const ERR_CANCELED: u32 = 0x0000_0203;
pub const ERR_INVALID: u32 = 0x0000_0204;

pub const REQUEST_MAX: u32 = 2_147_483_647;
const LEN_HEADER: u32 = 6;
const STREAM_ID_MASK: u32 = 0x7FFF_FFFF;

/// Stream ids for which stream id 0 is mandatory (§3). ERROR is deliberately
/// excluded: it is valid at both stream id 0 (connection error) and > 0
/// (per-stream error), so its id is validated against its error code instead
/// (see `RSocketError::from_error_frame`).
fn requires_stream_zero(kind: u16) -> bool {
    matches!(
        kind,
        TYPE_SETUP | TYPE_LEASE | TYPE_KEEPALIVE | TYPE_METADATA_PUSH | TYPE_RESUME | TYPE_RESUME_OK
    )
}

/// Stream ids for which stream id 0 is forbidden (§3): every per-stream frame
/// type other than ERROR, which is allowed at 0 for connection-level errors.
fn forbids_stream_zero(kind: u16) -> bool {
    matches!(
        kind,
        TYPE_REQUEST_RESPONSE
            | TYPE_REQUEST_FNF
            | TYPE_REQUEST_STREAM
            | TYPE_REQUEST_CHANNEL
            | TYPE_REQUEST_N
            | TYPE_CANCEL
            | TYPE_PAYLOAD
    )
}

#[derive(Debug, Clone)]
pub enum Body {
    Setup(Setup),
    Lease(Lease),
    Keepalive(Keepalive),
    RequestFNF(RequestFNF),
    RequestResponse(RequestResponse),
    RequestStream(RequestStream),
    RequestChannel(RequestChannel),
    RequestN(RequestN),
    Cancel(),
    Payload(Payload),
    Error(Error),
    MetadataPush(MetadataPush),
    Resume(Resume),
    ResumeOK(ResumeOK),
    /// An unrecognized frame type received with the IGNORE flag set. The raw
    /// body bytes are kept only so callers can log them; they're never acted on.
    Ext(Bytes),
}

#[derive(Debug, Clone)]
pub struct Frame {
    stream_id: u32,
    body: Body,
    flag: u16,
}

impl Writeable for Frame {
    fn write_to(&self, bf: &mut BytesMut) {
        bf.put_u32(self.stream_id & STREAM_ID_MASK);
        bf.put_u16((to_frame_type(&self.body) << 10) | self.flag);
        match &self.body {
            Body::Setup(v) => v.write_to(bf),
            Body::RequestResponse(v) => v.write_to(bf),
            Body::RequestStream(v) => v.write_to(bf),
            Body::RequestChannel(v) => v.write_to(bf),
            Body::RequestFNF(v) => v.write_to(bf),
            Body::RequestN(v) => v.write_to(bf),
            Body::MetadataPush(v) => v.write_to(bf),
            Body::Keepalive(v) => v.write_to(bf),
            Body::Payload(v) => v.write_to(bf),
            Body::Lease(v) => v.write_to(bf),
            Body::Error(v) => v.write_to(bf),
            Body::Cancel() => (),
            Body::Resume(v) => v.write_to(bf),
            Body::ResumeOK(v) => v.write_to(bf),
            Body::Ext(raw) => bf.put_slice(raw),
        }
    }

    fn len(&self) -> u32 {
        LEN_HEADER
            + match &self.body {
                Body::Setup(v) => v.len(),
                Body::RequestResponse(v) => v.len(),
                Body::RequestStream(v) => v.len(),
                Body::RequestChannel(v) => v.len(),
                Body::RequestFNF(v) => v.len(),
                Body::RequestN(v) => v.len(),
                Body::MetadataPush(v) => v.len(),
                Body::Keepalive(v) => v.len(),
                Body::Payload(v) => v.len(),
                Body::Lease(v) => v.len(),
                Body::Cancel() => 0,
                Body::Error(v) => v.len(),
                Body::Resume(v) => v.len(),
                Body::ResumeOK(v) => v.len(),
                Body::Ext(raw) => raw.len() as u32,
            }
    }
}

impl Frame {
    pub fn new(stream_id: u32, body: Body, flag: u16) -> Frame {
        Frame {
            stream_id: stream_id & STREAM_ID_MASK,
            body,
            flag,
        }
    }

    /// Decode one already length-delimited frame. `b` must contain exactly
    /// this frame's bytes (the caller strips the outer u24 length prefix).
    pub fn decode(b: &mut BytesMut) -> RSocketResult<Frame> {
        if b.remaining() < LEN_HEADER as usize {
            return Err(RSocketError::MalformedFrame(
                "frame shorter than the 6-byte common header".into(),
            ));
        }
        let sid = b.get_u32() & STREAM_ID_MASK;
        let n = b.get_u16();
        let (flag, kind) = (n & 0x03FF, (n & 0xFC00) >> 10);

        if requires_stream_zero(kind) && sid != 0 {
            return Err(RSocketError::MalformedFrame(format!(
                "frame type {} must use stream id 0, got {}",
                kind, sid
            )));
        }
        if forbids_stream_zero(kind) && sid == 0 {
            return Err(RSocketError::MalformedFrame(format!(
                "frame type {} must not use stream id 0",
                kind
            )));
        }

        let body = match kind {
            TYPE_SETUP => Setup::decode(flag, b).map(Body::Setup),
            TYPE_LEASE => Lease::decode(flag, b).map(Body::Lease),
            TYPE_KEEPALIVE => Keepalive::decode(flag, b).map(Body::Keepalive),
            TYPE_REQUEST_RESPONSE => RequestResponse::decode(flag, b).map(Body::RequestResponse),
            TYPE_REQUEST_FNF => RequestFNF::decode(flag, b).map(Body::RequestFNF),
            TYPE_REQUEST_STREAM => RequestStream::decode(flag, b).map(Body::RequestStream),
            TYPE_REQUEST_CHANNEL => RequestChannel::decode(flag, b).map(Body::RequestChannel),
            TYPE_REQUEST_N => RequestN::decode(flag, b).map(Body::RequestN),
            TYPE_CANCEL => Ok(Body::Cancel()),
            TYPE_PAYLOAD => Payload::decode(flag, b).map(Body::Payload),
            TYPE_ERROR => Error::decode(flag, b).map(Body::Error),
            TYPE_METADATA_PUSH => MetadataPush::decode(flag, b).map(Body::MetadataPush),
            TYPE_RESUME => Resume::decode(flag, b).map(Body::Resume),
            TYPE_RESUME_OK => ResumeOK::decode(flag, b).map(Body::ResumeOK),
            _ if flag & FLAG_IGNORE != 0 => Ok(Body::Ext(b.split_to(b.remaining()).freeze())),
            other => Err(RSocketError::MalformedFrame(format!(
                "unknown frame type {} without IGNORE flag",
                other
            ))),
        };
        body.map(|it| Frame::new(sid, it, flag))
    }

    pub fn get_body(&self) -> &Body {
        &self.body
    }

    pub fn into_body(self) -> Body {
        self.body
    }

    pub fn get_frame_type(&self) -> u16 {
        to_frame_type(&self.body)
    }

    pub fn get_flag(&self) -> u16 {
        self.flag
    }

    pub fn get_stream_id(&self) -> u32 {
        self.stream_id
    }

    pub fn has_next(&self) -> bool {
        self.flag & FLAG_NEXT != 0
    }

    pub fn has_complete(&self) -> bool {
        self.flag & FLAG_COMPLETE != 0
    }

    pub fn has_follows(&self) -> bool {
        self.flag & FLAG_FOLLOW != 0
    }

    pub fn has_metadata(&self) -> bool {
        self.flag & FLAG_METADATA != 0
    }

    pub fn has_ignore(&self) -> bool {
        self.flag & FLAG_IGNORE != 0
    }
}

fn to_frame_type(body: &Body) -> u16 {
    match body {
        Body::Setup(_) => TYPE_SETUP,
        Body::Lease(_) => TYPE_LEASE,
        Body::Keepalive(_) => TYPE_KEEPALIVE,
        Body::RequestResponse(_) => TYPE_REQUEST_RESPONSE,
        Body::RequestFNF(_) => TYPE_REQUEST_FNF,
        Body::RequestStream(_) => TYPE_REQUEST_STREAM,
        Body::RequestChannel(_) => TYPE_REQUEST_CHANNEL,
        Body::RequestN(_) => TYPE_REQUEST_N,
        Body::Cancel() => TYPE_CANCEL,
        Body::Payload(_) => TYPE_PAYLOAD,
        Body::Error(_) => TYPE_ERROR,
        Body::MetadataPush(_) => TYPE_METADATA_PUSH,
        Body::Resume(_) => TYPE_RESUME,
        Body::ResumeOK(_) => TYPE_RESUME_OK,
        Body::Ext(_) => TYPE_EXT,
    }
}
