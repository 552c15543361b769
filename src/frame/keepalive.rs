use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::utils::{require_remaining, Writeable};
use super::{Body, Frame, FLAG_RESPOND};
use crate::error::RSocketResult;

/// Body of a KEEPALIVE frame (§4.6). `last_received_position` is only meaningful
/// when resume is negotiated; it is 0 otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct Keepalive {
    last_received_position: u64,
    data: Option<Bytes>,
}

pub struct KeepaliveBuilder {
    stream_id: u32,
    flag: u16,
    value: Keepalive,
}

impl KeepaliveBuilder {
    fn new(stream_id: u32, flag: u16) -> KeepaliveBuilder {
        KeepaliveBuilder {
            stream_id,
            flag,
            value: Keepalive {
                last_received_position: 0,
                data: None,
            },
        }
    }

    pub fn build(self) -> Frame {
        Frame::new(self.stream_id, Body::Keepalive(self.value), self.flag)
    }

    pub fn set_last_received_position(mut self, position: u64) -> Self {
        self.value.last_received_position = position;
        self
    }

    pub fn set_respond(mut self, respond: bool) -> Self {
        if respond {
            self.flag |= FLAG_RESPOND;
        } else {
            self.flag &= !FLAG_RESPOND;
        }
        self
    }

    pub fn set_data(mut self, data: Bytes) -> Self {
        self.value.data = Some(data);
        self
    }
}

impl Keepalive {
    pub fn decode(_flag: u16, bf: &mut BytesMut) -> RSocketResult<Keepalive> {
        require_remaining(bf, 8, "KEEPALIVE last received position")?;
        let last_received_position = bf.get_u64();
        let data = if bf.has_remaining() {
            Some(bf.split_to(bf.remaining()).freeze())
        } else {
            None
        };
        Ok(Keepalive {
            last_received_position,
            data,
        })
    }

    pub fn builder(stream_id: u32, flag: u16) -> KeepaliveBuilder {
        KeepaliveBuilder::new(stream_id, flag)
    }

    pub fn get_last_received_position(&self) -> u64 {
        self.last_received_position
    }

    pub fn get_data(&self) -> &Option<Bytes> {
        &self.data
    }
}

impl Writeable for Keepalive {
    fn write_to(&self, bf: &mut BytesMut) {
        bf.put_u64(self.last_received_position);
        if let Some(d) = &self.data {
            bf.put_slice(d);
        }
    }

    fn len(&self) -> u32 {
        8 + self.data.as_ref().map(|d| d.len() as u32).unwrap_or(0)
    }
}
