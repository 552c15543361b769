use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::utils::{require_remaining, Writeable};
use super::{Body, Frame, FLAG_METADATA};
use crate::error::RSocketResult;

/// Body of a LEASE frame (§4.7). Carries no data, only an optional metadata entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Lease {
    time_to_live_millis: u32,
    number_of_requests: u32,
    metadata: Option<Bytes>,
}

pub struct LeaseBuilder {
    stream_id: u32,
    flag: u16,
    value: Lease,
}

impl LeaseBuilder {
    fn new(stream_id: u32, flag: u16) -> LeaseBuilder {
        LeaseBuilder {
            stream_id,
            flag,
            value: Lease {
                time_to_live_millis: 0,
                number_of_requests: 0,
                metadata: None,
            },
        }
    }

    pub fn build(self) -> Frame {
        Frame::new(self.stream_id, Body::Lease(self.value), self.flag)
    }

    pub fn set_time_to_live_millis(mut self, millis: u32) -> Self {
        self.value.time_to_live_millis = millis;
        self
    }

    pub fn set_number_of_requests(mut self, n: u32) -> Self {
        self.value.number_of_requests = n;
        self
    }

    pub fn set_metadata(mut self, metadata: Bytes) -> Self {
        self.value.metadata = Some(metadata);
        self.flag |= FLAG_METADATA;
        self
    }
}

impl Lease {
    pub fn decode(flag: u16, bf: &mut BytesMut) -> RSocketResult<Lease> {
        require_remaining(bf, 8, "LEASE fixed header")?;
        let time_to_live_millis = bf.get_u32();
        let number_of_requests = bf.get_u32();
        let metadata = if flag & FLAG_METADATA != 0 && bf.has_remaining() {
            Some(bf.split_to(bf.remaining()).freeze())
        } else {
            None
        };
        Ok(Lease {
            time_to_live_millis,
            number_of_requests,
            metadata,
        })
    }

    pub fn builder(stream_id: u32, flag: u16) -> LeaseBuilder {
        LeaseBuilder::new(stream_id, flag)
    }

    pub fn get_time_to_live_millis(&self) -> u32 {
        self.time_to_live_millis
    }

    pub fn get_number_of_requests(&self) -> u32 {
        self.number_of_requests
    }

    pub fn get_metadata(&self) -> &Option<Bytes> {
        &self.metadata
    }
}

impl Writeable for Lease {
    fn write_to(&self, bf: &mut BytesMut) {
        bf.put_u32(self.time_to_live_millis);
        bf.put_u32(self.number_of_requests);
        if let Some(m) = &self.metadata {
            bf.put_slice(m);
        }
    }

    fn len(&self) -> u32 {
        8 + self.metadata.as_ref().map(|m| m.len() as u32).unwrap_or(0)
    }
}
