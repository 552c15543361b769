use bytes::{Bytes, BytesMut};

use super::utils::{PayloadSupport, Writeable};
use super::{Body, Frame, FLAG_COMPLETE, FLAG_METADATA, FLAG_NEXT};
use crate::error::RSocketResult;

/// Body of a PAYLOAD frame. Also doubles as the application-level data model
/// (§3): a pair of optional opaque byte sequences, data and metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Payload {
    metadata: Option<Bytes>,
    data: Option<Bytes>,
}

pub struct PayloadBuilder {
    stream_id: u32,
    flag: u16,
    value: Payload,
}

impl Payload {
    pub fn new(data: Option<Bytes>, metadata: Option<Bytes>) -> Payload {
        Payload { data, metadata }
    }

    pub fn builder(stream_id: u32, flag: u16) -> PayloadBuilder {
        PayloadBuilder::new(stream_id, flag)
    }

    pub fn decode(flag: u16, bf: &mut BytesMut) -> RSocketResult<Payload> {
        let (metadata, data) = PayloadSupport::read(flag, bf);
        Ok(Payload { metadata, data })
    }

    pub fn get_data(&self) -> &Option<Bytes> {
        &self.data
    }

    pub fn get_metadata(&self) -> &Option<Bytes> {
        &self.metadata
    }

    pub fn has_metadata(&self) -> bool {
        self.metadata.is_some()
    }

    pub fn split(self) -> (Option<Bytes>, Option<Bytes>) {
        (self.data, self.metadata)
    }
}

impl PayloadBuilder {
    fn new(stream_id: u32, flag: u16) -> PayloadBuilder {
        PayloadBuilder {
            stream_id,
            flag,
            value: Payload::default(),
        }
    }

    pub fn build(self) -> Frame {
        Frame::new(self.stream_id, Body::Payload(self.value), self.flag)
    }

    pub fn set_data(mut self, data: Bytes) -> Self {
        self.value.data = Some(data);
        self
    }

    pub fn set_metadata(mut self, metadata: Bytes) -> Self {
        self.value.metadata = Some(metadata);
        self.flag |= FLAG_METADATA;
        self
    }

    pub fn set_all(mut self, data_and_metadata: (Option<Bytes>, Option<Bytes>)) -> Self {
        self.value.data = data_and_metadata.0;
        match data_and_metadata.1 {
            Some(m) => {
                self.value.metadata = Some(m);
                self.flag |= FLAG_METADATA;
            }
            None => {
                self.value.metadata = None;
                self.flag &= !FLAG_METADATA;
            }
        }
        self
    }

    pub fn set_next(mut self, next: bool) -> Self {
        if next {
            self.flag |= FLAG_NEXT;
        } else {
            self.flag &= !FLAG_NEXT;
        }
        self
    }

    pub fn set_complete(mut self, complete: bool) -> Self {
        if complete {
            self.flag |= FLAG_COMPLETE;
        } else {
            self.flag &= !FLAG_COMPLETE;
        }
        self
    }
}

impl Writeable for Payload {
    fn write_to(&self, bf: &mut BytesMut) {
        PayloadSupport::write(bf, &self.metadata, &self.data);
    }

    fn len(&self) -> u32 {
        PayloadSupport::len(&self.metadata, &self.data)
    }
}
