use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::utils::{require_remaining, PayloadSupport, Writeable};
use super::{Body, Frame, FLAG_METADATA};
use crate::error::RSocketResult;

#[derive(Debug, Clone, PartialEq)]
pub struct RequestStream {
    initial_request_n: u32,
    metadata: Option<Bytes>,
    data: Option<Bytes>,
}

pub struct RequestStreamBuilder {
    stream_id: u32,
    flag: u16,
    value: RequestStream,
}

impl RequestStreamBuilder {
    fn new(stream_id: u32, flag: u16) -> RequestStreamBuilder {
        RequestStreamBuilder {
            stream_id,
            flag,
            value: RequestStream {
                initial_request_n: 1,
                metadata: None,
                data: None,
            },
        }
    }

    pub fn build(self) -> Frame {
        Frame::new(self.stream_id, Body::RequestStream(self.value), self.flag)
    }

    pub fn set_initial_request_n(mut self, n: u32) -> Self {
        self.value.initial_request_n = n;
        self
    }

    pub fn set_metadata(mut self, metadata: Bytes) -> Self {
        self.value.metadata = Some(metadata);
        self.flag |= FLAG_METADATA;
        self
    }

    pub fn set_data(mut self, data: Bytes) -> Self {
        self.value.data = Some(data);
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
}

impl RequestStream {
    pub fn decode(flag: u16, bf: &mut BytesMut) -> RSocketResult<RequestStream> {
        require_remaining(bf, 4, "REQUEST_STREAM initial request n")?;
        let initial_request_n = bf.get_u32();
        let (metadata, data) = PayloadSupport::read(flag, bf);
        Ok(RequestStream {
            initial_request_n,
            metadata,
            data,
        })
    }

    pub fn builder(stream_id: u32, flag: u16) -> RequestStreamBuilder {
        RequestStreamBuilder::new(stream_id, flag)
    }

    pub fn get_initial_request_n(&self) -> u32 {
        self.initial_request_n
    }

    pub fn get_metadata(&self) -> &Option<Bytes> {
        &self.metadata
    }

    pub fn get_data(&self) -> &Option<Bytes> {
        &self.data
    }

    pub fn split(self) -> (Option<Bytes>, Option<Bytes>) {
        (self.data, self.metadata)
    }
}

impl Writeable for RequestStream {
    fn write_to(&self, bf: &mut BytesMut) {
        bf.put_u32(self.initial_request_n);
        PayloadSupport::write(bf, &self.metadata, &self.data);
    }

    fn len(&self) -> u32 {
        4 + PayloadSupport::len(&self.metadata, &self.data)
    }
}
