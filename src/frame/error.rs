use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::utils::{require_remaining, Writeable};
use super::{Body, Frame};
use crate::error::RSocketResult;

/// Body of an ERROR frame. Stream id 0 means the error is connection-level;
/// stream id > 0 means it pertains to that stream (see error code table in §6).
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    error_code: u32,
    data: Option<Bytes>,
}

pub struct ErrorBuilder {
    stream_id: u32,
    flag: u16,
    value: Error,
}

impl ErrorBuilder {
    fn new(stream_id: u32, flag: u16, error_code: u32) -> ErrorBuilder {
        ErrorBuilder {
            stream_id,
            flag,
            value: Error {
                error_code,
                data: None,
            },
        }
    }

    pub fn build(self) -> Frame {
        Frame::new(self.stream_id, Body::Error(self.value), self.flag)
    }

    pub fn set_data(mut self, data: Bytes) -> Self {
        self.value.data = Some(data);
        self
    }
}

impl Error {
    pub fn decode(_flag: u16, bf: &mut BytesMut) -> RSocketResult<Error> {
        require_remaining(bf, 4, "ERROR code")?;
        let error_code = bf.get_u32();
        let data = if bf.has_remaining() {
            Some(bf.split_to(bf.remaining()).freeze())
        } else {
            None
        };
        Ok(Error { error_code, data })
    }

    pub fn builder(stream_id: u32, flag: u16, error_code: u32) -> ErrorBuilder {
        ErrorBuilder::new(stream_id, flag, error_code)
    }

    pub fn get_error_code(&self) -> u32 {
        self.error_code
    }

    pub fn get_data(&self) -> &Option<Bytes> {
        &self.data
    }
}

impl Writeable for Error {
    fn write_to(&self, bf: &mut BytesMut) {
        bf.put_u32(self.error_code);
        if let Some(d) = &self.data {
            bf.put_slice(d);
        }
    }

    fn len(&self) -> u32 {
        4 + self.data.as_ref().map(|d| d.len() as u32).unwrap_or(0)
    }
}
