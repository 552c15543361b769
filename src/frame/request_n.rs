use bytes::{Buf, BufMut, BytesMut};

use super::utils::{require_remaining, Writeable};
use super::{Body, Frame};
use crate::error::RSocketResult;

#[derive(Debug, Clone, PartialEq)]
pub struct RequestN {
    n: u32,
}

impl RequestN {
    pub fn new(stream_id: u32, n: u32, flag: u16) -> Frame {
        Frame::new(stream_id, Body::RequestN(RequestN { n }), flag)
    }

    pub fn decode(_flag: u16, bf: &mut BytesMut) -> RSocketResult<RequestN> {
        require_remaining(bf, 4, "REQUEST_N")?;
        Ok(RequestN { n: bf.get_u32() })
    }

    pub fn get_request_n(&self) -> u32 {
        self.n
    }
}

impl Writeable for RequestN {
    fn write_to(&self, bf: &mut BytesMut) {
        bf.put_u32(self.n);
    }

    fn len(&self) -> u32 {
        4
    }
}
