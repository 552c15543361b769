use bytes::{Buf, BufMut, BytesMut};

use super::utils::{require_remaining, Writeable};
use super::{Body, Frame};
use crate::error::RSocketResult;

/// Body of a RESUME_OK frame: the responder's acknowledgement that it can
/// resume, echoing the position up to which it has received client frames.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeOK {
    last_received_client_position: u64,
}

impl ResumeOK {
    pub fn new(stream_id: u32, last_received_client_position: u64) -> Frame {
        Frame::new(
            stream_id,
            Body::ResumeOK(ResumeOK {
                last_received_client_position,
            }),
            0,
        )
    }

    pub fn decode(_flag: u16, bf: &mut BytesMut) -> RSocketResult<ResumeOK> {
        require_remaining(bf, 8, "RESUME_OK position")?;
        Ok(ResumeOK {
            last_received_client_position: bf.get_u64(),
        })
    }

    pub fn get_last_received_client_position(&self) -> u64 {
        self.last_received_client_position
    }
}

impl Writeable for ResumeOK {
    fn write_to(&self, bf: &mut BytesMut) {
        bf.put_u64(self.last_received_client_position);
    }

    fn len(&self) -> u32 {
        8
    }
}
