use super::{Body, Frame};

/// CANCEL has no body; the common header (stream id + type + flags) says it all.
pub struct Cancel;

impl Cancel {
    pub fn new(stream_id: u32, flag: u16) -> Frame {
        Frame::new(stream_id, Body::Cancel(), flag)
    }
}
