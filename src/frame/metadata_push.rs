use bytes::{BufMut, Bytes, BytesMut};

use super::utils::Writeable;
use super::{Body, Frame, FLAG_METADATA};
use crate::error::RSocketResult;

/// METADATA_PUSH's body is metadata only; since it's the only field its length
/// is implied by the frame's outer length, so no inner length prefix is written.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataPush {
    metadata: Bytes,
}

impl MetadataPush {
    pub fn new(metadata: Bytes) -> Frame {
        Frame::new(0, Body::MetadataPush(MetadataPush { metadata }), FLAG_METADATA)
    }

    pub fn decode(_flag: u16, bf: &mut BytesMut) -> RSocketResult<MetadataPush> {
        let metadata = bf.split_to(bf.len()).freeze();
        Ok(MetadataPush { metadata })
    }

    pub fn get_metadata(&self) -> &Bytes {
        &self.metadata
    }
}

impl Writeable for MetadataPush {
    fn write_to(&self, bf: &mut BytesMut) {
        bf.put_slice(&self.metadata);
    }

    fn len(&self) -> u32 {
        self.metadata.len() as u32
    }
}
