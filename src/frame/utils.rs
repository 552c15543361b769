use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::FLAG_METADATA;
use crate::error::RSocketResult;

/// Implemented by every frame body: write its wire bytes and report their length.
///
/// `len()` excludes the 6-byte common header (stream id + type/flags) that
/// `Frame::write_to` writes once for every body.
pub trait Writeable {
    fn write_to(&self, bf: &mut BytesMut);
    fn len(&self) -> u32;
}

/// Metadata/data pair shared by every frame whose body is "optional metadata,
/// then data filling the rest" (REQUEST_FNF, REQUEST_RESPONSE, REQUEST_STREAM's
/// tail, REQUEST_CHANNEL's tail, PAYLOAD, METADATA_PUSH).
pub struct PayloadSupport;

impl PayloadSupport {
    /// `flag` is the frame's 10-bit flag field; only FLAG_METADATA is consulted.
    pub fn read(flag: u16, bf: &mut BytesMut) -> (Option<Bytes>, Option<Bytes>) {
        let metadata = if flag & FLAG_METADATA != 0 {
            let metadata_len = read_u24(bf) as usize;
            Some(bf.split_to(metadata_len).freeze())
        } else {
            None
        };
        let data = if bf.has_remaining() {
            Some(bf.split_to(bf.remaining()).freeze())
        } else {
            None
        };
        (metadata, data)
    }

    pub fn write(bf: &mut BytesMut, metadata: &Option<Bytes>, data: &Option<Bytes>) {
        if let Some(m) = metadata {
            write_u24(bf, m.len() as u32);
            bf.put_slice(m);
        }
        if let Some(d) = data {
            bf.put_slice(d);
        }
    }

    pub fn len(metadata: &Option<Bytes>, data: &Option<Bytes>) -> u32 {
        let mut n = 0u32;
        if let Some(m) = metadata {
            n += 3 + m.len() as u32;
        }
        if let Some(d) = data {
            n += d.len() as u32;
        }
        n
    }
}

/// Read a big-endian 24-bit unsigned integer and advance the buffer past it.
pub fn read_u24(bf: &mut BytesMut) -> u32 {
    bf.get_uint(3) as u32
}

/// Write `v` as a big-endian 24-bit unsigned integer. `v` must fit in 24 bits.
pub fn write_u24(bf: &mut BytesMut, v: u32) {
    bf.put_uint(v as u64, 3);
}

pub fn require_remaining(bf: &BytesMut, n: usize, what: &str) -> RSocketResult<()> {
    if bf.remaining() < n {
        Err(crate::error::RSocketError::MalformedFrame(format!(
            "truncated {}: need {} more bytes",
            what, n
        )))
    } else {
        Ok(())
    }
}
