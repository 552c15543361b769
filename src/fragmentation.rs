//! Fragmenter / Reassembler (§4.3, component 4 of the core): splits an
//! oversized payload across multiple frames on the way out, and rejoins a
//! FOLLOWS chain into one logical frame on the way in.
use std::collections::HashMap;

use bytes::{Bytes, BytesMut};

use crate::error::{RSocketError, RSocketResult};
use crate::frame::Frame;

/// One slice of a payload split across frames. `is_last` tells the caller
/// whether to set FOLLOWS (clear on the last chunk, set on every other one).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub metadata: Option<Bytes>,
    pub data: Option<Bytes>,
    pub is_last: bool,
}

/// Splits a payload's metadata/data pair into MTU-sized chunks. Metadata
/// bytes are entirely consumed before any data bytes are emitted, per §4.3.
pub struct Fragmenter;

impl Fragmenter {
    /// `mtu == 0` disables fragmentation: always yields exactly one chunk.
    pub fn split(metadata: Option<Bytes>, data: Option<Bytes>, mtu: usize) -> Vec<Chunk> {
        let total = metadata.as_ref().map(Bytes::len).unwrap_or(0)
            + data.as_ref().map(Bytes::len).unwrap_or(0);
        if mtu == 0 || total <= mtu {
            return vec![Chunk {
                metadata,
                data,
                is_last: true,
            }];
        }

        let mut remaining_metadata = metadata.unwrap_or_default();
        let mut remaining_data = data.unwrap_or_default();
        let mut chunks = Vec::new();

        loop {
            let mut budget = mtu;
            let metadata_take = remaining_metadata.len().min(budget);
            let chunk_metadata = if metadata_take > 0 || !remaining_metadata.is_empty() {
                Some(remaining_metadata.split_to(metadata_take))
            } else {
                None
            };
            budget -= metadata_take;

            let data_take = remaining_data.len().min(budget);
            let chunk_data = if data_take > 0 {
                Some(remaining_data.split_to(data_take))
            } else {
                None
            };

            let is_last = remaining_metadata.is_empty() && remaining_data.is_empty();
            chunks.push(Chunk {
                metadata: chunk_metadata,
                data: chunk_data,
                is_last,
            });

            if is_last {
                break;
            }
        }
        chunks
    }
}

struct PendingReassembly {
    frame_type: u16,
    metadata: BytesMut,
    data: BytesMut,
}

/// Accumulates FOLLOWS chains per stream id until the terminating frame
/// arrives, then hands back one logical (metadata, data) payload.
#[derive(Default)]
pub struct Reassembler {
    pending: HashMap<u32, PendingReassembly>,
}

impl Reassembler {
    pub fn new() -> Reassembler {
        Reassembler {
            pending: HashMap::new(),
        }
    }

    /// Feed one fragment. Returns `Some((metadata, data))` once the chain is
    /// complete (including the degenerate case of a single unfragmented frame).
    pub fn accept(
        &mut self,
        stream_id: u32,
        frame_type: u16,
        follows: bool,
        metadata: Option<Bytes>,
        data: Option<Bytes>,
    ) -> RSocketResult<Option<(Option<Bytes>, Option<Bytes>)>> {
        match self.pending.remove(&stream_id) {
            Some(mut pending) => {
                if frame_type != crate::frame::TYPE_PAYLOAD && frame_type != pending.frame_type {
                    return Err(RSocketError::FragmentTypeMismatch);
                }
                if let Some(m) = metadata {
                    pending.metadata.extend_from_slice(&m);
                }
                if let Some(d) = data {
                    pending.data.extend_from_slice(&d);
                }
                if follows {
                    self.pending.insert(stream_id, pending);
                    Ok(None)
                } else {
                    Ok(Some(finish(pending)))
                }
            }
            None => {
                if !follows {
                    return Ok(Some((metadata, data)));
                }
                let mut pending = PendingReassembly {
                    frame_type,
                    metadata: BytesMut::new(),
                    data: BytesMut::new(),
                };
                if let Some(m) = metadata {
                    pending.metadata.extend_from_slice(&m);
                }
                if let Some(d) = data {
                    pending.data.extend_from_slice(&d);
                }
                self.pending.insert(stream_id, pending);
                Ok(None)
            }
        }
    }

    /// A continuation (PAYLOAD type) fragment arrived for a stream id with no
    /// prior first fragment buffered: `MissingFirstFragment`.
    pub fn reject_orphan_continuation(&self, stream_id: u32, frame_type: u16) -> RSocketResult<()> {
        if frame_type == crate::frame::TYPE_PAYLOAD && !self.pending.contains_key(&stream_id) {
            return Err(RSocketError::MissingFirstFragment);
        }
        Ok(())
    }

    pub fn discard(&mut self, stream_id: u32) {
        self.pending.remove(&stream_id);
    }
}

fn finish(pending: PendingReassembly) -> (Option<Bytes>, Option<Bytes>) {
    let metadata = if pending.metadata.is_empty() {
        None
    } else {
        Some(pending.metadata.freeze())
    };
    let data = if pending.data.is_empty() {
        None
    } else {
        Some(pending.data.freeze())
    };
    (metadata, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::TYPE_REQUEST_RESPONSE;

    #[test]
    fn disabled_mtu_yields_single_chunk() {
        let chunks = Fragmenter::split(None, Some(Bytes::from_static(b"hello")), 0);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_last);
    }

    #[test]
    fn splits_metadata_before_data() {
        let metadata = Bytes::from(vec![b'm'; 10]);
        let data = Bytes::from(vec![b'd'; 10]);
        let chunks = Fragmenter::split(Some(metadata.clone()), Some(data.clone()), 6);
        assert!(chunks.len() > 1);
        assert!(!chunks[0].is_last);
        assert!(chunks.last().unwrap().is_last);

        let mut reassembler = Reassembler::new();
        let mut result = None;
        for (i, chunk) in chunks.iter().enumerate() {
            let frame_type = if i == 0 {
                TYPE_REQUEST_RESPONSE
            } else {
                crate::frame::TYPE_PAYLOAD
            };
            result = reassembler
                .accept(1, frame_type, !chunk.is_last, chunk.metadata.clone(), chunk.data.clone())
                .unwrap();
        }
        let (got_metadata, got_data) = result.unwrap();
        assert_eq!(got_metadata, Some(metadata));
        assert_eq!(got_data, Some(data));
    }

    #[test]
    fn sixty_four_kib_payload_fragments_into_many_frames() {
        let data = Bytes::from(vec![7u8; 64 * 1024]);
        let chunks = Fragmenter::split(None, Some(data.clone()), 1024);
        assert!(chunks.len() >= 65);

        let mut reassembler = Reassembler::new();
        let mut result = None;
        for (i, chunk) in chunks.iter().enumerate() {
            let frame_type = if i == 0 {
                TYPE_REQUEST_RESPONSE
            } else {
                crate::frame::TYPE_PAYLOAD
            };
            result = reassembler
                .accept(2, frame_type, !chunk.is_last, chunk.metadata.clone(), chunk.data.clone())
                .unwrap();
        }
        assert_eq!(result.unwrap().1, Some(data));
    }

    #[test]
    fn continuation_type_mismatch_is_rejected() {
        let mut reassembler = Reassembler::new();
        reassembler
            .accept(1, TYPE_REQUEST_RESPONSE, true, None, Some(Bytes::from_static(b"a")))
            .unwrap();
        let err = reassembler.accept(1, 0x06, true, None, Some(Bytes::from_static(b"b")));
        assert!(err.is_err());
    }

    #[test]
    fn orphan_continuation_is_detected() {
        let reassembler = Reassembler::new();
        assert!(reassembler
            .reject_orphan_continuation(9, crate::frame::TYPE_PAYLOAD)
            .is_err());
    }
}
