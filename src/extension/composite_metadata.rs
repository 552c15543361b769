//! Composite metadata (§4.2): a metadata payload that is itself a sequence of
//! MIME-tagged entries. Round-trip law: `parse(serialize(entries)) == entries`
//! for any sequence of entries.
use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::mime;
use crate::error::{RSocketError, RSocketResult};
use crate::frame::utils::{read_u24, require_remaining, write_u24};

const WELL_KNOWN_BIT: u8 = 0x80;
const MIME_LEN_MASK: u8 = 0x7F;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mime {
    WellKnown(u8),
    Custom(String),
}

impl Mime {
    pub fn well_known_by_name(name: &str) -> Mime {
        match mime::id_for_name(name) {
            Some(id) => Mime::WellKnown(id),
            None => Mime::Custom(name.to_owned()),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Mime::WellKnown(id) => mime::name_for_id(*id),
            Mime::Custom(s) => Some(s.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeMetadataEntry {
    pub mime: Mime,
    pub content: Bytes,
}

impl CompositeMetadataEntry {
    pub fn new(mime: Mime, content: Bytes) -> CompositeMetadataEntry {
        CompositeMetadataEntry { mime, content }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompositeMetadata {
    entries: Vec<CompositeMetadataEntry>,
}

impl CompositeMetadata {
    pub fn new() -> CompositeMetadata {
        CompositeMetadata { entries: Vec::new() }
    }

    pub fn push(&mut self, entry: CompositeMetadataEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[CompositeMetadataEntry] {
        &self.entries
    }

    pub fn parse(bytes: &Bytes) -> RSocketResult<CompositeMetadata> {
        let mut buf = BytesMut::from(&bytes[..]);
        let mut entries = Vec::new();
        while buf.has_remaining() {
            require_remaining(&buf, 1, "composite metadata entry header")?;
            let head = buf.get_u8();
            let mime = if head & WELL_KNOWN_BIT != 0 {
                Mime::WellKnown(head & MIME_LEN_MASK)
            } else {
                let len = (head & MIME_LEN_MASK) as usize;
                require_remaining(&buf, len, "composite metadata inline mime")?;
                let raw = buf.split_to(len);
                let name = String::from_utf8(raw.to_vec()).map_err(|e| {
                    RSocketError::MalformedFrame(format!("non-utf8 composite mime: {}", e))
                })?;
                Mime::Custom(name)
            };
            require_remaining(&buf, 3, "composite metadata entry length")?;
            let entry_len = read_u24(&mut buf) as usize;
            require_remaining(&buf, entry_len, "composite metadata entry body")?;
            let content = buf.split_to(entry_len).freeze();
            entries.push(CompositeMetadataEntry { mime, content });
        }
        Ok(CompositeMetadata { entries })
    }

    pub fn serialize(&self) -> Bytes {
        let mut bf = BytesMut::new();
        for entry in &self.entries {
            match &entry.mime {
                Mime::WellKnown(id) => bf.put_u8(WELL_KNOWN_BIT | (id & MIME_LEN_MASK)),
                Mime::Custom(name) => {
                    bf.put_u8(name.len() as u8 & MIME_LEN_MASK);
                    bf.put_slice(name.as_bytes());
                }
            }
            write_u24(&mut bf, entry.content.len() as u32);
            bf.put_slice(&entry.content);
        }
        bf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_mixed_entries() {
        let mut composite = CompositeMetadata::new();
        composite.push(CompositeMetadataEntry::new(
            Mime::WellKnown(0x05),
            Bytes::from_static(b"{}"),
        ));
        composite.push(CompositeMetadataEntry::new(
            Mime::Custom("x-application/my-custom-type".into()),
            Bytes::from_static(b"payload"),
        ));

        let serialized = composite.serialize();
        let parsed = CompositeMetadata::parse(&serialized).unwrap();
        assert_eq!(parsed, composite);
    }

    #[test]
    fn empty_composite_round_trips() {
        let composite = CompositeMetadata::new();
        let serialized = composite.serialize();
        assert!(serialized.is_empty());
        assert_eq!(CompositeMetadata::parse(&serialized).unwrap(), composite);
    }

    #[test]
    fn truncated_entry_is_malformed() {
        let mut bf = BytesMut::new();
        bf.put_u8(WELL_KNOWN_BIT | 0x05);
        write_u24(&mut bf, 10);
        bf.put_slice(b"short");
        assert!(CompositeMetadata::parse(&bf.freeze()).is_err());
    }
}
