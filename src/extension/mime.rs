//! The RSocket well-known MIME type table (§6): a numeric id <-> name lookup
//! only. The core never interprets what a MIME type's bytes mean.

/// One of the registered well-known MIME type ids (0..127).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WellKnownMimeType {
    pub id: u8,
    pub name: &'static str,
}

macro_rules! well_known {
    ($($id:expr => $name:expr),+ $(,)?) => {
        const TABLE: &[WellKnownMimeType] = &[
            $(WellKnownMimeType { id: $id, name: $name }),+
        ];
    };
}

well_known! {
    0x00 => "application/avro",
    0x01 => "application/cbor",
    0x02 => "application/graphql",
    0x03 => "application/gzip",
    0x04 => "application/javascript",
    0x05 => "application/json",
    0x06 => "application/octet-stream",
    0x07 => "application/pdf",
    0x08 => "application/vnd.apache.thrift.binary",
    0x09 => "application/vnd.google.protobuf",
    0x0A => "application/xml",
    0x0B => "application/zip",
    0x0C => "audio/aac",
    0x0D => "audio/mp4",
    0x0E => "audio/mpeg",
    0x0F => "audio/ogg",
    0x10 => "image/bmp",
    0x11 => "image/gif",
    0x12 => "image/heic-sequence",
    0x13 => "image/jpeg",
    0x14 => "image/png",
    0x15 => "image/tiff",
    0x16 => "multipart/mixed",
    0x17 => "text/css",
    0x18 => "text/csv",
    0x19 => "text/html",
    0x1A => "text/plain",
    0x1B => "text/xml",
    0x1C => "video/h264",
    0x1D => "video/h265",
    0x1E => "video/vp8",
    0x7A => "application/x.rsocket.routing.v0",
    0x7B => "application/x.rsocket.composite-metadata.v0",
    0x7C => "message/x.rsocket.mime-type.v0",
    0x7D => "message/x.rsocket.accept-mime-types.v0",
    0x7E => "message/x.rsocket.authentication.v0",
    0x7F => "message/x.rsocket.tracing-zipkin.v0",
}

/// Look up a registered id's name. `None` for ids outside the registered set
/// (the caller is free to treat those as unknown/reserved, not an error).
pub fn name_for_id(id: u8) -> Option<&'static str> {
    TABLE.iter().find(|m| m.id == id).map(|m| m.name)
}

/// Look up the id for a registered MIME type name, for encoding a composite
/// metadata entry with the compact well-known form instead of an inline string.
pub fn id_for_name(name: &str) -> Option<u8> {
    TABLE.iter().find(|m| m.name == name).map(|m| m.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_known_ids() {
        assert_eq!(name_for_id(0x05), Some("application/json"));
        assert_eq!(id_for_name("application/json"), Some(0x05));
    }

    #[test]
    fn unregistered_id_is_none() {
        assert_eq!(name_for_id(0x50), None);
    }
}
