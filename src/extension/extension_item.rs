use bytes::Bytes;

/// A generic `EXT` frame payload: a numbered extension type plus its data and
/// optional metadata. The core never interprets `extension_type`; it only
/// carries it far enough for a caller to recognize its own extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionItem {
    pub extension_type: i32,
    pub data: Bytes,
    pub metadata: Option<Bytes>,
    pub ignore: bool,
}

impl ExtensionItem {
    pub fn new(extension_type: i32, data: Bytes) -> ExtensionItem {
        ExtensionItem {
            extension_type,
            data,
            metadata: None,
            ignore: false,
        }
    }

    pub fn with_metadata(mut self, metadata: Bytes) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_ignore(mut self, ignore: bool) -> Self {
        self.ignore = ignore;
        self
    }
}
