use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::utils::{require_remaining, PayloadSupport, Writeable};
use super::{Body, Frame, FLAG_LEASE, FLAG_METADATA, FLAG_RESUME};
use crate::error::RSocketResult;

pub const CURRENT_VERSION: Version = Version { major: 1, minor: 0 };

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
}

/// Body of the SETUP frame: the one frame that opens a connection (§4.6).
#[derive(Debug, Clone, PartialEq)]
pub struct Setup {
    version: Version,
    keepalive_interval_millis: u32,
    max_lifetime_millis: u32,
    resume_token: Option<Bytes>,
    metadata_mime_type: String,
    data_mime_type: String,
    metadata: Option<Bytes>,
    data: Option<Bytes>,
}

pub struct SetupBuilder {
    stream_id: u32,
    flag: u16,
    value: Setup,
}

impl SetupBuilder {
    fn new(stream_id: u32, flag: u16) -> SetupBuilder {
        SetupBuilder {
            stream_id,
            flag,
            value: Setup {
                version: CURRENT_VERSION,
                keepalive_interval_millis: 30_000,
                max_lifetime_millis: 100_000,
                resume_token: None,
                metadata_mime_type: String::from("application/binary"),
                data_mime_type: String::from("application/binary"),
                metadata: None,
                data: None,
            },
        }
    }

    pub fn build(self) -> Frame {
        Frame::new(self.stream_id, Body::Setup(self.value), self.flag)
    }

    pub fn set_version(mut self, major: u16, minor: u16) -> Self {
        self.value.version = Version { major, minor };
        self
    }

    pub fn set_keepalive_interval_millis(mut self, millis: u32) -> Self {
        self.value.keepalive_interval_millis = millis;
        self
    }

    pub fn set_max_lifetime_millis(mut self, millis: u32) -> Self {
        self.value.max_lifetime_millis = millis;
        self
    }

    pub fn set_resume_token(mut self, token: Bytes) -> Self {
        self.value.resume_token = Some(token);
        self.flag |= FLAG_RESUME;
        self
    }

    pub fn set_honor_lease(mut self, honor: bool) -> Self {
        if honor {
            self.flag |= FLAG_LEASE;
        } else {
            self.flag &= !FLAG_LEASE;
        }
        self
    }

    pub fn set_data_mime_type<S: Into<String>>(mut self, mime: S) -> Self {
        self.value.data_mime_type = mime.into();
        self
    }

    pub fn set_metadata_mime_type<S: Into<String>>(mut self, mime: S) -> Self {
        self.value.metadata_mime_type = mime.into();
        self
    }

    pub fn set_data(mut self, data: Bytes) -> Self {
        self.value.data = Some(data);
        self
    }

    pub fn set_metadata(mut self, metadata: Bytes) -> Self {
        self.value.metadata = Some(metadata);
        self.flag |= FLAG_METADATA;
        self
    }
}

impl Setup {
    pub fn decode(flag: u16, bf: &mut BytesMut) -> RSocketResult<Setup> {
        require_remaining(bf, 12, "SETUP fixed header")?;
        let major = bf.get_u16();
        let minor = bf.get_u16();
        let keepalive_interval_millis = bf.get_u32();
        let max_lifetime_millis = bf.get_u32();

        let resume_token = if flag & FLAG_RESUME != 0 {
            require_remaining(bf, 2, "SETUP resume token length")?;
            let len = bf.get_u16() as usize;
            require_remaining(bf, len, "SETUP resume token")?;
            Some(bf.split_to(len).freeze())
        } else {
            None
        };

        let metadata_mime_type = read_mime(bf)?;
        let data_mime_type = read_mime(bf)?;

        let (metadata, data) = PayloadSupport::read(flag, bf);

        Ok(Setup {
            version: Version { major, minor },
            keepalive_interval_millis,
            max_lifetime_millis,
            resume_token,
            metadata_mime_type,
            data_mime_type,
            metadata,
            data,
        })
    }

    pub fn builder(stream_id: u32, flag: u16) -> SetupBuilder {
        SetupBuilder::new(stream_id, flag)
    }

    pub fn get_version(&self) -> Version {
        self.version
    }

    pub fn get_keepalive_interval_millis(&self) -> u32 {
        self.keepalive_interval_millis
    }

    pub fn get_max_lifetime_millis(&self) -> u32 {
        self.max_lifetime_millis
    }

    pub fn get_resume_token(&self) -> &Option<Bytes> {
        &self.resume_token
    }

    pub fn get_metadata_mime_type(&self) -> &str {
        &self.metadata_mime_type
    }

    pub fn get_data_mime_type(&self) -> &str {
        &self.data_mime_type
    }

    pub fn get_metadata(&self) -> &Option<Bytes> {
        &self.metadata
    }

    pub fn get_data(&self) -> &Option<Bytes> {
        &self.data
    }
}

fn read_mime(bf: &mut BytesMut) -> RSocketResult<String> {
    require_remaining(bf, 1, "SETUP mime length")?;
    let len = bf.get_u8() as usize;
    require_remaining(bf, len, "SETUP mime bytes")?;
    let raw = bf.split_to(len);
    String::from_utf8(raw.to_vec())
        .map_err(|e| crate::error::RSocketError::MalformedFrame(format!("non-utf8 mime: {}", e)))
}

fn write_mime(bf: &mut BytesMut, mime: &str) {
    bf.put_u8(mime.len() as u8);
    bf.put_slice(mime.as_bytes());
}

impl Writeable for Setup {
    fn write_to(&self, bf: &mut BytesMut) {
        bf.put_u16(self.version.major);
        bf.put_u16(self.version.minor);
        bf.put_u32(self.keepalive_interval_millis);
        bf.put_u32(self.max_lifetime_millis);
        if let Some(token) = &self.resume_token {
            bf.put_u16(token.len() as u16);
            bf.put_slice(token);
        }
        write_mime(bf, &self.metadata_mime_type);
        write_mime(bf, &self.data_mime_type);
        PayloadSupport::write(bf, &self.metadata, &self.data);
    }

    fn len(&self) -> u32 {
        let mut n = 12 + 1 + self.metadata_mime_type.len() as u32 + 1 + self.data_mime_type.len() as u32;
        if let Some(token) = &self.resume_token {
            n += 2 + token.len() as u32;
        }
        n + PayloadSupport::len(&self.metadata, &self.data)
    }
}
