use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::setup::Version;
use super::utils::{require_remaining, Writeable};
use super::{Body, Frame};
use crate::error::RSocketResult;

/// Body of a RESUME frame, sent by the requester to reattach to a suspended
/// session after a transport reconnect (§4.8).
#[derive(Debug, Clone, PartialEq)]
pub struct Resume {
    version: Version,
    resume_token: Bytes,
    last_received_server_position: u64,
    first_available_client_position: u64,
}

impl Resume {
    pub fn new(
        stream_id: u32,
        version: Version,
        resume_token: Bytes,
        last_received_server_position: u64,
        first_available_client_position: u64,
    ) -> Frame {
        Frame::new(
            stream_id,
            Body::Resume(Resume {
                version,
                resume_token,
                last_received_server_position,
                first_available_client_position,
            }),
            0,
        )
    }

    pub fn decode(_flag: u16, bf: &mut BytesMut) -> RSocketResult<Resume> {
        require_remaining(bf, 6, "RESUME version")?;
        let major = bf.get_u16();
        let minor = bf.get_u16();
        let token_len = bf.get_u16() as usize;
        require_remaining(bf, token_len + 16, "RESUME body")?;
        let resume_token = bf.split_to(token_len).freeze();
        let last_received_server_position = bf.get_u64();
        let first_available_client_position = bf.get_u64();
        Ok(Resume {
            version: Version { major, minor },
            resume_token,
            last_received_server_position,
            first_available_client_position,
        })
    }

    pub fn get_version(&self) -> Version {
        self.version
    }

    pub fn get_resume_token(&self) -> &Bytes {
        &self.resume_token
    }

    pub fn get_last_received_server_position(&self) -> u64 {
        self.last_received_server_position
    }

    pub fn get_first_available_client_position(&self) -> u64 {
        self.first_available_client_position
    }
}

impl Writeable for Resume {
    fn write_to(&self, bf: &mut BytesMut) {
        bf.put_u16(self.version.major);
        bf.put_u16(self.version.minor);
        bf.put_u16(self.resume_token.len() as u16);
        bf.put_slice(&self.resume_token);
        bf.put_u64(self.last_received_server_position);
        bf.put_u64(self.first_available_client_position);
    }

    fn len(&self) -> u32 {
        6 + self.resume_token.len() as u32 + 16
    }
}
