//! Connection configuration (§3): the SETUP-time knobs that parametrize a
//! single connection's keepalive timer, fragmentation, lease, and resume behavior.
use std::time::Duration;

use bytes::Bytes;

pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(20);
pub const DEFAULT_MAX_LIFETIME: Duration = Duration::from_secs(90);
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Mirrors the fields a SETUP frame carries, plus the purely local knobs
/// (MTU, resume session TTL) that never go over the wire.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub keepalive_interval: Duration,
    pub max_lifetime: Duration,
    pub honor_lease: bool,
    pub metadata_mime_type: String,
    pub data_mime_type: String,
    /// `0` disables fragmentation (§4.3).
    pub mtu: usize,
    /// Present enables resumption; this is the token sent/expected in SETUP/RESUME.
    pub resume_token: Option<Bytes>,
    /// How long a suspended session's frame cache is kept once a transport drops.
    pub resume_session_duration: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> ConnectionConfig {
        ConnectionConfig {
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            max_lifetime: DEFAULT_MAX_LIFETIME,
            honor_lease: false,
            metadata_mime_type: DEFAULT_MIME_TYPE.to_string(),
            data_mime_type: DEFAULT_MIME_TYPE.to_string(),
            mtu: 0,
            resume_token: None,
            resume_session_duration: Duration::from_secs(60 * 60),
        }
    }
}

impl ConnectionConfig {
    pub fn with_mtu(mut self, mtu: usize) -> Self {
        self.mtu = mtu;
        self
    }

    pub fn with_honor_lease(mut self, honor_lease: bool) -> Self {
        self.honor_lease = honor_lease;
        self
    }

    pub fn with_resume_token(mut self, token: Bytes) -> Self {
        self.resume_token = Some(token);
        self
    }
}
