use std::fmt;

use bytes::Bytes;

use crate::frame::Error as ErrorBody;
use crate::frame::{
    ERR_APPLICATION, ERR_CANCELED, ERR_CONN_CLOSED, ERR_CONN_FAILED, ERR_INVALID,
    ERR_INVALID_SETUP, ERR_REJECTED, ERR_REJECT_RESUME, ERR_REJECT_SETUP, ERR_UNSUPPORTED_SETUP,
};

pub type RSocketResult<T> = Result<T, RSocketError>;

/// The single error type threaded through the core. Every fallible public
/// operation returns `RSocketResult<T>`; there is no String-only escape hatch.
#[derive(Debug)]
pub enum RSocketError {
    /// A frame could not be parsed: truncated header, bad length prefix, etc.
    MalformedFrame(String),
    /// A FOLLOWS chain's continuation frame didn't match the first fragment's type.
    FragmentTypeMismatch,
    /// A continuation (NEXT) fragment arrived with no prior first fragment for its stream.
    MissingFirstFragment,
    /// The 2^31 stream-id space of this endpoint's parity is exhausted.
    StreamAllocationFailure,
    /// REQUEST_N of zero or a negative value, or any other frame-level contract breach.
    InvalidFrame(String),
    /// A connection-level (stream id 0) protocol error. Fatal: transport must close.
    Connection(ConnectionErrorKind, Option<Bytes>),
    /// An ERROR frame carrying APPLICATION_ERROR, delivered to the requester's consumer.
    Application(Option<Bytes>),
    /// The peer rejected, canceled, or flagged invalid a single stream's request.
    Stream(StreamErrorKind, Option<Bytes>),
    /// Locally observed resource exhaustion (credit overflow, no valid lease, ...).
    /// Never sent over the wire; surfaced straight to the local caller.
    Rejected(String),
    /// The underlying transport failed (read/write/close error) outside of resume recovery.
    Transport(String),
    /// The local side canceled the stream. Terminal but not an error.
    Canceled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    InvalidSetup,
    UnsupportedSetup,
    RejectedSetup,
    RejectedResume,
    ConnectionError,
    ConnectionClose,
    KeepaliveTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamErrorKind {
    Rejected,
    Canceled,
    Invalid,
}

impl RSocketError {
    /// Reconstruct an `RSocketError` from a received ERROR frame's code and data,
    /// per the stream-id-0-vs-stream-id-n split in the error code table.
    pub fn from_error_frame(stream_id: u32, body: &ErrorBody) -> RSocketError {
        let data = body.get_data().clone();
        match (stream_id, body.get_error_code()) {
            (0, ERR_INVALID_SETUP) => {
                RSocketError::Connection(ConnectionErrorKind::InvalidSetup, data)
            }
            (0, ERR_UNSUPPORTED_SETUP) => {
                RSocketError::Connection(ConnectionErrorKind::UnsupportedSetup, data)
            }
            (0, ERR_REJECT_SETUP) => {
                RSocketError::Connection(ConnectionErrorKind::RejectedSetup, data)
            }
            (0, ERR_REJECT_RESUME) => {
                RSocketError::Connection(ConnectionErrorKind::RejectedResume, data)
            }
            (0, ERR_CONN_FAILED) => {
                RSocketError::Connection(ConnectionErrorKind::ConnectionError, data)
            }
            (0, ERR_CONN_CLOSED) => {
                RSocketError::Connection(ConnectionErrorKind::ConnectionClose, data)
            }
            (_, ERR_APPLICATION) => RSocketError::Application(data),
            (_, ERR_REJECTED) => RSocketError::Stream(StreamErrorKind::Rejected, data),
            (_, ERR_CANCELED) => RSocketError::Stream(StreamErrorKind::Canceled, data),
            (_, ERR_INVALID) => RSocketError::Stream(StreamErrorKind::Invalid, data),
            (_, code) => RSocketError::InvalidFrame(format!("unknown error code {}", code)),
        }
    }

    /// The wire error code this error maps to, if it is the kind of error that is
    /// ever carried over an ERROR frame (resource-limit/cancellation errors are not).
    pub fn error_code(&self) -> Option<u32> {
        match self {
            RSocketError::Connection(kind, _) => Some(match kind {
                ConnectionErrorKind::InvalidSetup => ERR_INVALID_SETUP,
                ConnectionErrorKind::UnsupportedSetup => ERR_UNSUPPORTED_SETUP,
                ConnectionErrorKind::RejectedSetup => ERR_REJECT_SETUP,
                ConnectionErrorKind::RejectedResume => ERR_REJECT_RESUME,
                ConnectionErrorKind::ConnectionError | ConnectionErrorKind::KeepaliveTimeout => {
                    ERR_CONN_FAILED
                }
                ConnectionErrorKind::ConnectionClose => ERR_CONN_CLOSED,
            }),
            RSocketError::Application(_) => Some(ERR_APPLICATION),
            RSocketError::Stream(kind, _) => Some(match kind {
                StreamErrorKind::Rejected => ERR_REJECTED,
                StreamErrorKind::Canceled => ERR_CANCELED,
                StreamErrorKind::Invalid => ERR_INVALID,
            }),
            _ => None,
        }
    }

    pub fn data(&self) -> Option<&Bytes> {
        match self {
            RSocketError::Connection(_, d)
            | RSocketError::Application(d)
            | RSocketError::Stream(_, d) => d.as_ref(),
            _ => None,
        }
    }

    pub fn is_connection_fatal(&self) -> bool {
        matches!(self, RSocketError::Connection(_, _))
    }
}

impl fmt::Display for RSocketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RSocketError::MalformedFrame(msg) => write!(f, "malformed frame: {}", msg),
            RSocketError::FragmentTypeMismatch => {
                write!(f, "fragment continuation type mismatch")
            }
            RSocketError::MissingFirstFragment => {
                write!(f, "fragment continuation with no first fragment")
            }
            RSocketError::StreamAllocationFailure => write!(f, "stream id space exhausted"),
            RSocketError::InvalidFrame(msg) => write!(f, "invalid frame: {}", msg),
            RSocketError::Connection(kind, _) => write!(f, "connection error: {:?}", kind),
            RSocketError::Application(_) => write!(f, "application error"),
            RSocketError::Stream(kind, _) => write!(f, "stream error: {:?}", kind),
            RSocketError::Rejected(msg) => write!(f, "rejected: {}", msg),
            RSocketError::Transport(msg) => write!(f, "transport error: {}", msg),
            RSocketError::Canceled => write!(f, "canceled"),
        }
    }
}

impl std::error::Error for RSocketError {}
