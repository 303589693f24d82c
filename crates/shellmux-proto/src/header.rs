//! Session and stream header types
//!
//! Both headers are 12 bytes with the version in byte 0. A session header
//! routes a connection to a registered session at the hub; a stream header
//! routes it to a pending command inside that session.

use crate::{ProtocolError, HEADER_LEN, PROTOCOL_VERSION};

/// Fixed-size header that can be framed on the wire
pub trait Header: Sized {
    /// Encode into the raw 12-byte form
    fn encode(&self) -> [u8; HEADER_LEN];

    /// Decode from the raw 12-byte form
    fn decode(bytes: &[u8; HEADER_LEN]) -> Result<Self, ProtocolError>;

    /// Lowercase hex encoding (24 characters)
    fn to_hex(&self) -> String {
        hex::encode(self.encode())
    }

    /// Hex encoding followed by a separator byte
    fn to_wire(&self, separator: u8) -> Vec<u8> {
        let mut wire = self.to_hex().into_bytes();
        wire.push(separator);
        wire
    }
}

fn check_version(bytes: &[u8; HEADER_LEN]) -> Result<(), ProtocolError> {
    match bytes[0] {
        PROTOCOL_VERSION => Ok(()),
        v => Err(ProtocolError::UnsupportedVersion(v)),
    }
}

/// Purpose of a connection as announced by its session header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsgType {
    /// Data connection for an existing session
    ToSession = 0,
    /// Control connection of a new session
    InitSession = 1,
}

impl TryFrom<u8> for MsgType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::ToSession),
            1 => Ok(Self::InitSession),
            other => Err(ProtocolError::UnknownMessageType(other)),
        }
    }
}

/// Hub-level header: `version:u8, msg_type:u8, reserved:u16, session_id:u64`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionHeader {
    /// Connection purpose
    pub msg_type: MsgType,
    /// Target session
    pub session_id: u64,
}

impl SessionHeader {
    /// Header for a data connection to `session_id`
    pub fn to_session(session_id: u64) -> Self {
        Self {
            msg_type: MsgType::ToSession,
            session_id,
        }
    }

    /// Header announcing a new session
    pub fn init_session() -> Self {
        Self {
            msg_type: MsgType::InitSession,
            session_id: 0,
        }
    }
}

impl Header for SessionHeader {
    fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0] = PROTOCOL_VERSION;
        buf[1] = self.msg_type as u8;
        buf[4..12].copy_from_slice(&self.session_id.to_be_bytes());
        buf
    }

    fn decode(bytes: &[u8; HEADER_LEN]) -> Result<Self, ProtocolError> {
        check_version(bytes)?;
        let msg_type = MsgType::try_from(bytes[1])?;
        let mut id = [0u8; 8];
        id.copy_from_slice(&bytes[4..12]);
        Ok(Self {
            msg_type,
            session_id: u64::from_be_bytes(id),
        })
    }
}

/// Session-level header: `version:u8, reserved:u24, stream_id:u32, magic:u32`
///
/// `magic` is a random nonce picked when the stream is opened. It tells a
/// late connection for a recycled `stream_id` apart from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamHeader {
    /// Stream identifier within the session
    pub stream_id: u32,
    /// Generation nonce
    pub magic: u32,
}

impl StreamHeader {
    /// Create a stream header
    pub fn new(stream_id: u32, magic: u32) -> Self {
        Self { stream_id, magic }
    }
}

impl Header for StreamHeader {
    fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0] = PROTOCOL_VERSION;
        buf[4..8].copy_from_slice(&self.stream_id.to_be_bytes());
        buf[8..12].copy_from_slice(&self.magic.to_be_bytes());
        buf
    }

    fn decode(bytes: &[u8; HEADER_LEN]) -> Result<Self, ProtocolError> {
        check_version(bytes)?;
        let mut id = [0u8; 4];
        let mut magic = [0u8; 4];
        id.copy_from_slice(&bytes[4..8]);
        magic.copy_from_slice(&bytes[8..12]);
        Ok(Self {
            stream_id: u32::from_be_bytes(id),
            magic: u32::from_be_bytes(magic),
        })
    }
}
