//! Error types for the Shellmux library

use shellmux_proto::ProtocolError;
use std::time::Duration;
use thiserror::Error;

/// Main error type for Shellmux operations
#[derive(Debug, Error)]
pub enum ShellmuxError {
    /// Header decode or framing errors
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// No matching connection arrived in time
    #[error("Open stream timeout after {duration:?}")]
    StreamOpenTimeout {
        /// Timeout that was exceeded
        duration: Duration,
    },

    /// Stream ID was never allocated by this session
    #[error("Wrong stream ID: {0}")]
    WrongStreamId(u32),

    /// Stream ID was allocated but is no longer pending
    #[error("Expired stream ID: {0}")]
    ExpiredStreamId(u32),

    /// Stream ID belongs to a newer request than the header's
    #[error("Stream ID {0} was reused")]
    StreamIdReused(u32),

    /// No session registered under this ID
    #[error("Session not found: {0}")]
    SessionNotFound(u64),

    /// Session ID belonged to a session that has ended
    #[error("Session ID {0} was reused")]
    SessionIdReused(u64),

    /// Control connection of the session is closed
    #[error("Session {0} is closed")]
    SessionClosed(u64),

    /// Hub has been closed and takes no new sessions
    #[error("Hub is closed")]
    HubClosed,

    /// Listener failed to accept
    #[error("Accept error: {0}")]
    Accept(std::io::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ShellmuxError {
    /// Stream ID no longer refers to a pending request
    ///
    /// A reused ID is a more specific case of an expired one.
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::ExpiredStreamId(_) | Self::StreamIdReused(_))
    }

    /// Session lookup failed, either never registered or already ended
    pub fn is_session_missing(&self) -> bool {
        matches!(self, Self::SessionNotFound(_) | Self::SessionIdReused(_))
    }
}
