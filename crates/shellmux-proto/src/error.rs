//! Error types for protocol operations

use thiserror::Error;

/// Protocol-specific errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Header carries a version other than the one we speak
    #[error("Unsupported header version: expected 0, got {0}")]
    UnsupportedVersion(u8),

    /// Session header carries an unknown message type
    #[error("Unknown message type: {0}")]
    UnknownMessageType(u8),

    /// Header text is not valid hex
    #[error("Header is not valid hex")]
    InvalidHex,

    /// Peer closed before a complete header arrived
    #[error("Truncated header: expected {expected} bytes, received {received}")]
    Truncated {
        /// Bytes required for a framed header
        expected: usize,
        /// Bytes received before end of stream
        received: usize,
    },

    /// I/O error while reading or writing a header
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
