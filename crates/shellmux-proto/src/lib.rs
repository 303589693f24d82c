//! # Shellmux Protocol
//!
//! Header types and the hex wire framing that every shellmux connection
//! starts with.

#![warn(missing_docs)]

/// Session and stream header types
pub mod header;

/// Hex wire framing for async streams
pub mod codec;

/// Error types for protocol operations
pub mod error;

pub use header::{Header, MsgType, SessionHeader, StreamHeader};
pub use codec::{read_header, write_header};
pub use error::ProtocolError;

/// Size of a raw binary header
pub const HEADER_LEN: usize = 12;

/// Size of a header once hex encoded
pub const HEX_HEADER_LEN: usize = HEADER_LEN * 2;

/// Hex header plus the separator byte that follows it on the wire
pub const WIRE_HEADER_LEN: usize = HEX_HEADER_LEN + 1;

/// The only header version this crate speaks
pub const PROTOCOL_VERSION: u8 = 0;
