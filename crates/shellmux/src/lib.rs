//! # Shellmux
//!
//! Drive a long-lived remote shell as a command backend over plain TCP.
//!
//! The shell keeps one control connection to the [`Hub`]. Every command
//! started through a [`Session`] makes the shell dial back with a fresh
//! connection whose first bytes carry a hex header, and the hub routes that
//! connection to the command that is waiting for it.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use shellmux_proto as proto;

/// Error types for the Shellmux library
pub mod error;

/// Capability contract shared by sessions and their consumers
pub mod session;

/// Stream multiplexer bound to one remote shell
pub mod multiplexer;

/// Listener, connection classification and session registry
pub mod hub;

/// Hub configuration
pub mod config;

/// ID tables with tombstones
pub mod slot;

/// Shell text emitted on the control connection
pub mod command;

pub use error::ShellmuxError;
pub use session::{DataStream, RemoteIo, Session};
pub use multiplexer::Multiplexer;
pub use hub::{Hub, HubBuilder, OnClose, SessionOpenHook};
pub use config::HubConfig;

/// Result type alias for Shellmux operations
pub type Result<T> = std::result::Result<T, ShellmuxError>;
