//! Error types for remote file-system operations

use shellmux::ShellmuxError;
use thiserror::Error;

/// Remote file-system errors
#[derive(Error, Debug)]
pub enum FsError {
    /// Starting or talking to a command failed
    #[error("Session error: {0}")]
    Session(#[from] ShellmuxError),

    /// Path does not exist on the remote side
    #[error("No such file or directory: {0}")]
    NotFound(String),

    /// `ls` produced a line we could not understand
    #[error("Cannot parse listing line: {line:?}")]
    Parse {
        /// The offending line
        line: String,
    },

    /// I/O error on a command stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FsError {
    pub(crate) fn parse(line: &str) -> Self {
        Self::Parse {
            line: line.to_string(),
        }
    }
}
