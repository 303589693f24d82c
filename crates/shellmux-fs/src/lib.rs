//! # shellmux-fs
//!
//! File-system access to the machine behind a [`shellmux::Session`].
//!
//! Nothing is installed remotely: every operation is a plain shell command
//! (`ls`, `dd`, `mkdir`, `rm`, `mv`) started through the session, with
//! paths quoted for the shell.
//!
//! ```rust,no_run
//! use shellmux::Session;
//! use shellmux_fs::RemoteFs;
//! use std::sync::Arc;
//!
//! # async fn example(session: Arc<dyn Session>) -> shellmux_fs::Result<()> {
//! let fs = RemoteFs::new(session);
//! fs.mkdir("/tmp/demo").await?;
//!
//! let mut file = fs.open("/tmp/demo/notes.txt");
//! file.write_all(b"hello").await?;
//! file.close().await?;
//!
//! for entry in fs.read_dir("/tmp/demo", 0).await? {
//!     println!("{} {}", entry.name, entry.size);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

/// Error types for remote file-system operations
pub mod error;

/// Cursor-based file access through `dd`
pub mod file;

/// Directory and metadata operations
pub mod fs;

/// File metadata parsed from `ls --full-time` output
pub mod info;

pub use error::FsError;
pub use file::RemoteFile;
pub use fs::RemoteFs;
pub use info::{parse_ls_line, FileInfo};

/// Result type for file-system operations
pub type Result<T> = std::result::Result<T, FsError>;
