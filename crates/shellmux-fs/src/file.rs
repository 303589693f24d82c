//! Cursor-based file access through `dd`
//!
//! Reads and writes are served by one long-running `dd` per direction,
//! started lazily at the current cursor. Switching direction or seeking
//! finishes the running command first.

use crate::fs::{quote, stat_path};
use crate::{FsError, Result};
use bytes::Bytes;
use shellmux::{DataStream, Session};
use std::io::SeekFrom;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Read,
    Write,
}

struct Transfer {
    direction: Direction,
    stream: DataStream,
}

/// An open remote file
pub struct RemoteFile {
    session: Arc<dyn Session>,
    path: String,
    cursor: u64,
    transfer: Option<Transfer>,
}

impl RemoteFile {
    pub(crate) fn new(session: Arc<dyn Session>, path: &str) -> Self {
        Self {
            session,
            path: path.to_string(),
            cursor: 0,
            transfer: None,
        }
    }

    /// Path this file was opened with
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Current cursor position
    pub fn position(&self) -> u64 {
        self.cursor
    }

    /// Read into `buf`, returning 0 at end of file
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let stream = self.transfer(Direction::Read).await?;
        let n = stream.read(buf).await?;
        self.cursor += n as u64;
        Ok(n)
    }

    /// Read from the cursor to the end of the file
    pub async fn read_to_end(&mut self) -> Result<Bytes> {
        let stream = self.transfer(Direction::Read).await?;
        let mut content = Vec::new();
        let n = stream.read_to_end(&mut content).await?;
        self.cursor += n as u64;
        Ok(Bytes::from(content))
    }

    /// Write part of `buf` at the cursor
    ///
    /// The first write after opening or seeking truncates the file at the
    /// cursor.
    pub async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let stream = self.transfer(Direction::Write).await?;
        let n = stream.write(buf).await?;
        self.cursor += n as u64;
        Ok(n)
    }

    /// Write all of `buf` at the cursor
    pub async fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        let stream = self.transfer(Direction::Write).await?;
        stream.write_all(buf).await?;
        self.cursor += buf.len() as u64;
        Ok(())
    }

    /// Move the cursor and finish any running transfer
    pub async fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.cursor.checked_add_signed(delta),
            SeekFrom::End(delta) => {
                let info = stat_path(self.session.as_ref(), &self.path).await?;
                info.size.checked_add_signed(delta)
            }
        };
        let target = target.ok_or_else(|| {
            FsError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "seek before start of file",
            ))
        })?;

        self.finish().await?;
        self.cursor = target;
        Ok(target)
    }

    /// Finish any running transfer
    ///
    /// For writes this waits until `dd` exits, so the data is on disk when
    /// this returns. The cursor is kept.
    pub async fn close(&mut self) -> Result<()> {
        self.finish().await
    }

    async fn transfer(&mut self, direction: Direction) -> Result<&mut DataStream> {
        let transfer = match self.transfer.take() {
            Some(running) if running.direction == direction => running,
            other => {
                self.transfer = other;
                self.finish().await?;

                let path = quote(&self.path);
                let command = match direction {
                    Direction::Read => format!("dd if={} skip={} iflag=skip_bytes", path, self.cursor),
                    // dd may open with O_TRUNC for small seeks; cut the tail explicitly instead
                    Direction::Write => format!(
                        "truncate -s {cursor} {path} && dd of={path} seek={cursor} oflag=seek_bytes conv=notrunc",
                        cursor = self.cursor,
                        path = path
                    ),
                };
                debug!("Starting {:?} transfer: {}", direction, command);

                let stream = self.session.start(&command).await?;
                Transfer { direction, stream }
            }
        };

        Ok(&mut self.transfer.insert(transfer).stream)
    }

    async fn finish(&mut self) -> Result<()> {
        let Some(Transfer { direction, mut stream }) = self.transfer.take() else {
            return Ok(());
        };

        if direction == Direction::Write {
            stream.shutdown().await?;
            // dd closes the stream once it has flushed and exited
            let mut rest = Vec::new();
            stream.read_to_end(&mut rest).await?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for RemoteFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteFile")
            .field("path", &self.path)
            .field("cursor", &self.cursor)
            .field("transfer", &self.transfer.as_ref().map(|t| t.direction))
            .finish()
    }
}
