//! Directory and metadata operations

use crate::info::{parse_ls_line, FileInfo};
use crate::{FsError, RemoteFile, Result};
use shellmux::Session;
use std::borrow::Cow;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

/// File system of the machine behind a session
#[derive(Clone)]
pub struct RemoteFs {
    session: Arc<dyn Session>,
}

impl RemoteFs {
    /// Wrap a session
    pub fn new(session: Arc<dyn Session>) -> Self {
        Self { session }
    }

    /// The underlying session
    pub fn session(&self) -> &Arc<dyn Session> {
        &self.session
    }

    /// Create a directory and any missing parents
    pub async fn mkdir(&self, path: &str) -> Result<()> {
        self.run(&format!("mkdir -p {}", quote(path))).await
    }

    /// Remove a file or a whole directory tree
    pub async fn remove_all(&self, path: &str) -> Result<()> {
        self.run(&format!("rm -rf {}", quote(path))).await
    }

    /// Move `from` to `to`
    pub async fn rename(&self, from: &str, to: &str) -> Result<()> {
        self.run(&format!("mv {} {}", quote(from), quote(to))).await
    }

    /// Metadata of `path` itself, without following a final symlink
    pub async fn stat(&self, path: &str) -> Result<FileInfo> {
        stat_path(self.session.as_ref(), path).await
    }

    /// Entries of a directory, at most `limit` of them unless `limit` is 0
    pub async fn read_dir(&self, path: &str, limit: usize) -> Result<Vec<FileInfo>> {
        let stream = self
            .session
            .start(&format!("TZ=UTC0 ls -Al --full-time {}", quote(path)))
            .await?;
        let mut reader = BufReader::new(stream);

        let mut entries = Vec::new();
        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line).await? == 0 {
                break;
            }

            let text = String::from_utf8_lossy(&line);
            if text.starts_with("total ") {
                continue;
            }
            match parse_ls_line(&text) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping listing entry of {}: {}", path, e),
            }

            if limit > 0 && entries.len() >= limit {
                debug!("Listing of {} stopped at {} entries", path, limit);
                break;
            }
        }

        Ok(entries)
    }

    /// Open a file for reading or writing
    ///
    /// Nothing is started remotely until the first read or write.
    pub fn open(&self, path: &str) -> RemoteFile {
        RemoteFile::new(Arc::clone(&self.session), path)
    }

    async fn run(&self, command: &str) -> Result<()> {
        let output = self.session.run(command).await?;
        if !output.is_empty() {
            debug!("Unexpected output from {:?}: {} bytes", command, output.len());
        }
        Ok(())
    }
}

/// `ls -d` a single path, reporting its final component as the name
pub(crate) async fn stat_path(session: &dyn Session, path: &str) -> Result<FileInfo> {
    let output = session
        .run(&format!("TZ=UTC0 ls -Ald --full-time {}", quote(path)))
        .await?;
    if output.is_empty() {
        return Err(FsError::NotFound(path.to_string()));
    }

    let text = String::from_utf8_lossy(&output);
    let line = text.lines().next().unwrap_or_default();
    Ok(parse_ls_line(line)?.into_base_name())
}

/// Quote a path for the remote shell
pub(crate) fn quote(path: &str) -> Cow<'_, str> {
    shell_escape::escape(Cow::Borrowed(path))
}
