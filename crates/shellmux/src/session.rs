//! Capability contract shared by sessions and their consumers
//!
//! Everything above the wire protocol (file adapters, tools, tests) talks to
//! a remote shell through [`Session`] only.

use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Byte stream usable as a command's stdin/stdout
pub trait RemoteIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> RemoteIo for T {}

/// Stream returned by [`Session::start`]
pub type DataStream = Box<dyn RemoteIo>;

/// A remote shell able to run commands
#[async_trait]
pub trait Session: Send + Sync {
    /// Start `command` and return the stream bound to its stdin/stdout
    async fn start(&self, command: &str) -> Result<DataStream>;

    /// Run `command` and collect its output until end of stream
    async fn run(&self, command: &str) -> Result<Bytes> {
        let mut stream = self.start(command).await?;
        let mut output = Vec::new();
        stream.read_to_end(&mut output).await?;
        if let Err(e) = stream.shutdown().await {
            debug!("Ignoring shutdown error after run: {}", e);
        }
        Ok(Bytes::from(output))
    }
}
