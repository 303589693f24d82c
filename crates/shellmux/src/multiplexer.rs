//! Stream multiplexer bound to one remote shell
//!
//! A [`Multiplexer`] owns the write side of a shell's control connection.
//! Each `start` registers a hook under a fresh stream ID, tells the shell to
//! dial back, and waits; [`Multiplexer::handle_connection`] matches the
//! incoming connection's stream header to that hook and hands it over.

use crate::command::{stream_command, Endpoint};
use crate::slot::{SlotState, SlotTable};
use crate::{DataStream, Result, Session, ShellmuxError};
use async_trait::async_trait;
use rand::Rng;
use shellmux_proto::{read_header, SessionHeader, StreamHeader};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{oneshot, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

type ControlWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Pending command waiting for its data connection
struct StreamHook {
    /// Header the connection has to present
    header: StreamHeader,
    /// Single-shot handoff to the waiting `start`
    delivery: oneshot::Sender<DataStream>,
}

/// One remote shell and its stream-ID space
pub struct Multiplexer {
    /// Session ID assigned by the hub
    id: u64,
    /// Header prefix every data connection of this session carries
    header: SessionHeader,
    /// Where the shell dials back to
    endpoint: Endpoint,
    /// Write side of the control connection, `None` once closed
    control: Mutex<Option<ControlWriter>>,
    /// Pending hooks by stream ID
    hooks: Arc<RwLock<SlotTable<u32, StreamHook>>>,
    /// How long `start` waits for its connection
    open_timeout: Duration,
    /// Cancelled when the control connection is closed
    closed: CancellationToken,
}

impl Multiplexer {
    /// Create a multiplexer writing commands to `control`
    pub fn new<W>(id: u64, control: W, endpoint: Endpoint, open_timeout: Duration) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            id,
            header: SessionHeader::to_session(id),
            endpoint,
            control: Mutex::new(Some(Box::new(control))),
            hooks: Arc::new(RwLock::new(SlotTable::default())),
            open_timeout,
            closed: CancellationToken::new(),
        }
    }

    /// Session ID
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Address the shell dials back to
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Number of streams still waiting for their connection
    pub async fn pending_streams(&self) -> usize {
        self.hooks.read().await.live_count()
    }

    /// Whether the control connection has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Wait until the control connection is closed
    pub async fn closed(&self) {
        self.closed.cancelled().await
    }

    /// Route a data connection to the `start` call waiting for it
    pub async fn handle_connection(&self, mut conn: DataStream) -> Result<()> {
        let header: StreamHeader = read_header(&mut conn).await?;
        let id = header.stream_id;

        let hook = {
            let mut hooks = self.hooks.write().await;
            match hooks.lookup(id) {
                SlotState::Unused => Err(ShellmuxError::WrongStreamId(id)),
                SlotState::Expired => Err(ShellmuxError::ExpiredStreamId(id)),
                SlotState::Live(hook) if hook.header.magic != header.magic => {
                    Err(ShellmuxError::StreamIdReused(id))
                }
                SlotState::Live(_) => Ok(()),
            }?;
            // Delivery consumes the hook: a second match finds a tombstone.
            hooks.expire(id).ok_or(ShellmuxError::ExpiredStreamId(id))?
        };

        hook.delivery
            .send(conn)
            .map_err(|_| ShellmuxError::ExpiredStreamId(id))?;
        debug!("Session {} delivered stream {}", self.id, id);
        Ok(())
    }

    /// Close the control connection and fail every pending stream
    pub async fn close(&self) {
        self.closed.cancel();

        let control = self.control.lock().await.take();
        if let Some(mut control) = control {
            if let Err(e) = control.shutdown().await {
                debug!("Control shutdown for session {} failed: {}", self.id, e);
            }
            info!("Session {} closed", self.id);
        }

        let pending = self.hooks.write().await.take_live();
        if !pending.is_empty() {
            warn!("Session {} closed with {} pending streams", self.id, pending.len());
        }
    }

    /// Tombstone the hook for `header` once the open timeout fires
    fn arm_timeout(&self, header: StreamHeader) {
        let hooks = Arc::clone(&self.hooks);
        let timeout = self.open_timeout;
        let session_id = self.id;

        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let expired = hooks
                .write()
                .await
                .expire_if(header.stream_id, |hook| hook.header == header);
            if expired.is_some() {
                debug!(
                    "Session {} stream {} expired after {:?}",
                    session_id, header.stream_id, timeout
                );
            }
        });
    }

    /// Write one control line, giving up when the session is closed
    ///
    /// The writer is out of its slot while a line is in flight. A write cut
    /// short leaves a partial command on the shell's stdin, so the writer is
    /// dropped with it and the next start closes the session.
    async fn send_control(&self, line: &str) -> Result<()> {
        let write = async {
            let mut control = self.control.lock().await;
            let Some(mut writer) = control.take() else {
                // Closed, or an earlier line was cut short
                self.closed.cancel();
                return Err(ShellmuxError::SessionClosed(self.id));
            };
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await?;
            *control = Some(writer);
            Ok::<(), ShellmuxError>(())
        };

        tokio::select! {
            _ = self.closed.cancelled() => Err(ShellmuxError::SessionClosed(self.id)),
            written = write => written,
        }
    }

    /// Send the control line and wait for the shell to dial back
    async fn open_stream(&self, line: &str, waiter: oneshot::Receiver<DataStream>) -> Result<DataStream> {
        self.send_control(line).await?;
        match waiter.await {
            Ok(stream) => Ok(stream),
            Err(_) if self.is_closed() => Err(ShellmuxError::SessionClosed(self.id)),
            Err(_) => Err(ShellmuxError::StreamOpenTimeout {
                duration: self.open_timeout,
            }),
        }
    }
}

#[async_trait]
impl Session for Multiplexer {
    async fn start(&self, command: &str) -> Result<DataStream> {
        if self.is_closed() {
            return Err(ShellmuxError::SessionClosed(self.id));
        }

        let (delivery, waiter) = oneshot::channel();
        let magic = fresh_magic();
        let (_, header) = self.hooks.write().await.allocate_with(|id| {
            let header = StreamHeader::new(id, magic);
            (StreamHook { header, delivery }, header)
        });
        self.arm_timeout(header);

        debug!("Session {} opening stream {}: {}", self.id, header.stream_id, command);
        let line = stream_command(&self.header, &header, &self.endpoint, command);
        let opened = tokio::time::timeout(self.open_timeout, self.open_stream(&line, waiter))
            .await
            .unwrap_or(Err(ShellmuxError::StreamOpenTimeout {
                duration: self.open_timeout,
            }));

        if opened.is_err() {
            self.hooks
                .write()
                .await
                .expire_if(header.stream_id, |hook| hook.header == header);
        }
        opened
    }
}

/// Random non-zero generation nonce for a stream header
fn fresh_magic() -> u32 {
    rand::thread_rng().gen_range(1..=u32::MAX)
}
