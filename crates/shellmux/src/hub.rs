//! Listener, connection classification and session registry
//!
//! Every accepted connection is either the control connection of a new shell
//! or a data connection for a command of a shell that is already
//! registered. There is no side channel to tell them apart: a data
//! connection starts with a session header right away, while a fresh
//! interactive shell stays silent. The hub waits a short window for a
//! header and treats silence as a new session.

use crate::command::Endpoint;
use crate::slot::{SlotState, SlotTable};
use crate::{HubConfig, Multiplexer, Result, Session, ShellmuxError};
use shellmux_proto::{read_header, MsgType, SessionHeader};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Runs once a session has ended
pub type OnClose = Box<dyn FnOnce() + Send>;

/// Called for every new session; may return a hook to run when it ends
pub type SessionOpenHook = Arc<dyn Fn(u64, Arc<dyn Session>) -> Option<OnClose> + Send + Sync>;

/// Builder for [`Hub`]
pub struct HubBuilder {
    /// Timing configuration
    config: HubConfig,
    /// Session-open callback
    on_session_open: Option<SessionOpenHook>,
}

impl Default for HubBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HubBuilder {
    /// Create a builder with default timings
    pub fn new() -> Self {
        Self {
            config: HubConfig::default(),
            on_session_open: None,
        }
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: HubConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the classification window
    pub fn with_classify_window(mut self, window: Duration) -> Self {
        self.config.classify_window = window;
        self
    }

    /// Set how long `start` waits for its data connection
    pub fn with_stream_timeout(mut self, timeout: Duration) -> Self {
        self.config.stream_open_timeout = timeout;
        self
    }

    /// Register a callback for new sessions
    pub fn on_session_open<F>(mut self, hook: F) -> Self
    where
        F: Fn(u64, Arc<dyn Session>) -> Option<OnClose> + Send + Sync + 'static,
    {
        self.on_session_open = Some(Arc::new(hook));
        self
    }

    /// Validate the configuration and build the hub
    pub fn build(self) -> Result<Arc<Hub>> {
        self.config.validate()?;
        Ok(Hub::with_parts(self.config, self.on_session_open))
    }
}

/// Accepts shell connections and routes data connections to their session
pub struct Hub {
    /// Live and ended sessions by ID
    sessions: RwLock<SlotTable<u64, Arc<Multiplexer>>>,
    /// Timing configuration
    config: HubConfig,
    /// Session-open callback
    on_session_open: Option<SessionOpenHook>,
    /// Cancelled by [`Hub::close`]
    shutdown: CancellationToken,
}

impl Hub {
    /// Create a hub with default timings and no callback
    pub fn new() -> Arc<Self> {
        Self::with_parts(HubConfig::default(), None)
    }

    fn with_parts(config: HubConfig, on_session_open: Option<SessionOpenHook>) -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(SlotTable::default()),
            config,
            on_session_open,
            shutdown: CancellationToken::new(),
        })
    }

    /// Start building a hub
    pub fn builder() -> HubBuilder {
        HubBuilder::new()
    }

    /// Timing configuration
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Accept connections until the listener fails or the hub is closed
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        if let Ok(addr) = listener.local_addr() {
            info!("Hub listening on {}", addr);
        }

        loop {
            let (conn, peer) = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Hub closed, stopping accept loop");
                    return Ok(());
                }
                accepted = listener.accept() => accepted.map_err(|e| {
                    error!("Accept failed: {}", e);
                    ShellmuxError::Accept(e)
                })?,
            };

            debug!("Accepted connection from {}", peer);
            let hub = Arc::clone(&self);
            tokio::spawn(async move {
                if let Err(e) = hub.serve_conn(conn).await {
                    warn!("Connection from {} dropped: {}", peer, e);
                }
            });
        }
    }

    /// Classify one connection and serve it
    ///
    /// For a new session this returns only once the shell disconnects.
    pub async fn serve_conn(&self, mut conn: TcpStream) -> Result<()> {
        let window = self.config.classify_window;
        let classified = tokio::time::timeout(window, read_header::<SessionHeader, _>(&mut conn)).await;

        match classified {
            Err(_) => {
                debug!("No session header within {:?}, treating as new session", window);
                self.open_session(conn).await
            }
            Ok(Err(e)) => Err(e.into()),
            Ok(Ok(header)) => match header.msg_type {
                MsgType::InitSession => self.open_session(conn).await,
                MsgType::ToSession => {
                    let session = self.lookup(header.session_id).await?;
                    session.handle_connection(Box::new(conn)).await
                }
            },
        }
    }

    /// Look a live session up by ID
    pub async fn session(&self, id: u64) -> Result<Arc<dyn Session>> {
        let session: Arc<dyn Session> = self.lookup(id).await?;
        Ok(session)
    }

    /// IDs of all live sessions, ascending
    pub async fn live_sessions(&self) -> Vec<u64> {
        let mut ids = self.sessions.read().await.live_ids();
        ids.sort_unstable();
        ids
    }

    /// Close every live session, clear the registry and stop `serve`
    pub async fn close(&self) {
        self.shutdown.cancel();

        let live = {
            let mut sessions = self.sessions.write().await;
            let live = sessions.take_live();
            sessions.clear();
            live
        };

        for (id, session) in live {
            debug!("Closing session {}", id);
            session.close().await;
        }
    }

    async fn lookup(&self, id: u64) -> Result<Arc<Multiplexer>> {
        match self.sessions.read().await.lookup(id) {
            SlotState::Unused => Err(ShellmuxError::SessionNotFound(id)),
            SlotState::Expired => Err(ShellmuxError::SessionIdReused(id)),
            SlotState::Live(session) => Ok(Arc::clone(session)),
        }
    }

    async fn open_session(&self, conn: TcpStream) -> Result<()> {
        let endpoint = Endpoint::from(conn.local_addr()?);
        let peer = conn.peer_addr()?;
        let (mut reader, writer) = conn.into_split();
        let timeout = self.config.stream_open_timeout;

        let (id, session) = {
            let mut sessions = self.sessions.write().await;
            if self.shutdown.is_cancelled() {
                return Err(ShellmuxError::HubClosed);
            }
            sessions.allocate_with(|id| {
                let session = Arc::new(Multiplexer::new(id, writer, endpoint, timeout));
                (Arc::clone(&session), session)
            })
        };
        info!("Session {} opened from {}", id, peer);

        let on_close = self
            .on_session_open
            .as_ref()
            .and_then(|hook| hook(id, Arc::clone(&session) as Arc<dyn Session>));

        let result = drain_control(&session, &mut reader).await;

        self.sessions
            .write()
            .await
            .expire_if(id, |live| Arc::ptr_eq(live, &session));
        session.close().await;
        if let Some(on_close) = on_close {
            on_close();
        }
        info!("Session {} ended", id);

        result
    }
}

/// Read and discard the shell's output until it disconnects or the session
/// is closed
async fn drain_control(session: &Multiplexer, reader: &mut OwnedReadHalf) -> Result<()> {
    let mut discard = [0u8; 512];
    loop {
        tokio::select! {
            _ = session.closed() => return Ok(()),
            read = reader.read(&mut discard) => match read {
                Ok(0) => return Ok(()),
                Ok(_) => continue,
                Err(e) => return Err(e.into()),
            },
        }
    }
}
