//! Attach a local interactive bash to a hub for file-system tests

use anyhow::{anyhow, Context, Result};
use shellmux::{Hub, OnClose, Session};
use std::os::fd::OwnedFd;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::process::Child;
use tokio::sync::mpsc;

/// A hub with one local bash attached
pub struct LocalShell {
    pub hub: Arc<Hub>,
    pub session: Arc<dyn Session>,
    _bash: Child,
}

impl LocalShell {
    /// Returns `None` when bash cannot be spawned
    pub async fn start() -> Result<Option<Self>> {
        let probe = std::process::Command::new("bash")
            .args(["-c", "true"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if !probe.map(|s| s.success()).unwrap_or(false) {
            eprintln!("bash not available, skipping");
            return Ok(None);
        }

        let (tx, mut sessions) = mpsc::unbounded_channel();
        let hub = Hub::builder()
            .with_stream_timeout(Duration::from_secs(10))
            .on_session_open(move |_, session| {
                let _ = tx.send(session);
                None::<OnClose>
            })
            .build()?;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(Arc::clone(&hub).serve(listener));

        let control = std::net::TcpStream::connect(addr)?;
        let stdin: Stdio = OwnedFd::from(control).into();
        let bash = tokio::process::Command::new("bash")
            .args(["--norc", "--noprofile", "--noediting", "+o", "history", "-i"])
            .stdin(stdin)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .context("failed to spawn bash")?;

        let session = tokio::time::timeout(Duration::from_secs(5), sessions.recv())
            .await
            .context("bash never attached")?
            .ok_or_else(|| anyhow!("session channel closed"))?;

        Ok(Some(Self {
            hub,
            session,
            _bash: bash,
        }))
    }
}
