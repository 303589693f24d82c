//! Shared helpers for hub integration tests

#![allow(dead_code)]

use anyhow::{anyhow, Context, Result};
use shellmux::{Hub, OnClose, Session};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Hub serving on an ephemeral loopback port, reporting new sessions
pub struct TestHub {
    pub hub: Arc<Hub>,
    pub addr: SocketAddr,
    pub sessions: mpsc::UnboundedReceiver<(u64, Arc<dyn Session>)>,
    pub server: JoinHandle<shellmux::Result<()>>,
}

impl TestHub {
    pub async fn start(classify_window: Duration, stream_timeout: Duration) -> Result<Self> {
        let (tx, sessions) = mpsc::unbounded_channel();
        let hub = Hub::builder()
            .with_classify_window(classify_window)
            .with_stream_timeout(stream_timeout)
            .on_session_open(move |id, session| {
                let _ = tx.send((id, session));
                None::<OnClose>
            })
            .build()?;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(Arc::clone(&hub).serve(listener));

        Ok(Self {
            hub,
            addr,
            sessions,
            server,
        })
    }

    pub async fn next_session(&mut self) -> Result<(u64, Arc<dyn Session>)> {
        tokio::time::timeout(Duration::from_secs(5), self.sessions.recv())
            .await
            .context("no session opened in time")?
            .ok_or_else(|| anyhow!("session channel closed"))
    }
}

/// Control line fields as the remote shell sees them
#[derive(Debug, Clone)]
pub struct ControlLine {
    pub session_hex: String,
    pub stream_hex: String,
    pub command: String,
    pub endpoint: String,
}

/// Split ` { echo S T; CMD ; } 0<>/dev/tcp/HOST/PORT 1>&0 &` into its parts
pub fn parse_control_line(line: &str) -> Option<ControlLine> {
    let rest = line.strip_prefix(" { echo ")?;
    let (headers, rest) = rest.split_once("; ")?;
    let (session_hex, stream_hex) = headers.split_once(' ')?;
    let (command, rest) = rest.rsplit_once(" ; } 0<>/dev/tcp/")?;
    let dev_tcp = rest.strip_suffix(" 1>&0 &")?;
    let (host, port) = dev_tcp.rsplit_once('/')?;

    Some(ControlLine {
        session_hex: session_hex.to_string(),
        stream_hex: stream_hex.to_string(),
        command: command.to_string(),
        endpoint: format!("{}:{}", host, port),
    })
}

/// Stand-in for bash that understands just enough shell for the tests
///
/// Supported commands: `echo -n TEXT`, `echo TEXT`, `cat`, and a
/// `sleep SECONDS; ` prefix on any of them.
#[derive(Debug, Clone, Default)]
pub struct FakeShell {
    /// Wait this long between connecting and sending the headers
    pub header_delay: Duration,
}

impl FakeShell {
    /// Connect to the hub and serve control lines until the hub hangs up
    pub async fn attach(self, addr: SocketAddr) -> Result<JoinHandle<()>> {
        let control = TcpStream::connect(addr).await?;
        Ok(tokio::spawn(async move {
            let mut lines = BufReader::new(control).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(request) = parse_control_line(&line) {
                    let shell = self.clone();
                    tokio::spawn(async move {
                        let _ = shell.respond(request).await;
                    });
                }
            }
        }))
    }

    async fn respond(&self, request: ControlLine) -> Result<()> {
        let mut conn = TcpStream::connect(&request.endpoint).await?;
        if !self.header_delay.is_zero() {
            tokio::time::sleep(self.header_delay).await;
        }
        let announce = format!("{} {}\n", request.session_hex, request.stream_hex);
        conn.write_all(announce.as_bytes()).await?;

        let mut command = request.command.as_str();
        if let Some(rest) = command.strip_prefix("sleep ") {
            let (seconds, rest) = rest.split_once("; ").unwrap_or((rest, ""));
            let seconds: f64 = seconds.parse()?;
            tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
            command = rest;
        }

        if let Some(text) = command.strip_prefix("echo -n ") {
            conn.write_all(text.as_bytes()).await?;
        } else if let Some(text) = command.strip_prefix("echo ") {
            conn.write_all(format!("{}\n", text).as_bytes()).await?;
        } else if command == "cat" {
            let (mut reader, mut writer) = conn.split();
            tokio::io::copy(&mut reader, &mut writer).await?;
        }
        conn.shutdown().await?;
        Ok(())
    }
}

/// Whether bash can be spawned on this machine
pub fn bash_available() -> bool {
    std::process::Command::new("bash")
        .args(["-c", "true"])
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Start an interactive bash whose stdin is a fresh connection to `addr`
#[cfg(unix)]
pub async fn spawn_bash(addr: SocketAddr) -> Result<tokio::process::Child> {
    use std::os::fd::OwnedFd;
    use std::process::Stdio;

    let control = std::net::TcpStream::connect(addr)?;
    let stdin: Stdio = OwnedFd::from(control).into();

    let child = tokio::process::Command::new("bash")
        .args(["--norc", "--noprofile", "--noediting", "+o", "history", "-i"])
        .stdin(stdin)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .context("failed to spawn bash")?;
    Ok(child)
}

/// Read a stream to its end
pub async fn read_all(mut stream: shellmux::DataStream) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await?;
    Ok(out)
}
