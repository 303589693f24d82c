//! shellmux hub binary
//!
//! Listens for remote shells and logs how to attach one.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{attach_hint, Cli};
use shellmux::{Hub, OnClose, Session};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let config = cli.hub_config()?;
    info!(
        "Starting shellmux hub (classify window {:?}, stream timeout {:?})",
        config.classify_window, config.stream_open_timeout
    );

    let mut builder = Hub::builder().with_config(config);
    if let Some(probe) = cli.probe.clone() {
        builder = builder.on_session_open(move |id, session| {
            tokio::spawn(run_probe(id, session, probe.clone()));
            None::<OnClose>
        });
    }
    let hub = builder.build()?;

    let listener = TcpListener::bind(cli.listen).await?;
    let addr = listener.local_addr()?;
    info!("Attach a shell with: {}", attach_hint(addr));

    let mut server = tokio::spawn(Arc::clone(&hub).serve(listener));

    tokio::select! {
        served = &mut server => {
            error!("Hub stopped unexpectedly");
            served??;
            return Ok(());
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!("Failed to listen for Ctrl-C: {}", e);
            }
            info!("Shutting down");
        }
    }

    hub.close().await;
    server.await??;
    info!("Hub stopped");
    Ok(())
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run_probe(id: u64, session: Arc<dyn Session>, probe: String) {
    match session.run(&probe).await {
        Ok(output) => info!(
            "Session {} probe {:?}: {}",
            id,
            probe,
            String::from_utf8_lossy(&output).trim_end()
        ),
        Err(e) => warn!("Session {} probe {:?} failed: {}", id, probe, e),
    }
}
