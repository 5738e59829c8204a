mod charts;
mod cli;
mod config;
mod http;
mod poller;
mod snapshot;
mod sth;
mod time;

use crate::config::ViewerConfig;
use crate::snapshot::Snapshot;
use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

fn init_tracing() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,sensor_viewer=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}

async fn bind_listener(addr: &str) -> Result<TcpListener> {
    match TcpListener::bind(addr).await {
        Ok(listener) => Ok(listener),
        Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
            anyhow::bail!(
                "Failed to bind dashboard listener on {addr}: port already in use. Stop the other service using this port or re-run with --bind to choose another address.",
            );
        }
        Err(err) => Err(err).with_context(|| format!("failed to bind dashboard listener on {addr}")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    init_tracing()?;
    let config = ViewerConfig::from_env(args.bind)?;

    let client = sth::SthClient::new(&config)?;

    let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::empty());
    let (charts_tx, charts_rx) = watch::channel(charts::render(&Snapshot::empty()));

    let cancel = CancellationToken::new();
    charts::start_render_task(snapshot_rx.clone(), charts_tx, cancel.clone());
    poller::SensorPoller::new(config.clone(), client, snapshot_tx).start(cancel.clone());

    let app = http::router(http::AppState {
        snapshot: snapshot_rx,
        charts: charts_rx,
        refresh_ms: config.poll_interval.as_millis() as u64,
    });
    let listener = bind_listener(&config.http_bind).await?;
    tracing::info!(
        bind = %config.http_bind,
        sth_url = %config.sth_base_url,
        entity = %config.entity_id,
        timezone = %config.timezone,
        "sensor-viewer dashboard listening"
    );
    let http_handle = tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
        _ = http_handle => {}
    }

    cancel.cancel();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::bind_listener;
    use anyhow::Result;

    #[tokio::test]
    async fn reports_port_in_use_with_actionable_message() -> Result<()> {
        let listener = match std::net::TcpListener::bind("127.0.0.1:0") {
            Ok(listener) => listener,
            Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };
        let addr = listener.local_addr()?;

        let err = bind_listener(&addr.to_string())
            .await
            .expect_err("bind should fail while the port is held");
        assert!(err.to_string().contains("already in use"));
        Ok(())
    }
}
