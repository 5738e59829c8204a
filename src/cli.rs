use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "sensor-viewer",
    version,
    about = "STH-Comet sensor poller with a live chart dashboard"
)]
pub struct Args {
    /// Bind address for the dashboard, overrides VIEWER_HTTP_BIND.
    #[arg(long)]
    pub bind: Option<String>,
}
