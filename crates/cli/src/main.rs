use anyhow::Result;
use clap::Parser;
use std::time::Duration;

mod commands;
use commands::{execute_serve_command, init_tracing, ServeArgs};

#[derive(Parser, Debug)]
#[command(name = "echo-server")]
#[command(about = "HTTP echo server - replies to every request with a JSON mirror of it")]
#[command(version)]
pub struct Cli {
    /// Host to bind
    #[arg(default_value = "127.0.0.1")]
    pub host: String,
    /// Port to listen on
    #[arg(default_value_t = 8080)]
    pub port: u16,
    /// Seconds to wait for in-flight requests on shutdown
    #[arg(long, default_value_t = 5)]
    pub drain_timeout_secs: u64,
    /// Maximum request body size in bytes
    #[arg(long, default_value_t = 16 * 1024 * 1024)]
    pub max_body_bytes: usize,
    /// Diagnostic log filter (overrides RUST_LOG)
    #[arg(long)]
    pub log_filter: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.log_filter.as_deref())?;

    execute_serve_command(ServeArgs {
        host: cli.host,
        port: cli.port,
        drain_timeout: Duration::from_secs(cli.drain_timeout_secs),
        max_body_bytes: cli.max_body_bytes,
    })
    .await
}
