//! Serve command implementation
//!
//! Starts the echo server, waits for Ctrl+C or SIGTERM and shuts the server
//! down before returning.

use anyhow::{Context, Result};
use echo_adapters::{EchoServer, ServerConfig};
use std::future::Future;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Diagnostic filter used when neither `--log-filter` nor `RUST_LOG` is set
const DEFAULT_LOG_FILTER: &str = "echo_server=info,echo_adapters=info,echo_runtime=info,warn";

/// Arguments for the serve command
pub struct ServeArgs {
    /// Host to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// How long shutdown waits for in-flight requests
    pub drain_timeout: Duration,
    /// Maximum request body size
    pub max_body_bytes: usize,
}

/// Install the stderr tracing subscriber.
///
/// Access-log lines go to stdout through the server's sink, so diagnostics
/// are kept on stderr.
pub fn init_tracing(filter: Option<&str>) -> Result<()> {
    let filter = match filter {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("Invalid log filter '{}'", directives))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Execute the serve command
pub async fn execute_serve_command(args: ServeArgs) -> Result<()> {
    let server = EchoServer::with_config(ServerConfig {
        host: args.host,
        port: args.port,
        drain_timeout: args.drain_timeout,
        max_body_bytes: args.max_body_bytes,
    });

    serve_until(&server, wait_for_shutdown()).await
}

/// Start `server`, run until `shutdown` resolves, then stop it.
///
/// Errors while stopping are logged; only startup failures are returned.
pub async fn serve_until<F>(server: &EchoServer, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    server
        .start()
        .await
        .context("Failed to start echo server")?;

    println!("Press Ctrl+C to stop the server");

    shutdown.await;

    println!("\nShutting down...");
    if let Err(e) = server.stop().await {
        warn!(error = %e, "Echo server reported an error while stopping");
    }

    info!("Shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
