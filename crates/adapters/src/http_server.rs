//! Echo server lifecycle.
//!
//! [`EchoServer`] owns the configured host and port and, while running, the
//! axum serve task bound to them. `start` and `stop` are serialized through an
//! async mutex; `is_running` reads an atomic flag and never blocks.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use echo_runtime::{EchoResponder, LogSink, StdoutSink};
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::echo_router::{echo_router, EchoRouterConfig, DEFAULT_MAX_BODY_BYTES};
use crate::errors::ServerError;
use crate::Result;

/// Configuration for the echo server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host name or IP address to bind
    pub host: String,
    /// TCP port to bind (0 picks a free port)
    pub port: u16,
    /// How long `stop` waits for in-flight requests before aborting
    pub drain_timeout: Duration,
    /// Maximum accepted request body size
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            drain_timeout: Duration::from_secs(5),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Lifecycle state of an [`EchoServer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Running,
}

/// Handle to the spawned serve task
struct RunningListener {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

/// HTTP echo server with explicit start/stop lifecycle.
///
/// The object is reusable: it can be started again after `stop`. Dropping a
/// running server signals its serve task to shut down.
pub struct EchoServer {
    config: ServerConfig,
    responder: EchoResponder,
    running: AtomicBool,
    listener: Mutex<Option<RunningListener>>,
    bound_addr: RwLock<Option<SocketAddr>>,
}

impl EchoServer {
    /// Create a stopped server for `host:port` with default settings,
    /// logging to stdout
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::with_config(ServerConfig {
            host: host.into(),
            port,
            ..Default::default()
        })
    }

    /// Create a stopped server from a full configuration, logging to stdout
    pub fn with_config(config: ServerConfig) -> Self {
        Self::with_sink(config, Arc::new(StdoutSink))
    }

    /// Create a stopped server that writes access-log and lifecycle lines to
    /// `sink`
    pub fn with_sink(config: ServerConfig, sink: Arc<dyn LogSink>) -> Self {
        Self {
            config,
            responder: EchoResponder::new(sink),
            running: AtomicBool::new(false),
            listener: Mutex::new(None),
            bound_addr: RwLock::new(None),
        }
    }

    /// Bind the configured address and start serving.
    ///
    /// Fails with [`ServerError::AlreadyRunning`] if the server is running and
    /// with [`ServerError::BindFailed`] if the address cannot be bound; in both
    /// cases the state is unchanged.
    pub async fn start(&self) -> Result<()> {
        let mut slot = self.listener.lock().await;
        if slot.is_some() {
            return Err(ServerError::AlreadyRunning);
        }

        let address = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port))
            .await
            .map_err(|source| {
                error!(error = %source, addr = %address, "Failed to bind to address");
                ServerError::BindFailed {
                    address: address.clone(),
                    source,
                }
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::BindFailed {
                address: address.clone(),
                source,
            })?;

        let router = echo_router(
            self.responder.clone(),
            EchoRouterConfig {
                max_body_bytes: self.config.max_body_bytes,
            },
        );
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        // Running must be visible before the first request can be dispatched
        self.set_bound_addr(Some(local_addr));
        self.running.store(true, Ordering::SeqCst);

        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    // Fires on explicit stop and when the sender is dropped
                    let _ = shutdown_rx.await;
                })
                .await
        });

        *slot = Some(RunningListener {
            shutdown: shutdown_tx,
            task,
        });

        info!(
            host = %self.config.host,
            port = self.config.port,
            local_addr = %local_addr,
            "HTTP echo server listening"
        );
        self.responder.sink().write_line(&format!(
            "HTTP Echo server listening on http://{}:{}",
            self.config.host, self.config.port
        ));

        Ok(())
    }

    /// Stop serving. A no-op when the server is already stopped.
    ///
    /// New connections are refused immediately; in-flight requests get up to
    /// `drain_timeout` to finish before the serve task is aborted. The server
    /// is stopped when this returns, even if the serve task reported an error.
    pub async fn stop(&self) -> Result<()> {
        let mut slot = self.listener.lock().await;
        let Some(RunningListener { shutdown, mut task }) = slot.take() else {
            return Ok(());
        };

        let _ = shutdown.send(());

        let outcome = match timeout(self.config.drain_timeout, &mut task).await {
            Ok(joined) => serve_outcome(joined),
            Err(_) => {
                warn!(
                    drain_timeout_ms = self.config.drain_timeout.as_millis() as u64,
                    "In-flight requests did not drain in time, aborting"
                );
                task.abort();
                let _ = task.await;
                Ok(())
            }
        };

        self.running.store(false, Ordering::SeqCst);
        self.set_bound_addr(None);

        if let Err(e) = &outcome {
            error!(error = %e, "HTTP echo server stopped with error");
        }
        info!(host = %self.config.host, port = self.config.port, "HTTP echo server stopped");
        self.responder.sink().write_line("Server stopped");

        outcome
    }

    /// Whether the server is currently bound and dispatching
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Current lifecycle state
    pub fn state(&self) -> ServerState {
        if self.is_running() {
            ServerState::Running
        } else {
            ServerState::Stopped
        }
    }

    /// Configured host
    pub fn host(&self) -> &str {
        &self.config.host
    }

    /// Configured port
    pub fn port(&self) -> u16 {
        self.config.port
    }

    /// Address actually bound while running. Differs from the configured
    /// port when that port is 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match self.bound_addr.read() {
            Ok(addr) => *addr,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_bound_addr(&self, addr: Option<SocketAddr>) {
        match self.bound_addr.write() {
            Ok(mut slot) => *slot = addr,
            Err(poisoned) => *poisoned.into_inner() = addr,
        }
    }
}

/// Map the joined serve task to the result reported by `stop`
fn serve_outcome(joined: std::result::Result<std::io::Result<()>, JoinError>) -> Result<()> {
    match joined {
        Ok(result) => result.map_err(ServerError::from),
        Err(join_error) => Err(ServerError::Join(join_error)),
    }
}

impl std::fmt::Debug for EchoServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EchoServer")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("local_addr", &self.local_addr())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use echo_runtime::MemorySink;
    use std::sync::{OnceLock, Weak};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    /// Records `is_running()` every time an access-log line is written
    #[derive(Default)]
    struct RunningFlagSink {
        server: OnceLock<Weak<EchoServer>>,
        observed: std::sync::Mutex<Vec<bool>>,
    }

    impl LogSink for RunningFlagSink {
        fn write_line(&self, line: &str) {
            if !line.starts_with('[') {
                return;
            }
            let running = self
                .server
                .get()
                .and_then(Weak::upgrade)
                .map(|server| server.is_running())
                .unwrap_or(false);
            self.observed.lock().unwrap().push(running);
        }
    }

    fn ephemeral_server() -> (EchoServer, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let config = ServerConfig {
            port: 0,
            drain_timeout: Duration::from_secs(2),
            ..Default::default()
        };
        (EchoServer::with_sink(config, sink.clone()), sink)
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.drain_timeout, Duration::from_secs(5));
        assert_eq!(config.max_body_bytes, 16 * 1024 * 1024);
    }

    #[test]
    fn test_new_server_is_stopped() {
        let server = EchoServer::new("localhost", 9123);
        assert_eq!(server.host(), "localhost");
        assert_eq!(server.port(), 9123);
        assert!(!server.is_running());
        assert_eq!(server.state(), ServerState::Stopped);
        assert_eq!(server.local_addr(), None);
    }

    #[tokio::test]
    async fn test_stop_when_stopped_is_noop() {
        let (server, sink) = ephemeral_server();
        server.stop().await.unwrap();
        server.stop().await.unwrap();
        assert!(!server.is_running());
        assert!(sink.lines().is_empty());
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let (server, sink) = ephemeral_server();

        server.start().await.unwrap();
        assert!(server.is_running());
        assert_eq!(server.state(), ServerState::Running);
        let addr = server.local_addr().unwrap();
        assert_ne!(addr.port(), 0);

        server.stop().await.unwrap();
        assert!(!server.is_running());
        assert_eq!(server.local_addr(), None);

        assert_eq!(
            sink.lines(),
            vec![
                "HTTP Echo server listening on http://127.0.0.1:0".to_string(),
                "Server stopped".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_double_start_fails() {
        let (server, _) = ephemeral_server();
        server.start().await.unwrap();
        let addr = server.local_addr();

        let err = server.start().await.unwrap_err();
        assert!(matches!(err, ServerError::AlreadyRunning));
        assert_eq!(err.to_string(), "Server is already running");
        assert!(server.is_running());
        assert_eq!(server.local_addr(), addr);

        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let (server, _) = ephemeral_server();
        for _ in 0..3 {
            server.start().await.unwrap();
            assert!(server.is_running());
            server.stop().await.unwrap();
            assert!(!server.is_running());
        }
    }

    #[tokio::test]
    async fn test_bind_failure_leaves_server_stopped() {
        let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = occupied.local_addr().unwrap().port();

        let sink = Arc::new(MemorySink::new());
        let server = EchoServer::with_sink(
            ServerConfig {
                port,
                ..Default::default()
            },
            sink.clone(),
        );

        let err = server.start().await.unwrap_err();
        match err {
            ServerError::BindFailed { address, .. } => {
                assert_eq!(address, format!("127.0.0.1:{}", port));
            }
            other => panic!("expected BindFailed, got {:?}", other),
        }
        assert!(!server.is_running());
        assert!(sink.lines().is_empty());
    }

    #[tokio::test]
    async fn test_accessors_stable_across_lifecycle() {
        let (server, _) = ephemeral_server();
        assert_eq!((server.host(), server.port()), ("127.0.0.1", 0));
        server.start().await.unwrap();
        assert_eq!((server.host(), server.port()), ("127.0.0.1", 0));
        server.stop().await.unwrap();
        assert_eq!((server.host(), server.port()), ("127.0.0.1", 0));
    }

    #[tokio::test]
    async fn test_concurrent_start_only_one_wins() {
        let (server, _) = ephemeral_server();
        let server = Arc::new(server);

        let a = tokio::spawn({
            let server = server.clone();
            async move { server.start().await }
        });
        let b = tokio::spawn({
            let server = server.clone();
            async move { server.start().await }
        });

        let results = [a.await.unwrap(), b.await.unwrap()];
        let ok = results.iter().filter(|r| r.is_ok()).count();
        let already = results
            .iter()
            .filter(|r| matches!(r, Err(ServerError::AlreadyRunning)))
            .count();
        assert_eq!((ok, already), (1, 1));

        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_requests_only_dispatched_while_running() {
        let sink = Arc::new(RunningFlagSink::default());
        let server = Arc::new(EchoServer::with_sink(
            ServerConfig {
                port: 0,
                drain_timeout: Duration::from_secs(2),
                ..Default::default()
            },
            sink.clone(),
        ));
        let _ = sink.server.set(Arc::downgrade(&server));

        server.start().await.unwrap();
        let addr = server.local_addr().unwrap();

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /flag HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await.unwrap();
        assert!(raw.starts_with(b"HTTP/1.1 200"));

        server.stop().await.unwrap();
        assert_eq!(*sink.observed.lock().unwrap(), vec![true]);
    }

    #[tokio::test]
    async fn test_panicked_serve_task_is_reported() {
        let joined = tokio::spawn(async {
            if true {
                panic!("serve task blew up");
            }
            Ok::<(), std::io::Error>(())
        })
        .await;

        let err = serve_outcome(joined).unwrap_err();
        assert!(matches!(err, ServerError::Join(_)));
        assert!(err.to_string().starts_with("Server task panicked or was cancelled"));
    }

    #[test]
    fn test_serve_io_error_is_reported() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "accept failed");
        let err = serve_outcome(Ok(Err(io))).unwrap_err();
        assert!(matches!(err, ServerError::Serve(_)));
        assert!(serve_outcome(Ok(Ok(()))).is_ok());
    }
}
