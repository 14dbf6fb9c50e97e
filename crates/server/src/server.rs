use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use strand_http::connection::ConnectionDriver;
use tokio::net::TcpListener;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::connection::{self, Connection};
use crate::error::ServerError;
use crate::handler::Handler;

struct Inner<H> {
    handler: Arc<H>,
    config: ServerConfig,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    connections: Mutex<HashMap<u64, Connection>>,
    next_id: AtomicU64,
}

/// Accepts TCP connections and drives each one on its own task.
///
/// ```no_run
/// # async fn run() -> Result<(), strand_server::ServerError> {
/// use strand_server::{Callbacks, HttpServer};
///
/// let server = HttpServer::new(Callbacks::new());
/// server.accept(8080).await?;
/// // ...
/// server.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct HttpServer<H> {
    inner: Arc<Inner<H>>,
}

impl<H: Handler> HttpServer<H> {
    pub fn new(handler: H) -> Self {
        Self::with_config(handler, ServerConfig::default())
    }

    pub fn with_config(handler: H, config: ServerConfig) -> Self {
        let inner = Inner {
            handler: Arc::new(handler),
            config,
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
            connections: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        };
        Self { inner: Arc::new(inner) }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Starts accepting on every interface at `port`.
    pub async fn accept(&self, port: u16) -> Result<(), ServerError> {
        self.accept_on(SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port))).await?;
        Ok(())
    }

    /// Starts accepting on `addr` and returns the bound address, which tells
    /// the actual port when `addr` asked for port 0.
    pub async fn accept_on(&self, addr: SocketAddr) -> Result<SocketAddr, ServerError> {
        let listener = TcpListener::bind(addr).await.map_err(|e| ServerError::bind(addr, e))?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "start listening");

        let inner = Arc::clone(&self.inner);
        self.inner.tracker.spawn(accept_loop(inner, listener));
        Ok(local_addr)
    }

    /// Number of open connections.
    pub fn connection_count(&self) -> usize {
        self.inner.connections().len()
    }

    /// Stops accepting and drops all connections without waiting for their tasks.
    pub fn close(&self) {
        info!("closing server");
        self.inner.shutdown.cancel();
        self.inner.tracker.close();
        self.inner.connections().clear();
    }

    /// Like [`close`](Self::close), then waits until every connection task ended.
    pub async fn shutdown(&self) {
        self.close();
        self.inner.tracker.wait().await;
    }
}

impl<H> Inner<H> {
    fn connections(&self) -> MutexGuard<'_, HashMap<u64, Connection>> {
        self.connections.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<H> std::fmt::Debug for HttpServer<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpServer")
            .field("config", &self.inner.config)
            .field("connections", &self.inner.connections().len())
            .field("closed", &self.inner.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

async fn accept_loop<H: Handler>(inner: Arc<Inner<H>>, listener: TcpListener) {
    loop {
        let (tcp_stream, peer) = select! {
            () = inner.shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            },
        };

        if inner.config.nodelay {
            if let Err(e) = tcp_stream.set_nodelay(true) {
                warn!(%peer, cause = %e, "can't set TCP_NODELAY");
            }
        }

        let id = inner.next_id.fetch_add(1, Ordering::Relaxed);
        let connection = Connection::new(id, peer, ConnectionDriver::new(inner.config.connection));
        inner.connections().insert(id, connection.clone());
        info!(id, %peer, "accepted connection");

        let task_inner = Arc::clone(&inner);
        inner.tracker.spawn(async move {
            let handler = Arc::clone(&task_inner.handler);
            let shutdown = task_inner.shutdown.clone();
            connection::serve(connection, tcp_stream, handler, task_inner.config, shutdown).await;
            task_inner.connections().remove(&id);
        });
    }

    match listener.local_addr() {
        Ok(local_addr) => info!(%local_addr, "stop listening"),
        Err(e) => error!(cause = %e, "stop listening"),
    }
}
