//! Shared connection handles and the per-connection task.
//!
//! A [`Connection`] wraps one [`ConnectionDriver`] behind a mutex. The server
//! registry and the connection task hold the strong handles; handlers get a
//! [`WeakConnection`] that has to be upgraded before use and fails with
//! [`ServerError::ConnectionGone`] once the connection is closed.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use bytes::{Bytes, BytesMut};
use strand_http::connection::{ConnectionDriver, Event};
use strand_http::protocol::{LastChunk, RequestHead, ResponseHead, SendError};
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::select;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::handler::Handler;

#[derive(Debug)]
struct Shared {
    id: u64,
    peer: SocketAddr,
    driver: Mutex<ConnectionDriver>,
    /// Wakes the connection task when output was queued from elsewhere
    output_ready: Notify,
}

/// Strong handle to an open connection.
#[derive(Debug, Clone)]
pub struct Connection {
    shared: Arc<Shared>,
}

/// Handle that doesn't keep its connection alive.
#[derive(Debug, Clone)]
pub struct WeakConnection {
    id: u64,
    shared: Weak<Shared>,
}

impl Connection {
    pub(crate) fn new(id: u64, peer: SocketAddr, driver: ConnectionDriver) -> Self {
        let shared = Shared { id, peer, driver: Mutex::new(driver), output_ready: Notify::new() };
        Self { shared: Arc::new(shared) }
    }

    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.shared.peer
    }

    pub fn downgrade(&self) -> WeakConnection {
        WeakConnection { id: self.shared.id, shared: Arc::downgrade(&self.shared) }
    }

    pub fn is_closed(&self) -> bool {
        self.driver().is_closed()
    }

    /// Sends a response with `body` framed by Content-Length.
    pub fn send(&self, head: ResponseHead, body: Bytes) -> Result<(), ServerError> {
        self.with_output(|driver| driver.send_response(head, body))
    }

    pub fn send_chunked(&self, head: ResponseHead) -> Result<(), ServerError> {
        self.with_output(|driver| driver.send_chunked_response(head))
    }

    pub fn send_chunk(&self, data: Bytes) -> Result<(), ServerError> {
        self.with_output(|driver| driver.send_chunk(data))
    }

    pub fn send_last_chunk(&self, last_chunk: LastChunk) -> Result<(), ServerError> {
        self.with_output(|driver| driver.send_last_chunk(last_chunk))
    }

    /// Answers `Expect: 100-continue` with `100` or `413`.
    pub fn continue_or_reject(&self, head: &RequestHead) -> Result<(), ServerError> {
        self.with_output(|driver| driver.continue_or_reject(head))
    }

    fn driver(&self) -> MutexGuard<'_, ConnectionDriver> {
        // the driver stays consistent even if a holder panicked
        self.shared.driver.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_output<F>(&self, f: F) -> Result<(), ServerError>
    where
        F: FnOnce(&mut ConnectionDriver) -> Result<(), SendError>,
    {
        let result = f(&mut self.driver());
        if result.is_ok() {
            self.shared.output_ready.notify_one();
        }
        result.map_err(ServerError::from)
    }

    fn receive(&self, data: &[u8]) {
        self.driver().receive(data);
    }

    fn poll_event(&self) -> Option<Event> {
        self.driver().poll_event()
    }

    fn take_output(&self) -> Option<Bytes> {
        self.driver().take_output()
    }

    fn should_close(&self) -> bool {
        self.driver().should_close()
    }

    fn disconnect(&self) -> Event {
        self.driver().disconnect()
    }
}

impl WeakConnection {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The connection, unless it was already dropped.
    pub fn upgrade(&self) -> Option<Connection> {
        self.shared.upgrade().map(|shared| Connection { shared })
    }

    fn live(&self) -> Result<Connection, ServerError> {
        self.upgrade().ok_or(ServerError::ConnectionGone)
    }

    pub fn send(&self, head: ResponseHead, body: Bytes) -> Result<(), ServerError> {
        self.live()?.send(head, body)
    }

    pub fn send_chunked(&self, head: ResponseHead) -> Result<(), ServerError> {
        self.live()?.send_chunked(head)
    }

    pub fn send_chunk(&self, data: Bytes) -> Result<(), ServerError> {
        self.live()?.send_chunk(data)
    }

    pub fn send_last_chunk(&self, last_chunk: LastChunk) -> Result<(), ServerError> {
        self.live()?.send_last_chunk(last_chunk)
    }

    pub fn continue_or_reject(&self, head: &RequestHead) -> Result<(), ServerError> {
        self.live()?.continue_or_reject(head)
    }
}

/// Hands every pending event to `handler`, with the driver unlocked.
fn dispatch<H: Handler + ?Sized>(connection: &Connection, handler: &H) {
    while let Some(event) = connection.poll_event() {
        let weak = connection.downgrade();
        match event {
            Event::Request { head, body } => handler.on_request(weak, &head, &body),
            Event::Chunk(chunk) => handler.on_chunk(weak, &chunk, chunk.data()),
            Event::ExpectContinue { head } => handler.on_expect_continue(weak, &head, &Bytes::new()),
            Event::Invalid(error) => {
                warn!(id = connection.id(), peer = %connection.peer_addr(), %error, "received invalid request");
            }
            Event::Disconnected => handler.on_disconnect(weak),
        }
    }
}

async fn flush(connection: &Connection, writer: &mut (impl AsyncWrite + Unpin)) -> Result<(), ServerError> {
    while let Some(bytes) = connection.take_output() {
        writer.write_all(&bytes).await?;
    }
    writer.flush().await?;
    Ok(())
}

/// Reads from `stream` until the peer leaves, the protocol closes the
/// connection or `shutdown` fires, then raises the disconnect event.
pub(crate) async fn serve<H: Handler + ?Sized>(
    connection: Connection,
    stream: TcpStream,
    handler: Arc<H>,
    config: ServerConfig,
    shutdown: CancellationToken,
) {
    let id = connection.id();
    let (mut reader, mut writer) = stream.into_split();
    let mut buf = BytesMut::with_capacity(config.read_buffer_size);

    loop {
        // events can come from a read or from an answer sent through a weak handle
        dispatch(&connection, handler.as_ref());
        if let Err(e) = flush(&connection, &mut writer).await {
            warn!(id, cause = %e, "can't write response");
            break;
        }
        if connection.should_close() {
            debug!(id, "protocol finished, closing connection");
            break;
        }

        buf.reserve(config.read_buffer_size);
        select! {
            biased;
            () = shutdown.cancelled() => {
                info!(id, "server closing, drop connection");
                break;
            }
            () = connection.shared.output_ready.notified() => {}
            read = reader.read_buf(&mut buf) => match read {
                Ok(0) => {
                    debug!(id, "peer closed connection");
                    break;
                }
                Ok(_) => {
                    connection.receive(&buf);
                    buf.clear();
                }
                Err(e) => {
                    warn!(id, cause = %e, "can't read from connection");
                    break;
                }
            }
        }
    }

    if matches!(connection.disconnect(), Event::Disconnected) {
        handler.on_disconnect(connection.downgrade());
    }
    if let Err(e) = writer.shutdown().await {
        debug!(id, cause = %e, "can't shut down write side");
    }
    info!(id, peer = %connection.peer_addr(), "connection closed");
}
