//! Application callbacks.
//!
//! Callbacks run on the connection task with the connection unlocked, so they
//! may answer right away through the [`WeakConnection`] they get. To answer
//! later, keep the handle and upgrade it then; a connection that is gone by
//! that time yields [`ServerError::ConnectionGone`](crate::ServerError::ConnectionGone).

use std::fmt;

use bytes::Bytes;
use http::StatusCode;
use strand_http::protocol::{Chunk, RequestHead, ResponseHead};
use tracing::{debug, warn};

use crate::connection::WeakConnection;

/// Receives the events of every connection of a server.
pub trait Handler: Send + Sync + 'static {
    /// A complete request, or the head of a chunked one whose chunks follow
    /// through [`on_chunk`](Handler::on_chunk).
    fn on_request(&self, conn: WeakConnection, request: &RequestHead, body: &Bytes);

    /// One chunk of a chunked request; the last one has `chunk.is_last()`.
    fn on_chunk(&self, conn: WeakConnection, chunk: &Chunk, data: &Bytes) {
        debug!(id = conn.id(), size = chunk.size(), len = data.len(), "chunk ignored");
    }

    /// The client waits for `100 Continue`. Answers `100`, or `413` when the
    /// announced body exceeds the configured limit, unless overridden.
    fn on_expect_continue(&self, conn: WeakConnection, request: &RequestHead, _body: &Bytes) {
        if let Err(e) = conn.continue_or_reject(request) {
            warn!(id = conn.id(), cause = %e, "can't answer expect-continue");
        }
    }

    fn on_disconnect(&self, conn: WeakConnection) {
        debug!(id = conn.id(), "connection disconnected");
    }
}

type RequestFn = Box<dyn Fn(WeakConnection, &RequestHead, &Bytes) + Send + Sync>;
type ChunkFn = Box<dyn Fn(WeakConnection, &Chunk, &Bytes) + Send + Sync>;
type DisconnectFn = Box<dyn Fn(WeakConnection) + Send + Sync>;

/// A [`Handler`] assembled from closures.
///
/// Callbacks left unset behave like the trait's defaults; requests without an
/// `on_request` callback are answered with `404 Not Found`.
///
/// ```no_run
/// use bytes::Bytes;
/// use http::StatusCode;
/// use strand_http::protocol::ResponseHead;
/// use strand_server::Callbacks;
///
/// let callbacks = Callbacks::new().on_request(|conn, _request, _body| {
///     let _ = conn.send(ResponseHead::response(StatusCode::OK), Bytes::from_static(b"ok"));
/// });
/// ```
#[derive(Default)]
pub struct Callbacks {
    on_request: Option<RequestFn>,
    on_chunk: Option<ChunkFn>,
    on_expect_continue: Option<RequestFn>,
    on_disconnect: Option<DisconnectFn>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_request<F>(mut self, f: F) -> Self
    where
        F: Fn(WeakConnection, &RequestHead, &Bytes) + Send + Sync + 'static,
    {
        self.on_request = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_chunk<F>(mut self, f: F) -> Self
    where
        F: Fn(WeakConnection, &Chunk, &Bytes) + Send + Sync + 'static,
    {
        self.on_chunk = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_expect_continue<F>(mut self, f: F) -> Self
    where
        F: Fn(WeakConnection, &RequestHead, &Bytes) + Send + Sync + 'static,
    {
        self.on_expect_continue = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_disconnect<F>(mut self, f: F) -> Self
    where
        F: Fn(WeakConnection) + Send + Sync + 'static,
    {
        self.on_disconnect = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_request", &self.on_request.is_some())
            .field("on_chunk", &self.on_chunk.is_some())
            .field("on_expect_continue", &self.on_expect_continue.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .finish()
    }
}

impl Handler for Callbacks {
    fn on_request(&self, conn: WeakConnection, request: &RequestHead, body: &Bytes) {
        match &self.on_request {
            Some(f) => f(conn, request, body),
            None => {
                let response = ResponseHead::response(StatusCode::NOT_FOUND);
                if let Err(e) = conn.send(response, Bytes::new()) {
                    warn!(id = conn.id(), cause = %e, "can't send default response");
                }
            }
        }
    }

    fn on_chunk(&self, conn: WeakConnection, chunk: &Chunk, data: &Bytes) {
        match &self.on_chunk {
            Some(f) => f(conn, chunk, data),
            None => debug!(id = conn.id(), size = chunk.size(), "chunk ignored"),
        }
    }

    fn on_expect_continue(&self, conn: WeakConnection, request: &RequestHead, body: &Bytes) {
        match &self.on_expect_continue {
            Some(f) => f(conn, request, body),
            None => {
                if let Err(e) = conn.continue_or_reject(request) {
                    warn!(id = conn.id(), cause = %e, "can't answer expect-continue");
                }
            }
        }
    }

    fn on_disconnect(&self, conn: WeakConnection) {
        if let Some(f) = &self.on_disconnect {
            f(conn);
        }
    }
}
