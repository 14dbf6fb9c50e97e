//! A tokio transport for the strand HTTP/1.1 engine
//!
//! [`HttpServer`] accepts TCP connections and runs one task per connection.
//! Each task feeds the bytes it reads into a
//! [`ConnectionDriver`](strand_http::connection::ConnectionDriver), hands the
//! resulting events to a [`Handler`] and writes back whatever the handler sent.
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use http::StatusCode;
//! use strand_http::protocol::ResponseHead;
//! use strand_server::{Callbacks, HttpServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), strand_server::ServerError> {
//!     let callbacks = Callbacks::new().on_request(|conn, request, _body| {
//!         let body = format!("you asked for {}", request.uri());
//!         let _ = conn.send(ResponseHead::response(StatusCode::OK), Bytes::from(body));
//!     });
//!
//!     let server = HttpServer::new(callbacks);
//!     server.accept(8080).await?;
//!     let _ = tokio::signal::ctrl_c().await;
//!     server.shutdown().await;
//!     Ok(())
//! }
//! ```

mod config;
mod connection;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use connection::Connection;
pub use connection::WeakConnection;
pub use error::ServerError;
pub use handler::Callbacks;
pub use handler::Handler;
pub use server::HttpServer;
