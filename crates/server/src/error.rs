use std::io;
use std::net::SocketAddr;

use strand_http::protocol::SendError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("can't bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    /// The connection was closed, or its handle no longer points anywhere.
    #[error("connection is gone")]
    ConnectionGone,

    #[error("send error: {source}")]
    Send { source: SendError },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ServerError {
    pub fn bind(addr: SocketAddr, source: io::Error) -> Self {
        Self::Bind { addr, source }
    }

    pub fn is_gone(&self) -> bool {
        matches!(self, Self::ConnectionGone)
    }
}

impl From<SendError> for ServerError {
    fn from(source: SendError) -> Self {
        match source {
            SendError::Closed => Self::ConnectionGone,
            source => Self::Send { source },
        }
    }
}
