//! HTTP connection handling module
//!
//! [`ConnectionDriver`] is the protocol side of one server connection: it
//! turns received bytes into [`Event`]s and responses into bytes to send,
//! leaving all I/O to the transport that owns it.

mod driver;

pub use driver::ConnectionDriver;
pub use driver::Event;
