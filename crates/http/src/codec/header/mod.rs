//! Message head processing: field lines, whole heads and head encoding
//!
//! # Components
//!
//! - [`FieldParser`]: one `Name: value` line at a time, folding and the blank
//!   line included
//! - [`HeadParser`]: start line plus fields into a [`MessageHead`](crate::protocol::MessageHead)
//! - [`HeadEncoder`]: writes a head with framing fields matching the body

mod field_parser;
mod head_encoder;
mod head_parser;

pub use field_parser::FieldItem;
pub use field_parser::FieldParser;
pub use head_encoder::HeadEncoder;
pub use head_parser::HeadParser;
