//! MIME rendering: header encoding and full message serialization.

pub mod encode;
pub mod serialize;

pub use serialize::serialize_message;
