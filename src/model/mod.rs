//! Core data model: message records, addresses, and outgoing messages.

pub mod address;
pub mod message;
pub mod outgoing;
