//! Shared protocol, framing and client-driver code for the chat service.

pub mod authfile;
pub mod client;
pub mod codec;
pub mod protocol;
pub mod sanitize;
