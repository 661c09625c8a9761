//! Broadcast chat server library: roster, per-connection state machine,
//! stats reporter and the accept loop that wires them together.

pub mod connection;
pub mod roster;
pub mod server;
pub mod stats;

pub use server::Server;
