mod client;
pub use client::*;

mod server;
pub use server::*;

/// Largest inbound message accepted from a peer.
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;
