//! Websocket transport between the vision core and its UI clients.
//!
//! Inbound messages are JSON, decoded into the server's message type.
//! Outbound messages are JSON text or opaque binary (stream frames).

pub mod error;
pub mod ws;

pub use error::ComError;
pub use ws::{Incoming, MAX_MESSAGE_SIZE, WsClient, WsServer};
