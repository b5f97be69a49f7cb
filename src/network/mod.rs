//! Network module.
//!
//! Contains the WebSocket Gateway, the per-client Connection handler and the
//! text command protocol.

mod connection;
mod gateway;
pub mod protocol;

pub use connection::Connection;
pub use gateway::Gateway;
