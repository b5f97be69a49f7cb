//! Integration test common infrastructure.
//!
//! Provides a recording [`buzzd::client::Client`], an in-process gateway and a
//! WebSocket test client.

#![allow(dead_code)]

pub mod client;
pub mod server;
pub mod ws;

#[allow(unused_imports)]
pub use client::{Event, Recorder};
#[allow(unused_imports)]
pub use server::TestServer;
#[allow(unused_imports)]
pub use ws::TestWsClient;
