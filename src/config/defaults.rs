//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

use std::net::SocketAddr;

pub fn default_server_name() -> String {
    "buzzd".to_string()
}

pub fn default_metrics_port() -> u16 {
    9090
}

pub fn default_listen_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

// =============================================================================
// Kernel Defaults
// =============================================================================

pub fn default_queue_capacity() -> usize {
    1024
}

pub fn default_client_queue() -> usize {
    256
}
