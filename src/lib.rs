//! buzzd - Buzzer Daemon
//!
//! The kernel of a small social feed: users register, post short messages,
//! follow each other and get pushed the posts that concern them.
//!
//! A single [`kernel::Kernel`] worker owns the [`state::Store`] and applies
//! requests one at a time; every connection talks to it through a cloned
//! [`kernel::KernelHandle`] and receives pushes through the [`client::Client`]
//! it registered at login.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod kernel;
pub mod metrics;
pub mod network;
pub mod simulate;
pub mod state;
pub mod telemetry;
