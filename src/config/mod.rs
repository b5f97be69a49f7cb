//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, ServerConfig, KernelConfig, LogConfig)
//! - [`listen`]: WebSocket listener configuration (ListenConfig)
//! - [`validation`]: Startup checks that collect every problem at once

mod defaults;
mod listen;
mod types;
pub mod validation;

pub use listen::ListenConfig;
pub use types::{Config, ConfigError, KernelConfig, LogConfig, LogFormat, ServerConfig};
