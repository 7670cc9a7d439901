//! Server core functionality
//!
//! This module contains the listener that accepts participants and the
//! configuration it is started with.

pub mod config;
pub mod core;

pub use config::RelayConfig;
pub use core::Server;
