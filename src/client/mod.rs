//! Client management system
//!
//! Handles participant state, the shared registry, and per-connection session lifecycle.

pub mod handler;
pub mod registry;
pub mod state;

pub use handler::handle_client;
pub use registry::ClientRegistry;
pub use state::{Client, Outbound, SessionId};
