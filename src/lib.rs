pub mod client;
pub mod error;
pub mod protocol;
pub mod router;
pub mod server;
pub mod utils;

pub use client::ClientRegistry;
pub use router::Router;
pub use server::{RelayConfig, Server};
