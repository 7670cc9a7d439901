//! Chat relay - Entry Point
//!
//! Accepts TCP participants and rebroadcasts each one's messages to all the others.

use log::info;
use std::process::ExitCode;

use chat_relay::error::RelayError;
use chat_relay::error::handlers::log_error;
use chat_relay::utils::logging::setup_logging;
use chat_relay::{RelayConfig, Server};

#[tokio::main]
async fn main() -> ExitCode {
    setup_logging();

    info!("Launching chat relay...");

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log_error(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), RelayError> {
    let config = RelayConfig::load()?;
    let server = Server::bind(config).await?;
    server.start().await;
    Ok(())
}
