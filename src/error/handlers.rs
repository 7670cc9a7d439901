//! Error handlers
//!
//! Maps each error to the log level it deserves.

use crate::error::types::{ListenerError, RelayError};
use log::{error, warn};

/// Log a relay error at the level matching its severity
pub fn log_error(err: &RelayError) {
    if is_fatal(err) {
        error!("Relay error: {}", err);
    } else {
        warn!("Relay error: {}", err);
    }
}

/// Whether the error prevents the server from running at all
pub fn is_fatal(err: &RelayError) -> bool {
    matches!(
        err,
        RelayError::Listener(ListenerError::Bind(..)) | RelayError::Config(_)
    )
}
