//! Message router
//!
//! Fans a payload out to every registered participant except its sender.
//! Each recipient is independent: a failed delivery closes that recipient's
//! outbound path and never reaches the sender or anyone else. The router only
//! reads registry snapshots; the evicted session's handler wakes up on the
//! closed path and removes its own entry.

use log::{debug, warn};

use crate::client::{ClientRegistry, SessionId};
use crate::error::DeliveryError;

/// Outcome of routing one payload.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RouteReport {
    pub delivered: usize,
    pub dropped: Vec<SessionId>,
}

#[derive(Clone)]
pub struct Router {
    registry: ClientRegistry,
}

impl Router {
    pub fn new(registry: ClientRegistry) -> Self {
        Self { registry }
    }

    /// Delivers `payload` to everyone registered at the moment of routing, except `sender`.
    pub async fn route(&self, sender: SessionId, payload: &str) -> RouteReport {
        let recipients = self.registry.snapshot(sender).await;
        let mut report = RouteReport::default();

        for client in &recipients {
            match client.outbound().deliver(client.id(), payload) {
                Ok(()) => report.delivered += 1,
                Err(DeliveryError::Closed(id)) => {
                    // Already torn down, or in the middle of it.
                    debug!("Skipping closed session {}", id);
                    report.dropped.push(id);
                }
                Err(e) => {
                    warn!(
                        "Evicting session {} while routing from {}: {}",
                        client.id(),
                        sender,
                        e
                    );
                    client.outbound().close();
                    report.dropped.push(client.id());
                }
            }
        }

        debug!(
            "Routed frame from {} to {}/{} recipients",
            sender,
            report.delivered,
            recipients.len()
        );
        report
    }
}
