//! Module `state`
//!
//! Defines the `Client` struct representing one connected participant,
//! its session identifier, and the bounded outbound path used to reach it.

use std::fmt;
use std::net::SocketAddr;
use std::sync::{Mutex, OnceLock, PoisonError};

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::futures::Notified;
use tokio::sync::{Notify, mpsc};

use crate::error::DeliveryError;

/// Unique identifier assigned to a connection at accept time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Bounded queue of frames waiting to be written to one participant's socket.
///
/// Closing drops the sending side, so nothing can be enqueued afterwards,
/// and wakes the connection's reader so the session winds down.
pub struct Outbound {
    sender: Mutex<Option<mpsc::Sender<String>>>,
    closed: Notify,
}

impl Outbound {
    /// Creates an outbound path holding at most `capacity` undelivered frames.
    /// The receiver is drained by the connection's writer task.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        let outbound = Self {
            sender: Mutex::new(Some(tx)),
            closed: Notify::new(),
        };
        (outbound, rx)
    }

    /// Enqueues a payload without waiting. A full queue is an overflow, never a wait.
    pub fn deliver(&self, id: SessionId, payload: &str) -> Result<(), DeliveryError> {
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(tx) => tx.try_send(payload.to_string()).map_err(|e| match e {
                TrySendError::Full(_) => DeliveryError::Overflow(id),
                TrySendError::Closed(_) => DeliveryError::Closed(id),
            }),
            None => Err(DeliveryError::Closed(id)),
        }
    }

    /// Closes the path. Idempotent.
    pub fn close(&self) {
        let taken = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if taken.is_some() {
            self.closed.notify_one();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Resolves once `close` has been called.
    pub fn closed(&self) -> Notified<'_> {
        self.closed.notified()
    }
}

/// Represents one connected participant.
///
/// The display name is absent until the first join frame and can be set only once.
pub struct Client {
    id: SessionId,
    peer_addr: SocketAddr,
    display_name: OnceLock<String>,
    outbound: Outbound,
}

impl Client {
    pub fn new(id: SessionId, peer_addr: SocketAddr, outbound: Outbound) -> Self {
        Self {
            id,
            peer_addr,
            display_name: OnceLock::new(),
            outbound,
        }
    }

    // --------------------
    // Getter methods
    // --------------------

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Returns the display name if a join frame has been processed.
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.get().map(String::as_str)
    }

    pub fn outbound(&self) -> &Outbound {
        &self.outbound
    }

    // --------------------
    // Setter methods
    // --------------------

    /// Records the display name. Returns `false` if one was already set.
    pub fn set_display_name(&self, name: String) -> bool {
        self.display_name.set(name).is_ok()
    }
}
