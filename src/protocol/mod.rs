//! Relay wire protocol
//!
//! Newline-delimited framing over the TCP byte stream, and classification of
//! the textual message conventions carried inside each frame.

pub mod frame;
pub mod message;

pub use frame::{FrameEvent, FrameReader, write_frame};
pub use message::{Message, MessageKind};
