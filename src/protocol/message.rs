//! Module `message`
//!
//! Classifies frames by the relay's textual conventions and renders the payload
//! that is broadcast to other participants.
//!
//! | Text pattern                    | Kind      |
//! |---------------------------------|-----------|
//! | `joined:<name>`                 | join      |
//! | `<name>: <text>`                | chat      |
//! | `<name> has left`               | leave     |
//! | `<name> is looking for a game!` | seek-game |
//! | anything else                   | chat      |
//!
//! Once a session has a name, `<name>` must be that name exactly: a line that
//! merely ends in one of the suffixes is chat.

use crate::client::SessionId;
use crate::error::FrameError;

pub const JOIN_PREFIX: &str = "joined:";
pub const LEAVE_SUFFIX: &str = " has left";
pub const SEEK_GAME_SUFFIX: &str = " is looking for a game!";
pub const CHAT_SEPARATOR: &str = ": ";

/// Kind of a message, inferred from its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Join { name: String },
    Chat { text: String },
    Leave,
    SeekGame,
}

impl MessageKind {
    /// Infers the kind from the raw text of a frame, given the sender's display
    /// name if it has joined. First matching rule wins.
    pub fn classify(text: &str, display_name: Option<&str>) -> Result<Self, FrameError> {
        match display_name {
            Some(name) => Ok(Self::classify_joined(text, name)),
            None => Self::classify_unjoined(text),
        }
    }

    fn classify_joined(text: &str, name: &str) -> Self {
        if let Some(body) = text
            .strip_prefix(name)
            .and_then(|rest| rest.strip_prefix(CHAT_SEPARATOR))
        {
            return MessageKind::Chat {
                text: body.to_string(),
            };
        }

        match text.strip_prefix(name) {
            Some(LEAVE_SUFFIX) => return MessageKind::Leave,
            Some(SEEK_GAME_SUFFIX) => return MessageKind::SeekGame,
            _ => {}
        }

        if let Some(claimed) = text.strip_prefix(JOIN_PREFIX) {
            return MessageKind::Join {
                name: claimed.trim().to_string(),
            };
        }

        MessageKind::Chat {
            text: text.to_string(),
        }
    }

    fn classify_unjoined(text: &str) -> Result<Self, FrameError> {
        if let Some(name) = text.strip_prefix(JOIN_PREFIX) {
            let name = name.trim();
            if name.is_empty() {
                return Err(FrameError::EmptyName);
            }
            return Ok(MessageKind::Join {
                name: name.to_string(),
            });
        }

        // Nothing is known about the sender yet, so the suffix alone decides.
        // A nameless legacy client quits with " has left".
        let is_chat_line = text.contains(CHAT_SEPARATOR);
        if !is_chat_line && text.ends_with(SEEK_GAME_SUFFIX) {
            return Ok(MessageKind::SeekGame);
        }
        if !is_chat_line && (text.ends_with(LEAVE_SUFFIX) || text == LEAVE_SUFFIX.trim_start()) {
            return Ok(MessageKind::Leave);
        }

        Ok(MessageKind::Chat {
            text: text.to_string(),
        })
    }
}

/// One inbound frame, attributed to the session that sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    sender: SessionId,
    raw: String,
    kind: MessageKind,
}

impl Message {
    pub fn parse(
        sender: SessionId,
        raw: String,
        display_name: Option<&str>,
    ) -> Result<Self, FrameError> {
        let kind = MessageKind::classify(&raw, display_name)?;
        Ok(Self { sender, raw, kind })
    }

    pub fn sender(&self) -> SessionId {
        self.sender
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> &MessageKind {
        &self.kind
    }

    /// Payload broadcast to other participants, attributed to `name`.
    ///
    /// The name always comes from the session, never from the text, so a
    /// client cannot speak or leave under someone else's name.
    pub fn render(&self, name: &str) -> String {
        match &self.kind {
            MessageKind::Join { .. } => format!("{JOIN_PREFIX}{name}"),
            MessageKind::Chat { text } => format!("{name}{CHAT_SEPARATOR}{text}"),
            MessageKind::Leave => leave_notice(name),
            MessageKind::SeekGame => format!("{name}{SEEK_GAME_SUFFIX}"),
        }
    }
}

/// The line other participants see when `name` leaves.
pub fn leave_notice(name: &str) -> String {
    format!("{name}{LEAVE_SUFFIX}")
}
