//! Message types for actor communication.
//!
//! [`Keystroke`] is what the input actor consumes; [`NetworkEvent`] is what
//! the network collaborator feeds to the intake.

/// A decoded keyboard (or terminal) event.
///
/// This is the small subset of terminal input the chat interface reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keystroke {
    /// A character the terminal library already decoded.
    Char(char),
    /// A raw byte; multi-byte characters are assembled by the input actor.
    Byte(u8),
    /// Bracketed paste.
    Paste(String),
    /// Enter/Return key.
    Enter,
    /// Backspace key.
    Backspace,
    /// Delete key.
    Delete,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
    /// Home key.
    Home,
    /// End key.
    End,
    /// Ctrl-L: clear log and input.
    Clear,
    /// Ctrl-C: stop the interface.
    Interrupt,
    /// Terminal was resized.
    Resize {
        /// New width in columns.
        width: u16,
        /// New height in rows.
        height: u16,
    },
}

/// A chat message as delivered by the network collaborator.
///
/// Events without a channel or without text are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundEvent {
    /// Channel id.
    pub channel_id: Option<String>,
    /// Raw wire text.
    pub text: Option<String>,
    /// Author's user id.
    pub author_id: Option<String>,
}

impl InboundEvent {
    /// A complete message event.
    pub fn message(
        channel_id: impl Into<String>,
        text: impl Into<String>,
        author_id: Option<&str>,
    ) -> Self {
        Self {
            channel_id: Some(channel_id.into()),
            text: Some(text.into()),
            author_id: author_id.map(str::to_owned),
        }
    }
}

/// Events from the network collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkEvent {
    /// A chat message arrived.
    Message(InboundEvent),
    /// The transport reported an error.
    Error(String),
    /// The connection is gone for good.
    Closed,
}
