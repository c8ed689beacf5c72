//! Error types for the interface.

use std::io;
use thiserror::Error;

/// Errors that terminate the interface.
///
/// Per-message problems (unresolvable ids, malformed markup) never surface
/// here; they are absorbed by the codec and the intake.
#[derive(Debug, Error)]
pub enum Error {
    /// Terminal I/O failed (raw mode, size query, write, event read).
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),

    /// The OS refused to spawn an actor thread.
    #[error("failed to spawn {actor} thread: {source}")]
    Spawn {
        /// Actor name.
        actor: &'static str,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// An actor thread panicked.
    #[error("{0} actor panicked")]
    ActorPanicked(&'static str),

    /// An actor stopped the interface because of a fatal error.
    #[error("interface failed: {0}")]
    Failed(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
