//! # Backchannel
//!
//! A concurrent terminal interface for real-time chat clients.
//!
//! Backchannel is the client-side core of a chat program: it shows incoming
//! messages as a scrolling log, edits an input line, and sends what the user
//! types, while the network keeps delivering messages from its own thread.
//!
//! ## Core Concepts
//!
//! - **Markup codec**: Wire tags (`<@U1>`, `<#C2|dev>`) to readable text and back
//! - **Shared session**: One mutex and one condvar guard the log and input line
//! - **Actor threads**: Input, render and intake run independently
//! - **Incremental paint**: Only log entries added since the last frame are drawn
//!
//! ## Example
//!
//! ```rust,ignore
//! use backchannel::{Interface, InterfaceConfig, MemoryDirectory};
//! use std::sync::Arc;
//!
//! let directory = Arc::new(MemoryDirectory::new().with_user("U1", "alice"));
//! let mut interface = Interface::new(InterfaceConfig::default(), directory, transport);
//! interface.start()?;
//! interface.feed(network_events)?;
//! let reason = interface.wait(None);
//! interface.stop()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod actor;
pub mod error;
pub mod markup;
pub mod session;
pub mod style;
pub mod terminal;

// Re-exports for convenience
pub use actor::{
    InboundEvent, Interface, InterfaceConfig, Keystroke, NetworkEvent, Outbound, Transport,
};
pub use error::{Error, Result};
pub use markup::{Directory, MemoryDirectory};
pub use session::{LogEntry, SessionState, Snapshot, StopReason, Viewport};
pub use style::{Modifiers, Palette, Rgb, Style};
