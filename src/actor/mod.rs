//! Actor Model: OS threads around one shared session.
//!
//! Three actors cooperate through [`SessionState`] (a mutex and a condvar)
//! rather than through message queues:
//! - **Input Actor**: Polls keystrokes, edits the input line, submits
//! - **Render Actor**: Waits for any change, paints the unrendered suffix
//! - **Intake**: Drains the network feed into the log
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   mutate_input     ┌──────────────┐   wait_for_change  ┌──────────────┐
//! │ Input Thread │ ─────────────────▶ │              │ ─────────────────▶ │Render Thread │
//! └──────────────┘                    │ SessionState │                    └──────────────┘
//!        │ Outbound::send             │ Mutex+Condvar│
//!        ▼                            │              │
//! ┌──────────────┐        push        │              │
//! │    Intake    │ ─────────────────▶ │              │
//! └──────────────┘                    └──────────────┘
//!        ▲ NetworkEvent
//!        │
//! ┌──────────────┐
//! │   Network    │
//! └──────────────┘
//! ```

mod messages;
mod keys;
mod input;
mod renderer;
mod intake;
mod interface;

pub use messages::{InboundEvent, Keystroke, NetworkEvent};
pub use keys::{CrosstermKeys, KeySource, Utf8Assembler};
pub use input::InputActor;
pub use renderer::{Painter, RenderActor, RenderStats};
pub use intake::{Intake, IntakeActor, Outbound, Transport, ERROR_MARKER};
pub use interface::{Interface, InterfaceConfig};

use crate::session::{SessionState, StopReason};
use std::sync::Arc;
use std::thread;

/// Stops the session if the owning actor thread unwinds.
///
/// Without it a panicking actor would leave the others waiting forever.
pub(crate) struct PanicGuard {
    session: Arc<SessionState>,
    actor: &'static str,
}

impl PanicGuard {
    pub(crate) fn new(session: &Arc<SessionState>, actor: &'static str) -> Self {
        Self {
            session: Arc::clone(session),
            actor,
        }
    }
}

impl Drop for PanicGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            tracing::error!(actor = self.actor, "actor panicked");
            self.session
                .stop_with(StopReason::Failed(format!("{} actor panicked", self.actor)));
        }
    }
}
