//! Input Actor: Dedicated thread for reading keystrokes.
//!
//! The actor polls its [`KeySource`] with a bounded timeout so a stop is
//! noticed within one interval even when nobody is typing. Every edit goes
//! through [`SessionState::mutate_input`], which wakes the renderer. A
//! submitted message is sent after the lock has been released.

use super::keys::{KeySource, Utf8Assembler};
use super::messages::Keystroke;
use super::{Outbound, PanicGuard};
use crate::error::{Error, Result};
use crate::session::{SessionState, StopReason, Viewport};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, trace};

/// Input actor that turns keystrokes into edits and sends.
#[derive(Debug)]
pub struct InputActor {
    /// Handle to the input thread.
    handle: Option<JoinHandle<()>>,
}

/// Per-thread state of the input actor.
struct KeyHandler<'a> {
    session: &'a SessionState,
    outbound: &'a dyn Outbound,
    utf8: Utf8Assembler,
}

impl KeyHandler<'_> {
    /// Control bytes a raw byte source delivers for special keys.
    const fn control_byte(byte: u8) -> Option<Keystroke> {
        match byte {
            b'\r' | b'\n' => Some(Keystroke::Enter),
            0x08 | 0x7f => Some(Keystroke::Backspace),
            0x03 => Some(Keystroke::Interrupt),
            0x0c => Some(Keystroke::Clear),
            _ => None,
        }
    }

    fn insert(&self, text: &str) {
        self.session
            .mutate_input(|input, display_channel| input.insert_str(text, display_channel));
    }

    fn process(&mut self, key: Keystroke) {
        match key {
            Keystroke::Enter => {
                if let Some(submission) = self.session.mutate_input(|input, _| input.submit()) {
                    debug!(channel = %submission.channel, "submitting message");
                    self.outbound.send(&submission.channel, &submission.text);
                }
            }
            Keystroke::Backspace | Keystroke::Delete => {
                self.session.mutate_input(|input, _| input.backspace());
            }
            Keystroke::Left => self.session.mutate_input(|input, _| input.cursor_left()),
            Keystroke::Right => self.session.mutate_input(|input, _| input.cursor_right()),
            Keystroke::Home => self.session.mutate_input(|input, _| input.cursor_home()),
            Keystroke::End => self.session.mutate_input(|input, _| input.cursor_end()),
            Keystroke::Char(c) => self.insert(c.encode_utf8(&mut [0; 4])),
            Keystroke::Paste(text) => self.insert(&text),
            Keystroke::Byte(byte) => match Self::control_byte(byte) {
                Some(key) => self.process(key),
                None => match self.utf8.push(byte) {
                    Some(text) => self.insert(&text),
                    None => trace!(pending = self.utf8.pending().len(), "partial character"),
                },
            },
            Keystroke::Clear => self.session.reset(),
            Keystroke::Resize { width, height } => {
                self.session.resize(Viewport::new(width, height));
            }
            Keystroke::Interrupt => {
                info!("interrupted from keyboard");
                self.session.stop_with(StopReason::Interrupted);
            }
        }
    }
}

impl InputActor {
    /// Spawn the input actor thread.
    ///
    /// # Arguments
    ///
    /// * `session` - State to edit; the actor exits when it stops.
    /// * `keys` - Where keystrokes come from.
    /// * `outbound` - Receives submitted messages.
    /// * `poll_timeout` - How long to wait for a key before checking for stop.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn<K>(
        session: Arc<SessionState>,
        keys: K,
        outbound: Arc<dyn Outbound>,
        poll_timeout: Duration,
    ) -> Result<Self>
    where
        K: KeySource + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name("backchannel-input".to_string())
            .spawn(move || {
                let _guard = PanicGuard::new(&session, "input");
                info!("input actor started");
                if let Err(e) = Self::run_loop(&session, keys, outbound.as_ref(), poll_timeout) {
                    error!(error = %e, "input actor failed");
                    session.stop_with(StopReason::Failed(format!("input: {e}")));
                }
                info!("input actor stopped");
            })
            .map_err(|source| Error::Spawn {
                actor: "input",
                source,
            })?;

        Ok(Self {
            handle: Some(handle),
        })
    }

    /// Wait for the input thread to finish.
    ///
    /// The session must already be stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread panicked.
    pub fn join(mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| Error::ActorPanicked("input")),
            None => Ok(()),
        }
    }

    /// Main input polling loop.
    fn run_loop<K: KeySource>(
        session: &SessionState,
        mut keys: K,
        outbound: &dyn Outbound,
        poll_timeout: Duration,
    ) -> io::Result<()> {
        let mut handler = KeyHandler {
            session,
            outbound,
            utf8: Utf8Assembler::new(),
        };

        loop {
            if !session.is_running() {
                break;
            }
            let key = keys.poll(poll_timeout)?;
            // A key read after stop is discarded.
            if !session.is_running() {
                break;
            }
            if let Some(key) = key {
                handler.process(key);
            }
        }
        Ok(())
    }
}
