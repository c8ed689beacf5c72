//! Interface: Main coordinator that ties the actors together.
//!
//! The Interface is the entry point for hosts. It owns the shared session,
//! takes over the terminal, spawns the actors and shuts them down in order.

use super::intake::{Intake, IntakeActor, Outbound, Transport};
use super::keys::{CrosstermKeys, KeySource};
use super::messages::NetworkEvent;
use super::{InputActor, RenderActor};
use crate::error::{Error, Result};
use crate::markup::Directory;
use crate::session::{SessionState, StopReason, Viewport};
use crate::style::Palette;
use crate::terminal::TerminalGuard;
use crossbeam_channel::Receiver;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Configuration for the Interface.
#[derive(Debug, Clone)]
pub struct InterfaceConfig {
    /// How long the input actor waits for a key before checking for stop.
    pub input_poll_timeout: Duration,
    /// How long the intake waits for a network event before checking for stop.
    pub intake_poll_timeout: Duration,
    /// Channel typing targets before any message has been shown.
    pub default_channel: String,
    /// Colors for log text, headers and the input line.
    pub palette: Palette,
    /// Whether to use alternate screen buffer.
    pub alternate_screen: bool,
    /// The signed-in user's id, if known.
    pub self_id: Option<String>,
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self {
            input_poll_timeout: Duration::from_millis(200),
            intake_poll_timeout: Duration::from_millis(100),
            default_channel: "random".to_string(),
            palette: Palette::default(),
            alternate_screen: true,
            self_id: None,
        }
    }
}

impl InterfaceConfig {
    /// Set the input poll timeout.
    #[must_use]
    pub const fn with_input_poll_timeout(mut self, timeout: Duration) -> Self {
        self.input_poll_timeout = timeout;
        self
    }

    /// Set the intake poll timeout.
    #[must_use]
    pub const fn with_intake_poll_timeout(mut self, timeout: Duration) -> Self {
        self.intake_poll_timeout = timeout;
        self
    }

    /// Set the default channel.
    #[must_use]
    pub fn with_default_channel(mut self, channel: impl Into<String>) -> Self {
        self.default_channel = channel.into();
        self
    }

    /// Set the palette.
    #[must_use]
    pub const fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    /// Enable or disable the alternate screen.
    #[must_use]
    pub const fn with_alternate_screen(mut self, enabled: bool) -> Self {
        self.alternate_screen = enabled;
        self
    }

    /// Set the signed-in user's id.
    #[must_use]
    pub fn with_self_id(mut self, id: impl Into<String>) -> Self {
        self.self_id = Some(id.into());
        self
    }
}

/// The running chat interface.
///
/// Dropping it stops every actor and restores the terminal.
pub struct Interface {
    config: InterfaceConfig,
    session: Arc<SessionState>,
    intake: Arc<Intake>,
    /// Restores the terminal when dropped; `None` when headless.
    terminal: Option<TerminalGuard>,
    input_actor: Option<InputActor>,
    render_actor: Option<RenderActor>,
    intake_actor: Option<IntakeActor>,
}

impl std::fmt::Debug for Interface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interface")
            .field("config", &self.config)
            .field("running", &self.session.is_running())
            .finish_non_exhaustive()
    }
}

impl Interface {
    /// Create an interface. Nothing runs until [`start`](Self::start).
    pub fn new(
        config: InterfaceConfig,
        directory: Arc<dyn Directory>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let session = Arc::new(SessionState::new(
            config.default_channel.clone(),
            Viewport::default(),
        ));
        let intake = Arc::new(Intake::new(
            Arc::clone(&session),
            directory,
            transport,
            config.self_id.clone(),
        ));

        Self {
            config,
            session,
            intake,
            terminal: None,
            input_actor: None,
            render_actor: None,
            intake_actor: None,
        }
    }

    /// The shared session.
    pub const fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    /// The intake, for hosts that deliver events themselves.
    pub const fn intake(&self) -> &Arc<Intake> {
        &self.intake
    }

    /// The configuration.
    pub const fn config(&self) -> &InterfaceConfig {
        &self.config
    }

    /// Take over the terminal and start the input and render actors.
    ///
    /// # Errors
    ///
    /// Returns an error if terminal setup fails or an actor cannot be
    /// spawned. The terminal is restored before returning.
    pub fn start(&mut self) -> Result<()> {
        let guard = TerminalGuard::enter(self.config.alternate_screen)?;
        self.session.resize(TerminalGuard::viewport()?);
        self.terminal = Some(guard);

        let result = self.start_with(CrosstermKeys, io::stdout());
        if result.is_err() {
            self.terminal = None;
        }
        result
    }

    /// Start the actors on an arbitrary key source and output.
    ///
    /// The terminal is left alone; this is how the interface runs headless.
    ///
    /// # Errors
    ///
    /// Returns an error if already started or an actor cannot be spawned.
    pub fn start_with<K, W>(&mut self, keys: K, writer: W) -> Result<()>
    where
        K: KeySource + Send + 'static,
        W: Write + Send + 'static,
    {
        if self.render_actor.is_some() || self.input_actor.is_some() {
            return Err(Error::Failed("interface already started".to_string()));
        }

        info!(channel = %self.config.default_channel, "starting interface");
        self.render_actor = Some(RenderActor::spawn(
            Arc::clone(&self.session),
            writer,
            self.config.palette,
        )?);

        match InputActor::spawn(
            Arc::clone(&self.session),
            keys,
            Arc::clone(&self.intake) as Arc<dyn Outbound>,
            self.config.input_poll_timeout,
        ) {
            Ok(actor) => {
                self.input_actor = Some(actor);
                Ok(())
            }
            Err(e) => {
                self.session.stop_with(StopReason::Failed(e.to_string()));
                let _ = self.shutdown();
                Err(e)
            }
        }
    }

    /// Drain network events on the intake thread.
    ///
    /// # Errors
    ///
    /// Returns an error if a feed is already attached or the thread cannot
    /// be spawned.
    pub fn feed(&mut self, events: Receiver<NetworkEvent>) -> Result<()> {
        if self.intake_actor.is_some() {
            return Err(Error::Failed("network feed already attached".to_string()));
        }
        let actor = Arc::clone(&self.intake).spawn(events, self.config.intake_poll_timeout)?;
        self.intake_actor = Some(actor);
        Ok(())
    }

    /// Append a line to the log.
    pub fn push(&self, channel: impl Into<String>, text: impl Into<String>) {
        self.session.push(channel, text);
    }

    /// Clear the log and the input line.
    pub fn reset(&self) {
        self.session.reset();
    }

    /// Block until the session stops (or `timeout` elapses).
    ///
    /// Returns the stop reason, or `None` on timeout.
    pub fn wait(&self, timeout: Option<Duration>) -> Option<StopReason> {
        self.session.wait_stopped(timeout)
    }

    /// Stop every actor and restore the terminal.
    ///
    /// Idempotent, and safe before [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// Returns the first actor failure encountered while joining.
    pub fn stop(&mut self) -> Result<()> {
        self.session.stop();
        self.shutdown()
    }

    /// Join input, then render, then intake; then release the terminal.
    fn shutdown(&mut self) -> Result<()> {
        let mut first_error = None;

        if let Some(actor) = self.input_actor.take() {
            if let Err(e) = actor.join() {
                first_error.get_or_insert(e);
            }
        }
        if let Some(actor) = self.render_actor.take() {
            match actor.join() {
                Ok(stats) => info!(
                    frames = stats.frames,
                    bytes = stats.bytes_written,
                    "render stats"
                ),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(actor) = self.intake_actor.take() {
            if let Err(e) = actor.join() {
                first_error.get_or_insert(e);
            }
        }
        self.terminal = None;

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for Interface {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!(error = %e, "interface shutdown failed");
        }
    }
}
