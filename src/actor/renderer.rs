//! Render Actor: Dedicated thread that owns the screen.
//!
//! The actor sleeps on the session's condition variable and wakes only when
//! something visible changed. Each wake produces one frame: the log entries
//! added since the previous frame, then the input line. The log is painted
//! incrementally into a terminal scroll region; only a reset or a resize
//! clears the pane and starts over from the first entry.
//!
//! # Screen layout
//!
//! ```text
//! ┌────────────────────────────────────────┐ ─┐
//! │general> alice: morning                 │  │
//! │> bob: hi !me                           │  │ scroll region (DECSTBM)
//! │dev> ci: build green                    │  │
//! │                                        │  │
//! ├────────────────────────────────────────┤ ─┘
//! │dev> deploying n█                       │    input line
//! └────────────────────────────────────────┘
//! ```

use super::PanicGuard;
use crate::error::{Error, Result};
use crate::markup;
use crate::session::{LogEntry, LogMark, SessionState, Snapshot, StopReason, Viewport};
use crate::style::{Modifiers, Palette};
use crate::terminal::OutputBuffer;
use std::io::{self, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Render statistics for debugging/profiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Total frames painted.
    pub frames: u64,
    /// Total bytes written to the terminal.
    pub bytes_written: u64,
}

/// Longest prefix of `s` that fits in `max_cols` columns.
fn clip(s: &str, max_cols: usize) -> &str {
    let mut cols = 0;
    for (i, c) in s.char_indices() {
        cols += c.width().unwrap_or(0);
        if cols > max_cols {
            return &s[..i];
        }
    }
    s
}

/// Turns snapshots into frames. Pure with respect to I/O.
#[derive(Debug)]
pub struct Painter {
    palette: Palette,
    /// Layout the screen was last set up for.
    viewport: Option<Viewport>,
    /// How much of the log is on screen.
    mark: Option<LogMark>,
    /// Channel of the last painted entry.
    last_channel: Option<String>,
    output: OutputBuffer,
}

impl Painter {
    /// Create a painter that has not drawn anything yet.
    pub fn new(palette: Palette) -> Self {
        Self {
            palette,
            viewport: None,
            mark: None,
            last_channel: None,
            output: OutputBuffer::new(),
        }
    }

    /// How much of the log has been painted.
    pub const fn mark(&self) -> Option<LogMark> {
        self.mark
    }

    /// Channel of the most recently painted entry.
    pub fn last_channel(&self) -> Option<&str> {
        self.last_channel.as_deref()
    }

    /// Whether `viewport` differs from the layout on screen, which calls for
    /// a snapshot of the whole log.
    pub fn needs_layout(&self, viewport: Viewport) -> bool {
        self.viewport != Some(viewport)
    }

    /// Widest input text that still fits on the input line.
    pub fn input_limit(snapshot: &Snapshot) -> usize {
        Self::line_limit(snapshot.viewport.width, snapshot.input.channel())
    }

    /// Widest input text for a `width`-column line prefixed by `channel> `,
    /// leaving one column for the cursor.
    pub fn line_limit(width: u16, channel: Option<&str>) -> usize {
        let prefix = channel.map_or(0, |c| c.width() + 2);
        usize::from(width).saturating_sub(prefix + 1).max(1)
    }

    /// The frame built by the last [`Self::paint`].
    pub const fn frame(&self) -> &OutputBuffer {
        &self.output
    }

    /// Build the bytes for one frame.
    ///
    /// The snapshot must start at [`Self::mark`], or be a full snapshot
    /// (`reset`) when the layout changed.
    pub fn paint(&mut self, snapshot: &Snapshot, bell: bool) -> &OutputBuffer {
        self.output.clear();
        self.output.cursor_hide();
        let viewport = snapshot.viewport;
        let rows = viewport.height.max(2);

        if snapshot.reset || self.needs_layout(viewport) {
            self.output.reset_attrs();
            self.output.clear_screen();
            self.output.set_scroll_region(0, rows - 2);
            self.output.cursor_move(0, 0);
            self.output.cursor_save();
            self.viewport = Some(viewport);
            self.last_channel = None;
        }

        if !snapshot.entries.is_empty() {
            self.output.cursor_restore();
            for entry in &snapshot.entries {
                self.paint_entry(entry);
            }
            self.output.reset_attrs();
            self.output.cursor_save();
        }
        self.mark = Some(snapshot.mark());

        self.paint_input(snapshot, rows - 1);
        if bell {
            self.output.bell();
        }
        &self.output
    }

    fn paint_entry(&mut self, entry: &LogEntry) {
        self.output.set_style(self.palette.highlight);
        if self.last_channel.as_deref() == Some(entry.channel.as_str()) {
            self.output.write_str("> ");
        } else {
            self.output.write_label(&entry.channel);
            self.output.write_str("> ");
            self.last_channel = Some(entry.channel.clone());
        }

        let mut style = self.palette.normal;
        if markup::is_attention(&entry.text) {
            style = style.with_modifiers(Modifiers::BLINK);
        }
        self.output.set_style(style);
        self.output.write_text(&entry.text);
        self.output.reset_attrs();
        self.output.newline();
    }

    fn paint_input(&mut self, snapshot: &Snapshot, row: u16) {
        let max_cols = usize::from(snapshot.viewport.width.saturating_sub(1));

        self.output.cursor_move(0, row);
        self.output.set_style(self.palette.input);
        self.output.clear_line();

        let mut cursor_col = 0;
        if let Some(channel) = snapshot.input.channel() {
            let prefix = format!("{channel}> ");
            let line = format!("{prefix}{}", snapshot.input.text());
            self.output.write_label(clip(&line, max_cols));
            cursor_col = (prefix.width() + snapshot.input.head().width()).min(max_cols);
        }

        self.output.reset_attrs();
        self.output
            .cursor_move(u16::try_from(cursor_col).unwrap_or(u16::MAX), row);
        self.output.cursor_show();
    }
}

/// Renderer actor that handles terminal output.
#[derive(Debug)]
pub struct RenderActor {
    /// Handle to the render thread.
    handle: Option<JoinHandle<RenderStats>>,
}

impl RenderActor {
    /// Spawn the render actor thread.
    ///
    /// # Arguments
    ///
    /// * `session` - State to paint; the actor exits when it stops.
    /// * `writer` - Where frames go (the terminal, or a buffer in tests).
    /// * `palette` - Colors for the three semantic classes.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn<W>(session: Arc<SessionState>, writer: W, palette: Palette) -> Result<Self>
    where
        W: Write + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name("backchannel-render".to_string())
            .spawn(move || {
                let _guard = PanicGuard::new(&session, "render");
                let mut writer = writer;
                let mut stats = RenderStats::default();
                info!("render actor started");
                if let Err(e) = Self::run_loop(&session, &mut writer, palette, &mut stats) {
                    error!(error = %e, "render actor failed");
                    session.stop_with(StopReason::Failed(format!("render: {e}")));
                }
                info!(frames = stats.frames, "render actor stopped");
                stats
            })
            .map_err(|source| Error::Spawn {
                actor: "render",
                source,
            })?;

        Ok(Self {
            handle: Some(handle),
        })
    }

    /// Wait for the render thread to finish.
    ///
    /// The session must already be stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread panicked.
    pub fn join(mut self) -> Result<RenderStats> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| Error::ActorPanicked("render")),
            None => Ok(RenderStats::default()),
        }
    }

    /// Main render loop: wait, paint, repeat.
    fn run_loop<W: Write>(
        session: &SessionState,
        writer: &mut W,
        palette: Palette,
        stats: &mut RenderStats,
    ) -> io::Result<()> {
        let mut painter = Painter::new(palette);
        let mut seen = None;
        let mut published: Option<String> = None;

        while let Some(mut snapshot) = session.wait_for_change(seen, painter.mark()) {
            if painter.needs_layout(snapshot.viewport) && !snapshot.reset {
                snapshot = session.snapshot_since(None);
            }
            seen = Some(snapshot.version);

            let width = snapshot.viewport.width;
            let overflow = snapshot.input.truncate_to_width(Painter::input_limit(&snapshot));
            if overflow {
                // Painted below; must not wake this loop again.
                session.adjust_input(|input| {
                    input.truncate_to_width(Painter::line_limit(width, input.channel()))
                });
            }

            painter.paint(&snapshot, overflow);
            if let Some(channel) = painter.last_channel() {
                if published.as_deref() != Some(channel) {
                    session.set_display_channel(channel);
                    published = Some(channel.to_owned());
                }
            }

            let frame = painter.frame();
            frame.flush_to(writer)?;
            let bytes = frame.as_bytes().len();
            stats.frames += 1;
            stats.bytes_written += bytes as u64;
            debug!(entries = snapshot.entries.len(), bytes, "frame painted");
        }

        Ok(())
    }
}
