//! `OutputBuffer`: Single-syscall output buffer for ANSI sequences.

use crate::style::Style;
use std::io::Write;

/// Pre-allocated buffer for building ANSI escape sequences.
///
/// A whole paint is accumulated here, then flushed in a single `write()`
/// syscall so the terminal never shows a half-drawn frame.
#[derive(Debug)]
pub struct OutputBuffer {
    data: Vec<u8>,
}

impl OutputBuffer {
    /// Create a buffer sized for a typical terminal (4KB).
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(4096),
        }
    }

    /// Clear the buffer for reuse.
    #[inline]
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Get the buffer contents.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Write a string verbatim.
    #[inline]
    pub fn write_str(&mut self, s: &str) {
        self.data.extend_from_slice(s.as_bytes());
    }

    /// Write text from the network on a single line.
    ///
    /// Tabs and line breaks become spaces; every other control character
    /// (ESC included) is dropped so the text cannot steer the terminal.
    pub fn write_label(&mut self, s: &str) {
        for c in s.chars() {
            self.push_visible(c);
        }
    }

    /// Write message text. Line breaks are emitted as CR LF, since raw mode
    /// does not translate LF; other control characters are handled as in
    /// [`Self::write_label`].
    pub fn write_text(&mut self, s: &str) {
        for c in s.chars() {
            if c == '\n' {
                self.data.extend_from_slice(b"\r\n");
            } else {
                self.push_visible(c);
            }
        }
    }

    fn push_visible(&mut self, c: char) {
        match c {
            '\t' | '\n' => self.data.push(b' '),
            c if c.is_control() => {}
            c => self
                .data
                .extend_from_slice(c.encode_utf8(&mut [0; 4]).as_bytes()),
        }
    }

    /// End the current line.
    #[inline]
    pub fn newline(&mut self) {
        self.data.extend_from_slice(b"\r\n");
    }

    /// Move cursor to (x, y) position (1-indexed for ANSI).
    #[inline]
    pub fn cursor_move(&mut self, x: u16, y: u16) {
        // CSI row ; col H
        let _ = write!(self.data, "\x1b[{};{}H", u32::from(y) + 1, u32::from(x) + 1);
    }

    /// Hide cursor.
    #[inline]
    pub fn cursor_hide(&mut self) {
        self.data.extend_from_slice(b"\x1b[?25l");
    }

    /// Show cursor.
    #[inline]
    pub fn cursor_show(&mut self) {
        self.data.extend_from_slice(b"\x1b[?25h");
    }

    /// Save cursor position and attributes (DECSC).
    #[inline]
    pub fn cursor_save(&mut self) {
        self.data.extend_from_slice(b"\x1b7");
    }

    /// Restore the position saved by [`Self::cursor_save`] (DECRC).
    #[inline]
    pub fn cursor_restore(&mut self) {
        self.data.extend_from_slice(b"\x1b8");
    }

    /// Confine scrolling to rows `top..=bottom` (0-indexed).
    #[inline]
    pub fn set_scroll_region(&mut self, top: u16, bottom: u16) {
        let _ = write!(self.data, "\x1b[{};{}r", u32::from(top) + 1, u32::from(bottom) + 1);
    }

    /// Apply a style: true-color foreground plus modifiers.
    pub fn set_style(&mut self, style: Style) {
        self.reset_attrs();
        let fg = style.fg;
        let _ = write!(self.data, "\x1b[38;2;{};{};{}m", fg.r, fg.g, fg.b);
        for code in style.modifiers.sgr_codes() {
            let _ = write!(self.data, "\x1b[{code}m");
        }
    }

    /// Reset all attributes.
    #[inline]
    pub fn reset_attrs(&mut self) {
        self.data.extend_from_slice(b"\x1b[0m");
    }

    /// Clear the entire screen.
    #[inline]
    pub fn clear_screen(&mut self) {
        self.data.extend_from_slice(b"\x1b[2J");
    }

    /// Clear the line the cursor is on.
    #[inline]
    pub fn clear_line(&mut self) {
        self.data.extend_from_slice(b"\x1b[2K");
    }

    /// Ring the terminal bell.
    #[inline]
    pub fn bell(&mut self) {
        self.data.push(0x07);
    }

    /// Flush to a writer in a single syscall.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying writer fails.
    pub fn flush_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&self.data)?;
        writer.flush()
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{Modifiers, Rgb};

    #[test]
    fn test_cursor_move_is_one_indexed() {
        let mut out = OutputBuffer::new();
        out.cursor_move(0, 0);
        out.set_scroll_region(0, 22);
        assert_eq!(out.as_bytes(), b"\x1b[1;1H\x1b[1;23r");
    }

    #[test]
    fn test_write_text_translates_newlines() {
        let mut out = OutputBuffer::new();
        out.write_text("a\nb\r\nc");
        assert_eq!(out.as_bytes(), b"a\r\nb\r\nc");
    }

    #[test]
    fn test_control_characters_cannot_escape() {
        let mut out = OutputBuffer::new();
        out.write_text("x\x1b[2J\ty\rz\u{9b}1;1H\n\x07w");
        assert_eq!(out.as_bytes(), b"x[2J yz1;1H\r\nw");

        out.clear();
        out.write_label("gen\x1b]0;pwn\x07\neral");
        assert_eq!(out.as_bytes(), b"gen]0;pwn eral");
    }

    #[test]
    fn test_set_style() {
        let mut out = OutputBuffer::new();
        out.set_style(Style::new(Rgb::new(1, 2, 3)).with_modifiers(Modifiers::BOLD | Modifiers::BLINK));
        assert_eq!(out.as_bytes(), b"\x1b[0m\x1b[38;2;1;2;3m\x1b[1m\x1b[5m");
    }

    #[test]
    fn test_flush_to() {
        let mut out = OutputBuffer::new();
        out.write_str("hi");
        out.bell();
        let mut sink = Vec::new();
        out.flush_to(&mut sink).unwrap();
        assert_eq!(sink, b"hi\x07");
        out.clear();
        assert!(out.as_bytes().is_empty());
    }
}
