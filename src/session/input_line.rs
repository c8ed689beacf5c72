//! Input line: the in-progress outgoing message.
//!
//! The cursor is a character offset, never a byte offset. The target
//! channel exists exactly while there is text: typing the first character
//! picks up the channel currently in view, and emptying the line (by
//! backspace, submit or truncation) drops it.

use std::mem;
use unicode_width::UnicodeWidthChar;

/// A message ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Target channel.
    pub channel: String,
    /// Trimmed display text (not yet escaped for the wire).
    pub text: String,
}

/// Text, cursor and target channel of the message being composed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputLine {
    text: String,
    /// Cursor position in characters.
    cursor: usize,
    channel: Option<String>,
}

impl InputLine {
    /// Create an empty input line.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Cursor position in characters.
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Target channel, `None` when nothing is being composed.
    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    /// Check if the line is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// The text left of the cursor.
    pub fn head(&self) -> &str {
        &self.text[..self.byte_offset(self.cursor)]
    }

    /// Byte offset of the given character index (clamped to the end).
    fn byte_offset(&self, chars: usize) -> usize {
        self.text
            .char_indices()
            .nth(chars)
            .map_or(self.text.len(), |(i, _)| i)
    }

    /// Insert text at the cursor.
    ///
    /// Line breaks and tabs become spaces, other control characters are
    /// dropped. If nothing was being composed, the line now targets
    /// `display_channel`. Returns the number of characters inserted.
    pub fn insert_str(&mut self, s: &str, display_channel: &str) -> usize {
        let cleaned: String = s
            .chars()
            .filter_map(|c| match c {
                '\n' | '\r' | '\t' => Some(' '),
                c if c.is_control() => None,
                c => Some(c),
            })
            .collect();
        if cleaned.is_empty() {
            return 0;
        }

        let at = self.byte_offset(self.cursor);
        self.text.insert_str(at, &cleaned);
        let inserted = cleaned.chars().count();
        self.cursor += inserted;
        if self.channel.is_none() {
            self.channel = Some(display_channel.to_owned());
        }
        inserted
    }

    /// Delete the character before the cursor.
    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let at = self.byte_offset(self.cursor - 1);
        self.text.remove(at);
        self.cursor -= 1;
        if self.text.is_empty() {
            self.channel = None;
        }
        true
    }

    /// Move cursor left.
    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Move cursor right.
    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.char_len());
    }

    /// Move cursor to start.
    pub const fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    /// Move cursor to end.
    pub fn cursor_end(&mut self) {
        self.cursor = self.char_len();
    }

    /// Clear text, cursor and channel.
    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
        self.channel = None;
    }

    /// Take the line for sending and clear it.
    ///
    /// A leading `!name ` redirects the message to channel `name`. Returns
    /// `None` (still clearing the line) when nothing is left to send after
    /// trimming.
    pub fn submit(&mut self) -> Option<Submission> {
        if self.text.is_empty() {
            return None;
        }
        let mut channel = self.channel.take()?;
        let text = mem::take(&mut self.text);
        self.cursor = 0;

        let body = match text.strip_prefix('!') {
            Some(directive) => {
                let (target, rest) = directive.split_once(' ').unwrap_or((directive, ""));
                let target = target.trim();
                if !target.is_empty() {
                    channel = target.to_owned();
                }
                rest.trim()
            }
            None => text.trim(),
        };

        if body.is_empty() {
            None
        } else {
            Some(Submission {
                channel,
                text: body.to_owned(),
            })
        }
    }

    /// Cut the text so it fits in `max_cols` terminal columns.
    ///
    /// Returns `true` if anything was removed.
    pub fn truncate_to_width(&mut self, max_cols: usize) -> bool {
        let mut cols = 0;
        let mut keep = self.text.len();
        for (i, c) in self.text.char_indices() {
            cols += c.width().unwrap_or(0);
            if cols > max_cols {
                keep = i;
                break;
            }
        }
        if keep == self.text.len() {
            return false;
        }

        self.text.truncate(keep);
        self.cursor = self.cursor.min(self.char_len());
        if self.text.is_empty() {
            self.channel = None;
        }
        true
    }
}
