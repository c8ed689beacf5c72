//! Key sources and multi-byte character assembly.

use super::messages::Keystroke;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::io;
use std::str;
use std::time::Duration;

/// Something the input actor can read keystrokes from.
pub trait KeySource {
    /// Wait up to `timeout` for the next keystroke.
    ///
    /// `Ok(None)` means nothing relevant arrived in time.
    ///
    /// # Errors
    ///
    /// Any error is fatal to the input actor.
    fn poll(&mut self, timeout: Duration) -> io::Result<Option<Keystroke>>;
}

/// Reads keystrokes from the real terminal through crossterm.
#[derive(Debug, Default)]
pub struct CrosstermKeys;

impl CrosstermKeys {
    /// Convert a crossterm event to a keystroke.
    fn convert_event(event: Event) -> Option<Keystroke> {
        match event {
            Event::Key(key) => Self::convert_key(key),
            Event::Paste(text) => Some(Keystroke::Paste(text)),
            Event::Resize(width, height) => Some(Keystroke::Resize { width, height }),
            _ => None,
        }
    }

    /// Convert a key event; releases and repeats are ignored.
    fn convert_key(key: KeyEvent) -> Option<Keystroke> {
        if key.kind != KeyEventKind::Press {
            return None;
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') => Some(Keystroke::Interrupt),
                KeyCode::Char('l') => Some(Keystroke::Clear),
                _ => None,
            };
        }

        Some(match key.code {
            KeyCode::Char(c) => Keystroke::Char(c),
            KeyCode::Enter => Keystroke::Enter,
            KeyCode::Backspace => Keystroke::Backspace,
            KeyCode::Delete => Keystroke::Delete,
            KeyCode::Left => Keystroke::Left,
            KeyCode::Right => Keystroke::Right,
            KeyCode::Home => Keystroke::Home,
            KeyCode::End => Keystroke::End,
            _ => return None,
        })
    }
}

impl KeySource for CrosstermKeys {
    fn poll(&mut self, timeout: Duration) -> io::Result<Option<Keystroke>> {
        if event::poll(timeout)? {
            Ok(Self::convert_event(event::read()?))
        } else {
            Ok(None)
        }
    }
}

/// Keystrokes fed from another thread (scripted input, remote terminals).
///
/// A disconnected feed is an error: nothing can ever be typed again.
impl KeySource for Receiver<Keystroke> {
    fn poll(&mut self, timeout: Duration) -> io::Result<Option<Keystroke>> {
        match self.recv_timeout(timeout) {
            Ok(key) => Ok(Some(key)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "key feed closed",
            )),
        }
    }
}

/// Assembles raw bytes into characters.
///
/// Bytes that can never start or continue a UTF-8 sequence are dropped. An
/// incomplete sequence stays pending until its continuation bytes arrive.
#[derive(Debug, Default)]
pub struct Utf8Assembler {
    pending: Vec<u8>,
}

impl Utf8Assembler {
    /// Create an empty assembler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes waiting for continuation.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }

    /// Feed one byte; returns whatever text is now complete.
    pub fn push(&mut self, byte: u8) -> Option<String> {
        self.pending.push(byte);

        let mut decoded = String::new();
        let mut rest = self.pending.as_slice();
        loop {
            match str::from_utf8(rest) {
                Ok(valid) => {
                    decoded.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    decoded.push_str(str::from_utf8(valid).unwrap_or_default());
                    match e.error_len() {
                        // Invalid sequence: drop it and keep scanning.
                        Some(len) => rest = &after[len..],
                        // Truncated sequence: wait for more bytes.
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        self.pending = rest.to_vec();
        (!decoded.is_empty()).then_some(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    #[test]
    fn test_ascii_passes_straight_through() {
        let mut utf8 = Utf8Assembler::new();
        assert_eq!(utf8.push(b'a').as_deref(), Some("a"));
        assert!(utf8.pending().is_empty());
    }

    #[test]
    fn test_multibyte_assembly() {
        let mut utf8 = Utf8Assembler::new();
        let bytes = "é".as_bytes();
        assert_eq!(utf8.push(bytes[0]), None);
        assert_eq!(utf8.pending(), &bytes[..1]);
        assert_eq!(utf8.push(bytes[1]).as_deref(), Some("é"));
        assert!(utf8.pending().is_empty());

        let bytes = "日".as_bytes();
        assert_eq!(utf8.push(bytes[0]), None);
        assert_eq!(utf8.push(bytes[1]), None);
        assert_eq!(utf8.push(bytes[2]).as_deref(), Some("日"));
    }

    #[test]
    fn test_invalid_bytes_are_dropped() {
        let mut utf8 = Utf8Assembler::new();
        assert_eq!(utf8.push(0xff), None);
        assert!(utf8.pending().is_empty());

        // A stray continuation byte followed by a real character.
        assert_eq!(utf8.push(0x80), None);
        assert_eq!(utf8.push(b'x').as_deref(), Some("x"));
    }

    #[test]
    fn test_broken_sequence_keeps_following_char() {
        let mut utf8 = Utf8Assembler::new();
        assert_eq!(utf8.push(0xc3), None);
        assert_eq!(utf8.push(b'a').as_deref(), Some("a"));
        assert!(utf8.pending().is_empty());
    }

    #[test]
    fn test_convert_keys() {
        assert_eq!(
            CrosstermKeys::convert_event(key(KeyCode::Char('x'), KeyModifiers::NONE)),
            Some(Keystroke::Char('x'))
        );
        assert_eq!(
            CrosstermKeys::convert_event(key(KeyCode::Char('X'), KeyModifiers::SHIFT)),
            Some(Keystroke::Char('X'))
        );
        assert_eq!(
            CrosstermKeys::convert_event(key(KeyCode::Enter, KeyModifiers::NONE)),
            Some(Keystroke::Enter)
        );
        assert_eq!(
            CrosstermKeys::convert_event(key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Keystroke::Interrupt)
        );
        assert_eq!(
            CrosstermKeys::convert_event(key(KeyCode::Char('l'), KeyModifiers::CONTROL)),
            Some(Keystroke::Clear)
        );
        assert_eq!(
            CrosstermKeys::convert_event(key(KeyCode::Char('z'), KeyModifiers::CONTROL)),
            None
        );
        assert_eq!(
            CrosstermKeys::convert_event(key(KeyCode::Tab, KeyModifiers::NONE)),
            None
        );
        assert_eq!(
            CrosstermKeys::convert_event(Event::Resize(100, 40)),
            Some(Keystroke::Resize {
                width: 100,
                height: 40
            })
        );
    }

    #[test]
    fn test_channel_source() {
        let (tx, mut rx) = crossbeam_channel::unbounded();
        tx.send(Keystroke::Enter).unwrap();
        assert_eq!(rx.poll(Duration::from_millis(10)).unwrap(), Some(Keystroke::Enter));
        assert_eq!(rx.poll(Duration::from_millis(10)).unwrap(), None);
        drop(tx);
        assert!(rx.poll(Duration::from_millis(10)).is_err());
    }

    #[test]
    fn test_key_release_ignored() {
        let release = Event::Key(KeyEvent {
            code: KeyCode::Char('a'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        });
        assert_eq!(CrosstermKeys::convert_event(release), None);
    }
}
