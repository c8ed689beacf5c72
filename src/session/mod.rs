//! Shared Session State: the one structure every actor touches.
//!
//! The message log, the input line, the channel in view and the lifecycle
//! flag live behind a single [`Mutex`] paired with a single [`Condvar`].
//! Every mutation happens under the lock and ends with `notify_all`, and the
//! lock is never held across terminal I/O, directory lookups or sends.
//!
//! The render actor does not hold the lock while painting, so it waits on a
//! predicate instead of a bare notification: each visible mutation bumps a
//! `version`, and [`SessionState::wait_for_change`] sleeps only while the
//! version is the one it already painted. A notification that lands while
//! the renderer is busy is therefore never lost, and several mutations
//! between two paints collapse into one.
//!
//! ```text
//!  Intake ──push──┐
//!                 ▼
//!          ┌─────────────┐  wait_for_change   ┌──────────────┐
//!          │ SessionState│ ─────────────────▶ │ Render Actor │
//!          └─────────────┘                    └──────────────┘
//!                 ▲
//!  Input ─mutate_input─┘
//! ```

mod input_line;

pub use input_line::{InputLine, Submission};

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// One line of the message log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Channel the line belongs to.
    pub channel: String,
    /// Display text.
    pub text: String,
}

impl LogEntry {
    /// Create a log entry.
    pub fn new(channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            text: text.into(),
        }
    }
}

/// Terminal dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Width in columns.
    pub width: u16,
    /// Height in rows.
    pub height: u16,
}

impl Viewport {
    /// Create a viewport.
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

/// Why the interface stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The host called `stop`.
    Requested,
    /// The user pressed Ctrl-C.
    Interrupted,
    /// The network feed closed.
    Disconnected,
    /// An actor hit a fatal error.
    Failed(String),
}

/// Position in the log up to which a reader has consumed entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogMark {
    /// Reset generation the index belongs to.
    pub epoch: u64,
    /// Number of entries consumed.
    pub index: usize,
}

/// A consistent copy of the session, taken under the lock.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Mutation counter at the time of the snapshot.
    pub version: u64,
    /// Lifecycle flag.
    pub running: bool,
    /// The log was reset since the requested mark; `entries` start at 0.
    pub reset: bool,
    /// Log index of `entries[0]`.
    pub first_index: usize,
    /// Log entries from `first_index` to the end.
    pub entries: Vec<LogEntry>,
    /// Input line.
    pub input: InputLine,
    /// Channel of the most recently rendered entry.
    pub display_channel: String,
    /// Terminal size.
    pub viewport: Viewport,
    epoch: u64,
}

impl Snapshot {
    /// Total log length.
    pub fn log_len(&self) -> usize {
        self.first_index + self.entries.len()
    }

    /// Mark just past the last entry of this snapshot.
    pub fn mark(&self) -> LogMark {
        LogMark {
            epoch: self.epoch,
            index: self.log_len(),
        }
    }
}

#[derive(Debug)]
struct Inner {
    log: Vec<LogEntry>,
    input: InputLine,
    display_channel: String,
    running: bool,
    stop_reason: Option<StopReason>,
    version: u64,
    epoch: u64,
    viewport: Viewport,
}

impl Inner {
    fn snapshot_since(&self, mark: Option<LogMark>) -> Snapshot {
        let (reset, first_index) = match mark {
            Some(mark) if mark.epoch == self.epoch && mark.index <= self.log.len() => {
                (false, mark.index)
            }
            _ => (true, 0),
        };
        Snapshot {
            version: self.version,
            running: self.running,
            reset,
            first_index,
            entries: self.log[first_index..].to_vec(),
            input: self.input.clone(),
            display_channel: self.display_channel.clone(),
            viewport: self.viewport,
            epoch: self.epoch,
        }
    }
}

/// Log, input line and lifecycle shared by the interface actors.
#[derive(Debug)]
pub struct SessionState {
    inner: Mutex<Inner>,
    changed: Condvar,
}

impl SessionState {
    /// Create a running session with an empty log.
    ///
    /// `default_channel` is the channel typing targets before any message
    /// has been rendered.
    pub fn new(default_channel: impl Into<String>, viewport: Viewport) -> Self {
        Self {
            inner: Mutex::new(Inner {
                log: Vec::new(),
                input: InputLine::new(),
                display_channel: default_channel.into(),
                running: true,
                stop_reason: None,
                version: 0,
                epoch: 0,
                viewport,
            }),
            changed: Condvar::new(),
        }
    }

    /// Lock, recovering from poisoning so a panicking actor can still stop
    /// the others.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a visible mutation, bump the version and wake every waiter.
    fn update<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let result = {
            let mut inner = self.lock();
            let result = f(&mut inner);
            inner.version = inner.version.wrapping_add(1);
            result
        };
        self.changed.notify_all();
        result
    }

    /// Append a line to the log.
    pub fn push(&self, channel: impl Into<String>, text: impl Into<String>) {
        let entry = LogEntry::new(channel, text);
        self.update(|inner| inner.log.push(entry));
    }

    /// Edit the input line atomically.
    ///
    /// The closure also receives the channel currently in view. Its result is
    /// handed back after the lock is released, so callers can act on it
    /// (send a message, say) without holding the lock.
    pub fn mutate_input<R>(&self, f: impl FnOnce(&mut InputLine, &str) -> R) -> R {
        self.update(|inner| {
            let Inner {
                input,
                display_channel,
                ..
            } = inner;
            f(input, display_channel)
        })
    }

    /// Correct the input line without waking anyone.
    ///
    /// For the renderer, whose current frame already shows the result.
    pub fn adjust_input<R>(&self, f: impl FnOnce(&mut InputLine) -> R) -> R {
        f(&mut self.lock().input)
    }

    /// Clear the log and the input line.
    pub fn reset(&self) {
        self.update(|inner| {
            inner.log.clear();
            inner.input.clear();
            inner.epoch = inner.epoch.wrapping_add(1);
        });
    }

    /// Record a new terminal size.
    pub fn resize(&self, viewport: Viewport) {
        self.update(|inner| inner.viewport = viewport);
    }

    /// Record the channel of the most recently rendered entry.
    ///
    /// Nothing visible changes, so the version stays put.
    pub fn set_display_channel(&self, channel: &str) {
        {
            let mut inner = self.lock();
            if inner.display_channel != channel {
                channel.clone_into(&mut inner.display_channel);
            }
        }
        self.changed.notify_all();
    }

    /// Channel of the most recently rendered entry.
    pub fn display_channel(&self) -> String {
        self.lock().display_channel.clone()
    }

    /// Channel of the newest log entry, or the channel in view if the log
    /// is empty.
    pub fn last_channel(&self) -> String {
        let inner = self.lock();
        inner
            .log
            .last()
            .map_or_else(|| inner.display_channel.clone(), |entry| entry.channel.clone())
    }

    /// Number of log entries.
    pub fn log_len(&self) -> usize {
        self.lock().log.len()
    }

    /// A consistent copy of everything, including the whole log.
    pub fn snapshot(&self) -> Snapshot {
        self.lock().snapshot_since(None)
    }

    /// A consistent copy with only the log entries past `mark`.
    ///
    /// `None`, a mark from before a reset, or a mark beyond the end of the
    /// log yields the whole log with `reset` set.
    pub fn snapshot_since(&self, mark: Option<LogMark>) -> Snapshot {
        self.lock().snapshot_since(mark)
    }

    /// Block until the version differs from `seen` (or immediately if
    /// `seen` is `None`), then snapshot from `mark`.
    ///
    /// Returns `None` once the session has stopped.
    pub fn wait_for_change(&self, seen: Option<u64>, mark: Option<LogMark>) -> Option<Snapshot> {
        let inner = self
            .changed
            .wait_while(self.lock(), |inner| {
                inner.running && seen == Some(inner.version)
            })
            .unwrap_or_else(PoisonError::into_inner);
        inner.running.then(|| inner.snapshot_since(mark))
    }

    /// Whether the session is still running.
    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Mark the session running again, forgetting any previous stop.
    pub fn resume(&self) {
        {
            let mut inner = self.lock();
            inner.running = true;
            inner.stop_reason = None;
        }
        self.changed.notify_all();
    }

    /// Stop the session. Idempotent.
    pub fn stop(&self) {
        self.stop_with(StopReason::Requested);
    }

    /// Stop the session, recording why. The first reason wins.
    pub fn stop_with(&self, reason: StopReason) {
        {
            let mut inner = self.lock();
            inner.running = false;
            inner.stop_reason.get_or_insert(reason);
        }
        self.changed.notify_all();
    }

    /// Why the session stopped, if it has.
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.lock().stop_reason.clone()
    }

    /// Block until the session stops, or until `timeout` elapses.
    pub fn wait_stopped(&self, timeout: Option<Duration>) -> Option<StopReason> {
        let guard = self.lock();
        let inner = match timeout {
            Some(timeout) => {
                self.changed
                    .wait_timeout_while(guard, timeout, |inner| inner.running)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
            None => self
                .changed
                .wait_while(guard, |inner| inner.running)
                .unwrap_or_else(PoisonError::into_inner),
        };
        inner.stop_reason.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn session() -> SessionState {
        SessionState::new("random", Viewport::default())
    }

    #[test]
    fn test_push_preserves_order() {
        let session = session();
        for i in 0..5 {
            session.push("general", format!("line {i}"));
        }
        let snapshot = session.snapshot();
        assert_eq!(snapshot.log_len(), 5);
        let texts: Vec<_> = snapshot.entries.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, ["line 0", "line 1", "line 2", "line 3", "line 4"]);
    }

    #[test]
    fn test_concurrent_pushes_are_all_kept() {
        let session = Arc::new(session());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let session = Arc::clone(&session);
                thread::spawn(move || {
                    for i in 0..50 {
                        session.push(format!("c{t}"), format!("{i}"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = session.snapshot();
        assert_eq!(snapshot.log_len(), 200);
        for t in 0..4 {
            let channel = format!("c{t}");
            let ours: Vec<usize> = snapshot
                .entries
                .iter()
                .filter(|e| e.channel == channel)
                .map(|e| e.text.parse().unwrap())
                .collect();
            assert_eq!(ours, (0..50).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_snapshot_since_mark() {
        let session = session();
        session.push("a", "1");
        session.push("a", "2");
        let first = session.snapshot_since(None);
        assert!(first.reset);
        assert_eq!(first.entries.len(), 2);

        session.push("b", "3");
        let delta = session.snapshot_since(Some(first.mark()));
        assert!(!delta.reset);
        assert_eq!(delta.first_index, 2);
        assert_eq!(delta.entries, vec![LogEntry::new("b", "3")]);
    }

    #[test]
    fn test_reset_is_detected_after_regrowth() {
        let session = session();
        session.push("a", "1");
        let mark = session.snapshot().mark();

        session.reset();
        session.push("b", "2");
        session.push("b", "3");

        let snapshot = session.snapshot_since(Some(mark));
        assert!(snapshot.reset);
        assert_eq!(snapshot.first_index, 0);
        assert_eq!(snapshot.entries.len(), 2);
    }

    #[test]
    fn test_reset_clears_input() {
        let session = session();
        session.mutate_input(|input, channel| input.insert_str("draft", channel));
        session.push("a", "1");
        session.reset();

        let snapshot = session.snapshot();
        assert_eq!(snapshot.log_len(), 0);
        assert!(snapshot.input.is_empty());
        assert_eq!(snapshot.input.channel(), None);
    }

    #[test]
    fn test_mutate_input_uses_display_channel() {
        let session = session();
        session.set_display_channel("dev");
        let inserted = session.mutate_input(|input, channel| input.insert_str("hi", channel));
        assert_eq!(inserted, 2);
        assert_eq!(session.snapshot().input.channel(), Some("dev"));
    }

    #[test]
    fn test_adjust_input_keeps_version() {
        let session = session();
        session.mutate_input(|input, channel| input.insert_str("abcdef", channel));
        let before = session.snapshot().version;

        assert!(session.adjust_input(|input| input.truncate_to_width(3)));
        let snapshot = session.snapshot();
        assert_eq!(snapshot.version, before);
        assert_eq!(snapshot.input.text(), "abc");
    }

    #[test]
    fn test_last_channel() {
        let session = session();
        assert_eq!(session.last_channel(), "random");
        session.push("ops", "up");
        assert_eq!(session.last_channel(), "ops");
    }

    #[test]
    fn test_wait_for_change_wakes_on_push() {
        let session = Arc::new(session());
        let seen = session.snapshot().version;

        let waiter = {
            let session = Arc::clone(&session);
            thread::spawn(move || session.wait_for_change(Some(seen), None))
        };
        thread::sleep(Duration::from_millis(20));
        session.push("a", "1");

        let snapshot = waiter.join().unwrap().unwrap();
        assert_ne!(snapshot.version, seen);
        assert_eq!(snapshot.log_len(), 1);
    }

    #[test]
    fn test_wait_for_change_returns_none_after_stop() {
        let session = Arc::new(session());
        let seen = session.snapshot().version;

        let waiter = {
            let session = Arc::clone(&session);
            thread::spawn(move || session.wait_for_change(Some(seen), None))
        };
        thread::sleep(Duration::from_millis(20));
        session.stop();
        assert!(waiter.join().unwrap().is_none());
    }

    #[test]
    fn test_stop_is_idempotent_and_first_reason_wins() {
        let session = session();
        session.stop_with(StopReason::Interrupted);
        session.stop();
        session.stop();
        assert!(!session.is_running());
        assert_eq!(session.stop_reason(), Some(StopReason::Interrupted));
        assert_eq!(session.wait_stopped(None), Some(StopReason::Interrupted));
    }

    #[test]
    fn test_wait_stopped_times_out() {
        let session = session();
        assert_eq!(session.wait_stopped(Some(Duration::from_millis(10))), None);
    }

    #[test]
    fn test_resume_clears_stop() {
        let session = session();
        session.stop();
        session.resume();
        assert!(session.is_running());
        assert_eq!(session.stop_reason(), None);
    }

    #[test]
    fn test_poisoned_lock_still_stops() {
        let session = Arc::new(session());
        let poisoner = Arc::clone(&session);
        let _ = thread::spawn(move || {
            poisoner.mutate_input(|_, _| panic!("boom"));
        })
        .join();

        session.stop_with(StopReason::Failed("input".into()));
        assert_eq!(session.stop_reason(), Some(StopReason::Failed("input".into())));
    }
}
