//! Event Intake: the bridge between the network collaborator and the log.
//!
//! Inbound messages are resolved against the directory, decoded by the
//! markup codec and pushed into the session. Outgoing messages take the
//! reverse route: encoded, handed to the [`Transport`], and echoed locally.
//! Directory lookups and sends run on the caller's thread, never under the
//! session lock.

use super::messages::{InboundEvent, NetworkEvent};
use super::PanicGuard;
use crate::error::{Error, Result};
use crate::markup::{self, Directory};
use crate::session::{SessionState, StopReason};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Marker that prefixes transport errors in the log.
pub const ERROR_MARKER: &str = "!error";

/// The wire side of sending: delivers already-escaped text.
///
/// Fire-and-forget; failures come back as [`NetworkEvent::Error`].
pub trait Transport: Send + Sync {
    /// Send `raw_text` to `channel`.
    fn send(&self, channel: &str, raw_text: &str);
}

/// The interface side of sending: takes display text.
pub trait Outbound: Send + Sync {
    /// Send display text to `channel`.
    fn send(&self, channel: &str, text: &str);
}

/// Adapter from collaborator events to the session log.
pub struct Intake {
    session: Arc<SessionState>,
    directory: Arc<dyn Directory>,
    transport: Arc<dyn Transport>,
    self_id: Option<String>,
}

impl std::fmt::Debug for Intake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Intake")
            .field("self_id", &self.self_id)
            .finish_non_exhaustive()
    }
}

impl Intake {
    /// Create an intake.
    ///
    /// `self_id` is the signed-in user's id: mentions of it decode to
    /// `!name`, and local echoes are prefixed with its name.
    pub fn new(
        session: Arc<SessionState>,
        directory: Arc<dyn Directory>,
        transport: Arc<dyn Transport>,
        self_id: Option<String>,
    ) -> Self {
        Self {
            session,
            directory,
            transport,
            self_id,
        }
    }

    /// The session this intake feeds.
    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    fn user_name(&self, id: &str) -> String {
        self.directory
            .resolve_user(id)
            .unwrap_or_else(|| id.to_owned())
    }

    /// Prefix `body` with the sender's name when the sender is known.
    fn attribute(&self, author_id: Option<&str>, body: &str) -> String {
        match author_id {
            Some(id) => format!("{}: {body}", self.user_name(id)),
            None => body.to_owned(),
        }
    }

    /// Decode an inbound message and append it to the log.
    ///
    /// Returns `false` if the event was ignored for lack of a channel or text.
    pub fn handle(&self, event: &InboundEvent) -> bool {
        let (Some(channel_id), Some(text)) = (event.channel_id.as_deref(), event.text.as_deref())
        else {
            warn!(?event, "ignoring incomplete event");
            return false;
        };

        let channel = self
            .directory
            .resolve_channel(channel_id)
            .unwrap_or_else(|| channel_id.to_owned());
        let body = markup::decode(text, self.directory.as_ref(), self.self_id.as_deref());
        let line = self.attribute(event.author_id.as_deref(), &body);

        debug!(%channel, "message received");
        self.session.push(channel, line);
        true
    }

    /// Show a transport error in the most recently used channel.
    pub fn report_error(&self, detail: &str) {
        warn!(detail, "transport error");
        let channel = self.session.last_channel();
        self.session.push(channel, format!("{ERROR_MARKER}: {detail}"));
    }

    /// Route one network event.
    pub fn dispatch(&self, event: NetworkEvent) {
        match event {
            NetworkEvent::Message(message) => {
                self.handle(&message);
            }
            NetworkEvent::Error(detail) => self.report_error(&detail),
            NetworkEvent::Closed => {
                info!("network feed closed");
                self.session.stop_with(StopReason::Disconnected);
            }
        }
    }

    /// Drain `events` on a dedicated thread until the session stops.
    ///
    /// `poll_timeout` bounds how long a stop can go unnoticed while the feed
    /// is idle. A disconnected feed stops the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(
        self: Arc<Self>,
        events: Receiver<NetworkEvent>,
        poll_timeout: Duration,
    ) -> Result<IntakeActor> {
        let handle = thread::Builder::new()
            .name("backchannel-intake".to_string())
            .spawn(move || {
                let _guard = PanicGuard::new(&self.session, "intake");
                self.run_loop(&events, poll_timeout);
            })
            .map_err(|source| Error::Spawn {
                actor: "intake",
                source,
            })?;

        Ok(IntakeActor {
            handle: Some(handle),
        })
    }

    fn run_loop(&self, events: &Receiver<NetworkEvent>, poll_timeout: Duration) {
        info!("intake started");
        while self.session.is_running() {
            match events.recv_timeout(poll_timeout) {
                Ok(event) => self.dispatch(event),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    info!("network feed dropped");
                    self.session.stop_with(StopReason::Disconnected);
                }
            }
        }
        info!("intake stopped");
    }
}

impl Outbound for Intake {
    fn send(&self, channel: &str, text: &str) {
        debug!(%channel, "sending message");
        self.transport.send(channel, &markup::encode(text));
        let line = self.attribute(self.self_id.as_deref(), text);
        self.session.push(channel, line);
    }
}

/// Handle to a running intake thread.
#[derive(Debug)]
pub struct IntakeActor {
    handle: Option<JoinHandle<()>>,
}

impl IntakeActor {
    /// Wait for the intake thread to finish.
    ///
    /// The session must already be stopped (or the feed closed).
    ///
    /// # Errors
    ///
    /// Returns an error if the thread panicked.
    pub fn join(mut self) -> Result<()> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| Error::ActorPanicked("intake")),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::MemoryDirectory;
    use crate::session::Viewport;
    use crossbeam_channel::unbounded;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl Transport for RecordingTransport {
        fn send(&self, channel: &str, raw_text: &str) {
            self.sent
                .lock()
                .unwrap()
                .push((channel.to_owned(), raw_text.to_owned()));
        }
    }

    fn setup(self_id: Option<&str>) -> (Arc<Intake>, Arc<RecordingTransport>) {
        let session = Arc::new(SessionState::new("random", Viewport::default()));
        let directory = MemoryDirectory::new()
            .with_user("U1", "alice")
            .with_user("UME", "me")
            .with_channel("CDEV", "dev");
        let transport = Arc::new(RecordingTransport::default());
        let intake = Intake::new(
            session,
            Arc::new(directory),
            Arc::clone(&transport) as Arc<dyn Transport>,
            self_id.map(str::to_owned),
        );
        (Arc::new(intake), transport)
    }

    fn entries(intake: &Intake) -> Vec<(String, String)> {
        intake
            .session()
            .snapshot()
            .entries
            .into_iter()
            .map(|e| (e.channel, e.text))
            .collect()
    }

    #[test]
    fn test_inbound_message_end_to_end() {
        let (intake, _) = setup(Some("UME"));
        assert!(intake.handle(&InboundEvent::message("C1", "<@U1> hi", Some("U1"))));
        assert_eq!(
            entries(&intake),
            vec![("C1".to_owned(), "alice: @alice hi".to_owned())]
        );
    }

    #[test]
    fn test_channel_is_resolved_and_self_mention_highlighted() {
        let (intake, _) = setup(Some("UME"));
        intake.handle(&InboundEvent::message("CDEV", "ping <@UME>", Some("U404")));
        assert_eq!(
            entries(&intake),
            vec![("dev".to_owned(), "U404: ping !me".to_owned())]
        );
    }

    #[test]
    fn test_message_without_author_has_no_prefix() {
        let (intake, _) = setup(None);
        intake.handle(&InboundEvent::message("C1", "deploy &amp; relax", None));
        assert_eq!(
            entries(&intake),
            vec![("C1".to_owned(), "deploy & relax".to_owned())]
        );
    }

    #[test]
    fn test_incomplete_events_ignored() {
        let (intake, _) = setup(None);
        let no_text = InboundEvent {
            channel_id: Some("C1".into()),
            ..InboundEvent::default()
        };
        let no_channel = InboundEvent {
            text: Some("hi".into()),
            ..InboundEvent::default()
        };
        assert!(!intake.handle(&no_text));
        assert!(!intake.handle(&no_channel));
        assert_eq!(intake.session().log_len(), 0);
    }

    #[test]
    fn test_send_encodes_and_echoes() {
        let (intake, transport) = setup(Some("UME"));
        Outbound::send(intake.as_ref(), "dev", "a<b & c");

        assert_eq!(
            *transport.sent.lock().unwrap(),
            vec![("dev".to_owned(), "a&lt;b &amp; c".to_owned())]
        );
        assert_eq!(
            entries(&intake),
            vec![("dev".to_owned(), "me: a<b & c".to_owned())]
        );
    }

    #[test]
    fn test_error_goes_to_last_channel() {
        let (intake, _) = setup(None);
        intake.report_error("boot");
        intake.handle(&InboundEvent::message("CDEV", "hello", None));
        intake.report_error("rate limited");

        let log = entries(&intake);
        assert_eq!(log[0], ("random".to_owned(), "!error: boot".to_owned()));
        assert_eq!(log[2], ("dev".to_owned(), "!error: rate limited".to_owned()));
        assert!(markup::is_attention(&log[2].1));
    }

    #[test]
    fn test_spawned_intake_drains_feed_and_stops_on_close() {
        let (intake, _) = setup(None);
        let session = Arc::clone(intake.session());
        let (tx, rx) = unbounded();
        let actor = Arc::clone(&intake)
            .spawn(rx, Duration::from_millis(10))
            .unwrap();

        tx.send(NetworkEvent::Message(InboundEvent::message("C1", "one", None)))
            .unwrap();
        tx.send(NetworkEvent::Error("oops".into())).unwrap();
        tx.send(NetworkEvent::Closed).unwrap();

        assert_eq!(
            session.wait_stopped(Some(Duration::from_secs(5))),
            Some(StopReason::Disconnected)
        );
        actor.join().unwrap();
        assert_eq!(session.log_len(), 2);
    }

    struct FailingDirectory;

    impl Directory for FailingDirectory {
        fn resolve_user(&self, _id: &str) -> Option<String> {
            panic!("directory unavailable");
        }

        fn resolve_channel(&self, _id: &str) -> Option<String> {
            None
        }
    }

    #[test]
    fn test_panicking_directory_stops_session() {
        let session = Arc::new(SessionState::new("random", Viewport::default()));
        let intake = Arc::new(Intake::new(
            Arc::clone(&session),
            Arc::new(FailingDirectory),
            Arc::new(RecordingTransport::default()),
            None,
        ));
        let (tx, rx) = unbounded();
        let actor = intake.spawn(rx, Duration::from_millis(10)).unwrap();

        tx.send(NetworkEvent::Message(InboundEvent::message("C1", "hi", Some("U1"))))
            .unwrap();
        assert_eq!(
            session.wait_stopped(Some(Duration::from_secs(5))),
            Some(StopReason::Failed("intake actor panicked".into()))
        );
        assert!(matches!(actor.join(), Err(Error::ActorPanicked("intake"))));
    }

    #[test]
    fn test_spawned_intake_exits_on_stop() {
        let (intake, _) = setup(None);
        let session = Arc::clone(intake.session());
        let (_tx, rx) = unbounded::<NetworkEvent>();
        let actor = intake.spawn(rx, Duration::from_millis(10)).unwrap();

        session.stop();
        actor.join().unwrap();
        assert_eq!(session.stop_reason(), Some(StopReason::Requested));
    }
}
