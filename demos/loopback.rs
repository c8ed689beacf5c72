//! Loopback demo: a chat interface wired to a fake network.
//!
//! Everything you send comes back from `echo` a moment later. Sending
//! `fail` produces a transport error instead. `!channel text` sends to
//! another channel, Ctrl-L clears the screen and Ctrl-C quits.
//!
//! Logs go to `loopback.log`; set `RUST_LOG=debug` to see every frame.

use backchannel::{
    InboundEvent, Interface, InterfaceConfig, MemoryDirectory, NetworkEvent, Result, Transport,
};
use crossbeam_channel::{unbounded, Sender};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

/// Replies to every message through the network feed.
struct LoopbackTransport {
    events: Sender<NetworkEvent>,
}

impl Transport for LoopbackTransport {
    fn send(&self, channel: &str, raw_text: &str) {
        let event = if raw_text == "fail" {
            NetworkEvent::Error("simulated send failure".to_string())
        } else {
            NetworkEvent::Message(InboundEvent::message(
                channel,
                format!("<@UME> you said: {raw_text}"),
                Some("UECHO"),
            ))
        };
        let events = self.events.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(300));
            let _ = events.send(event);
        });
    }
}

fn configure_logging() -> Option<WorkerGuard> {
    let file_appender = tracing_appender::rolling::never(Path::new("."), "loopback.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()
        .map(|()| guard)
}

fn main() -> Result<()> {
    let _log_guard = configure_logging();

    let directory = MemoryDirectory::new()
        .with_user("UME", "me")
        .with_user("UECHO", "echo")
        .with_user("UOPS", "ops-bot")
        .with_channel("CGEN", "general")
        .with_channel("COPS", "ops");

    let (events_tx, events_rx) = unbounded();
    let transport = Arc::new(LoopbackTransport {
        events: events_tx.clone(),
    });

    let config = InterfaceConfig::default()
        .with_default_channel("general")
        .with_self_id("UME");
    let mut interface = Interface::new(config, Arc::new(directory), transport);

    interface.start()?;
    interface.feed(events_rx)?;

    let _ = events_tx.send(NetworkEvent::Message(InboundEvent::message(
        "CGEN",
        "welcome to <#CGEN|general>, type and press enter",
        Some("UECHO"),
    )));
    let _ = events_tx.send(NetworkEvent::Message(InboundEvent::message(
        "COPS",
        "<!here> deploy of <https://example.com/build/42|build 42> finished &amp; green",
        Some("UOPS"),
    )));

    let reason = interface.wait(None);
    interface.stop()?;
    info!(?reason, "loopback finished");
    drop(events_tx);
    Ok(())
}
