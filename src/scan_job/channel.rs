//! Channel seam for remote scan jobs.
//!
//! The controller talks to the backend through these traits; production uses
//! the MQTT implementation in [`crate::scan_job::mqtt`], tests use the
//! scripted channel below.

use anyhow::{anyhow, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::scan_job::event::ChannelEvent;

/// One open, bidirectional channel to the backend scan namespace.
pub trait ScanChannel: Send {
    /// Tell the server which job this channel follows.
    fn subscribe(&mut self, scan_id: &str) -> Result<()>;

    /// Wait up to `timeout` for the next server-pushed event.
    ///
    /// `Ok(None)` means no event arrived in time (or the channel is closed);
    /// transport failures surface as [`ChannelEvent::ConnectError`], not as
    /// `Err`.
    fn next_event(&mut self, timeout: Duration) -> Result<Option<ChannelEvent>>;

    /// Close the channel. Idempotent; events sent after close are discarded.
    fn close(&mut self) -> Result<()>;
}

/// Opens channels. Exists so the controller owns when a connection happens
/// and tests can fail it deterministically.
pub trait ChannelConnector {
    fn connect(&self) -> Result<Box<dyn ScanChannel>>;
}

// ----------------------------------------------------------------------------
// Scripted channel for tests
// ----------------------------------------------------------------------------

/// Observable side effects of a scripted channel, shared with the test that
/// staged it (the controller consumes the channel box itself).
#[derive(Default)]
pub struct ChannelProbe {
    opened: AtomicUsize,
    closed: AtomicUsize,
    subscribed: Mutex<Vec<String>>,
}

impl ChannelProbe {
    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn subscribed_ids(&self) -> Vec<String> {
        self.subscribed.lock().expect("probe lock").clone()
    }
}

/// In-memory channel replaying a fixed event script.
pub struct ScriptedChannel {
    events: VecDeque<ChannelEvent>,
    probe: Arc<ChannelProbe>,
    closed: bool,
}

impl ScanChannel for ScriptedChannel {
    fn subscribe(&mut self, scan_id: &str) -> Result<()> {
        if self.closed {
            return Err(anyhow!("subscribe on closed channel"));
        }
        self.probe
            .subscribed
            .lock()
            .expect("probe lock")
            .push(scan_id.to_string());
        Ok(())
    }

    fn next_event(&mut self, _timeout: Duration) -> Result<Option<ChannelEvent>> {
        if self.closed {
            return Ok(None);
        }
        Ok(self.events.pop_front())
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.events.clear();
            self.probe.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Connector producing [`ScriptedChannel`]s, optionally failing the connect.
pub struct ScriptedConnector {
    script: Vec<ChannelEvent>,
    connect_error: Option<String>,
    probe: Arc<ChannelProbe>,
}

impl ScriptedConnector {
    pub fn new(script: Vec<ChannelEvent>) -> Self {
        Self {
            script,
            connect_error: None,
            probe: Arc::new(ChannelProbe::default()),
        }
    }

    /// A connector whose `connect` always fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            script: Vec::new(),
            connect_error: Some(message.to_string()),
            probe: Arc::new(ChannelProbe::default()),
        }
    }

    pub fn probe(&self) -> Arc<ChannelProbe> {
        Arc::clone(&self.probe)
    }
}

impl ChannelConnector for ScriptedConnector {
    fn connect(&self) -> Result<Box<dyn ScanChannel>> {
        if let Some(message) = &self.connect_error {
            return Err(anyhow!("{}", message));
        }
        self.probe.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedChannel {
            events: self.script.iter().cloned().collect(),
            probe: Arc::clone(&self.probe),
            closed: false,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_channel_replays_then_drains() {
        let connector = ScriptedConnector::new(vec![ChannelEvent::Progress {
            state: "queued".to_string(),
            progress: 1,
            message: String::new(),
        }]);
        let probe = connector.probe();
        let mut channel = connector.connect().unwrap();
        assert_eq!(probe.open_count(), 1);

        channel.subscribe("scan-1").unwrap();
        assert_eq!(probe.subscribed_ids(), vec!["scan-1".to_string()]);

        assert!(channel.next_event(Duration::ZERO).unwrap().is_some());
        assert!(channel.next_event(Duration::ZERO).unwrap().is_none());
    }

    #[test]
    fn close_is_idempotent_and_discards_events() {
        let connector = ScriptedConnector::new(vec![ChannelEvent::Error {
            code: "E".to_string(),
            message: "boom".to_string(),
        }]);
        let probe = connector.probe();
        let mut channel = connector.connect().unwrap();
        channel.close().unwrap();
        channel.close().unwrap();
        assert_eq!(probe.close_count(), 1);
        assert!(channel.next_event(Duration::ZERO).unwrap().is_none());
        assert!(channel.subscribe("scan-1").is_err());
    }

    #[test]
    fn failing_connector_errors() {
        let connector = ScriptedConnector::failing("broker unreachable");
        assert!(connector.connect().is_err());
    }
}
