//! Scan channel wire protocol.
//!
//! One logical channel per job. The client publishes a single subscribe
//! message; the server pushes zero or more progress events followed by exactly
//! one terminal event. Payloads are JSON tagged by an `event` field, parsed
//! into a closed sum type so no stringly-typed event names leak past this
//! module.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::scan_job::state::ScanResult;

/// Server-pushed (or transport-synthesized) channel event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ChannelEvent {
    /// In-flight progress update; overwrites the previous one.
    #[serde(rename = "scan:progress")]
    Progress {
        /// Server-side pipeline stage ("queued", "analyzing", ...).
        state: String,
        progress: u8,
        message: String,
    },
    /// Terminal success, exactly one per job.
    #[serde(rename = "scan:completed")]
    Completed { result: ScanResult },
    /// Terminal business-level failure, exactly one per job.
    #[serde(rename = "scan:error")]
    Error { code: String, message: String },
    /// Terminal transport-level failure. Synthesized by the channel
    /// implementation, not part of the job protocol.
    #[serde(rename = "connect_error")]
    ConnectError { message: String },
}

impl ChannelEvent {
    /// True for events that end the job.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChannelEvent::Progress { .. })
    }
}

/// Client -> server subscription message.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", rename = "subscribe:scan")]
pub struct SubscribeScan {
    #[serde(rename = "scanId")]
    pub scan_id: String,
}

/// Parse a channel payload into an event.
///
/// Returns an error for unknown event tags or malformed JSON; callers log and
/// skip such payloads rather than touching job state.
pub fn parse_channel_event(payload: &[u8]) -> Result<ChannelEvent> {
    serde_json::from_slice(payload).map_err(|e| anyhow!("invalid channel event payload: {}", e))
}
