//! Remote scan job controller.
//!
//! Drives exactly one recognition job from photo to result:
//!
//! ```text
//! idle -> connecting -> uploading -> scanning -> completed
//!                \-> error    \-> error  \-> error
//! ```
//!
//! The channel handle is owned here, never module-level state, and is
//! released on every terminal transition and on explicit [`disconnect`].
//! Exactly one channel is open per active job and exactly one upload is
//! issued per job.
//!
//! [`disconnect`]: ScanJobController::disconnect

use anyhow::{anyhow, Result};
use std::time::Duration;

use crate::scan_job::channel::{ChannelConnector, ScanChannel};
use crate::scan_job::event::ChannelEvent;
use crate::scan_job::state::{ScanJob, ScanResult, ScanStatus};
use crate::scan_job::upload::UploadClient;

/// How long one wait on the channel lasts before the controller re-checks
/// state. This is a polling granularity, not a job timeout: the controller
/// deliberately has no built-in timeout, callers layer their own and pair it
/// with `disconnect` plus `reset`.
const EVENT_WAIT: Duration = Duration::from_millis(250);

pub struct ScanJobController<C: ChannelConnector, U: UploadClient> {
    connector: C,
    uploader: U,
    job: ScanJob,
    channel: Option<Box<dyn ScanChannel>>,
}

impl<C: ChannelConnector, U: UploadClient> ScanJobController<C, U> {
    pub fn new(connector: C, uploader: U) -> Self {
        Self {
            connector,
            uploader,
            job: ScanJob::idle(),
            channel: None,
        }
    }

    /// Current job snapshot.
    pub fn job(&self) -> &ScanJob {
        &self.job
    }

    /// True while a channel handle is held.
    pub fn has_open_channel(&self) -> bool {
        self.channel.is_some()
    }

    /// Run one scan to its terminal state. See [`start_scan_with`] for the
    /// observable variant.
    ///
    /// [`start_scan_with`]: ScanJobController::start_scan_with
    pub fn start_scan(&mut self, photo: &[u8]) -> Result<ScanResult> {
        self.start_scan_with(photo, |_| {})
    }

    /// Run one scan, invoking `observe` with a [`ScanJob`] snapshot after
    /// every applied transition or progress update. Blocks until the job
    /// reaches `completed` (returning the result) or `error` (returning the
    /// failure, mirrored into the snapshot).
    pub fn start_scan_with(
        &mut self,
        photo: &[u8],
        mut observe: impl FnMut(&ScanJob),
    ) -> Result<ScanResult> {
        // Starting a new scan tears down any prior channel first; two
        // channels never coexist.
        self.disconnect();
        self.job = ScanJob::idle();

        self.transition(ScanStatus::Connecting);
        self.job.progress = 0;
        observe(&self.job);

        let channel = match self.connector.connect() {
            Ok(channel) => channel,
            Err(e) => {
                let message = format!("channel connection failed: {}", e);
                self.fail(&message);
                observe(&self.job);
                return Err(anyhow!(message));
            }
        };
        self.channel = Some(channel);

        self.transition(ScanStatus::Uploading);
        self.job.progress = 5;
        observe(&self.job);

        // Exactly one upload per job.
        let scan_id = match self.uploader.upload(photo) {
            Ok(scan_id) => scan_id,
            Err(e) => {
                let message = format!("photo upload failed: {}", e);
                self.fail(&message);
                observe(&self.job);
                return Err(anyhow!(message));
            }
        };
        self.job.scan_id = Some(scan_id.clone());

        self.transition(ScanStatus::Scanning);
        self.job.progress = 10;
        observe(&self.job);

        if let Some(channel) = self.channel.as_mut() {
            if let Err(e) = channel.subscribe(&scan_id) {
                let message = format!("scan subscription failed: {}", e);
                self.fail(&message);
                observe(&self.job);
                return Err(anyhow!(message));
            }
        }

        // Relay channel events in arrival order until the terminal one.
        loop {
            if self.job.status.is_terminal() {
                break;
            }
            let event = match self.channel.as_mut() {
                Some(channel) => channel.next_event(EVENT_WAIT)?,
                None => {
                    // Disconnected out from under us (external cancellation).
                    let message = "channel closed before a terminal event".to_string();
                    self.fail(&message);
                    observe(&self.job);
                    return Err(anyhow!(message));
                }
            };
            if let Some(event) = event {
                self.apply_event(event);
                observe(&self.job);
            }
        }

        match self.job.status {
            ScanStatus::Completed => match self.job.result.clone() {
                Some(result) => Ok(result),
                None => Err(anyhow!("completed scan carried no result")),
            },
            _ => Err(anyhow!(
                "{}",
                self.job.error.as_deref().unwrap_or("scan failed")
            )),
        }
    }

    /// Apply one channel event to the job.
    ///
    /// Events arriving after a terminal state (a stale channel still
    /// delivering) have no effect.
    pub fn apply_event(&mut self, event: ChannelEvent) {
        if self.job.status.is_terminal() {
            log::debug!("ignoring channel event after terminal state");
            return;
        }
        match event {
            ChannelEvent::Progress {
                state,
                progress,
                message,
            } => {
                if self.job.status != ScanStatus::Scanning {
                    log::debug!("progress event before scanning state; ignored");
                    return;
                }
                self.job.progress = progress.min(100);
                self.job.progress_message = message;
                log::debug!(
                    "scan {} progress {}% ({})",
                    self.job.scan_id.as_deref().unwrap_or("?"),
                    self.job.progress,
                    state
                );
            }
            ChannelEvent::Completed { result } => {
                if !self.job.status.can_transition(ScanStatus::Completed) {
                    log::warn!("completed event in state {:?}; ignored", self.job.status);
                    return;
                }
                self.job.result = Some(result);
                self.job.progress = 100;
                self.job.progress_message.clear();
                self.job.status = ScanStatus::Completed;
                self.close_channel();
            }
            ChannelEvent::Error { code, message } => {
                log::warn!("scan failed: {} ({})", message, code);
                self.fail(&message);
            }
            ChannelEvent::ConnectError { message } => {
                self.fail(&message);
            }
        }
    }

    /// Close the channel and clear the handle. Does not touch `status`;
    /// callers wanting to discard an in-flight job pair this with [`reset`].
    ///
    /// [`reset`]: ScanJobController::reset
    pub fn disconnect(&mut self) {
        self.close_channel();
    }

    /// Return to `idle` for a fresh scan. Closes any remaining channel.
    pub fn reset(&mut self) {
        self.close_channel();
        self.job = ScanJob::idle();
    }

    fn transition(&mut self, to: ScanStatus) {
        debug_assert!(
            self.job.status.can_transition(to),
            "illegal transition {:?} -> {:?}",
            self.job.status,
            to
        );
        if self.job.status.can_transition(to) {
            self.job.status = to;
        } else {
            log::warn!("refused transition {:?} -> {:?}", self.job.status, to);
        }
    }

    /// Every failure path converges here: same state shape, channel released.
    fn fail(&mut self, message: &str) {
        if self.job.status.can_transition(ScanStatus::Error) {
            self.job.status = ScanStatus::Error;
        }
        self.job.error = Some(message.to_string());
        self.close_channel();
    }

    fn close_channel(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            if let Err(e) = channel.close() {
                log::warn!("channel close failed: {}", e);
            }
        }
    }
}

impl<C: ChannelConnector, U: UploadClient> Drop for ScanJobController<C, U> {
    fn drop(&mut self) {
        self.close_channel();
    }
}
