//! Meal Scan Core (MSC)
//!
//! This crate implements the recognition core of a consumer nutrition-tracking
//! app: it turns a live camera feed or an uploaded photo into a structured
//! recognition result.
//!
//! # Architecture
//!
//! Two cooperating pieces, fed by external collaborators (the device camera
//! and an ML inference runtime) and consumed by a UI layer that only ever
//! sees plain serializable state:
//!
//! - **Frame Debouncer** (`debounce`, `session`): classifies camera frames at
//!   producer rate and condenses the noisy label/confidence stream into a
//!   single reliable catch event once the signal holds across consecutive
//!   frames.
//! - **Scan Job Controller** (`scan_job`): uploads a captured photo, opens a
//!   persistent event channel to the backend job, and drives
//!   connecting → uploading → scanning → completed/error.
//!
//! # Guarantees
//!
//! 1. At most one catch event per live session; none before the
//!    consecutive-frame threshold.
//! 2. The frame producer context never blocks on the session owner; under
//!    load the owner sees only the latest frame verdict.
//! 3. Malformed classifier output degrades to a searching status; the
//!    debouncer never surfaces an error.
//! 4. Exactly one channel is open per active scan job, and it is closed on
//!    every terminal transition and on explicit disconnect.
//! 5. Job status moves strictly forward; the only way back is an explicit
//!    reset to idle.
//!
//! # Module Structure
//!
//! - `classify`: classifier backend seam + label table
//! - `camera`, `frame`: frame producer seam
//! - `debounce`, `mailbox`, `session`: the live-scan pipeline
//! - `scan_job`: remote job controller, channel, upload
//! - `config`, `ui`: runtime configuration and binary-side rendering

pub mod camera;
pub mod classify;
pub mod config;
pub mod debounce;
pub mod frame;
pub mod mailbox;
pub mod scan_job;
pub mod session;
pub mod ui;

pub use camera::{CameraConfig, CameraSource, CameraStats};
pub use classify::{ClassifierBackend, LabelTable, StubClassifier};
pub use config::MealscanConfig;
pub use debounce::{
    score_frame, DebounceConfig, DetectionResult, FrameDebouncer, FrameVerdict, LiveScanStatus,
    LiveScanUpdate,
};
pub use frame::CameraFrame;
pub use mailbox::Mailbox;
pub use scan_job::{
    ChannelConnector, ChannelEvent, HttpUploadClient, MqttChannelConfig, MqttConnector, ScanChannel,
    ScanJob, ScanJobController, ScanResult, ScanStatus, ScriptedConnector, StubUploader,
    UploadClient,
};
pub use session::LiveScanSession;
