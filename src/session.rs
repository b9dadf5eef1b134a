//! Live scan session.
//!
//! Bridges the camera-rate producer context and the session owner:
//!
//! ```text
//! camera -> classifier -> score_frame --post--> Mailbox --poll--> FrameDebouncer
//!           (producer thread, never blocks)              (owner context)
//! ```
//!
//! The producer thread does the O(L) per-frame work and posts a
//! [`FrameVerdict`] into a single-slot mailbox; the owner drains the latest
//! verdict through [`LiveScanSession::poll`]. Frames lost while the owner runs
//! behind only delay the consecutive-frame threshold.

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::camera::CameraSource;
use crate::classify::{ClassifierBackend, LabelTable};
use crate::debounce::{
    score_frame, DebounceConfig, DetectionResult, FrameDebouncer, FrameVerdict, LiveScanUpdate,
};
use crate::mailbox::Mailbox;

/// One live camera session. At most one is active at a time; counters and the
/// catch latch are scoped to this object.
pub struct LiveScanSession {
    cfg: DebounceConfig,
    labels: LabelTable,
    debouncer: FrameDebouncer,
    mailbox: Arc<Mailbox<FrameVerdict>>,
    stop_flag: Arc<AtomicBool>,
    producer: Option<JoinHandle<()>>,
}

impl LiveScanSession {
    pub fn new(cfg: DebounceConfig, labels: LabelTable) -> Self {
        Self {
            cfg,
            labels,
            debouncer: FrameDebouncer::new(cfg),
            mailbox: Arc::new(Mailbox::new()),
            stop_flag: Arc::new(AtomicBool::new(false)),
            producer: None,
        }
    }

    /// Begin scanning: warms up the classifier and spawns the producer thread.
    ///
    /// If the classifier reports not-ready after warm-up, no producer is
    /// spawned and the session stays `Idle`; this is not a failure.
    pub fn start(
        &mut self,
        mut camera: CameraSource,
        mut classifier: Box<dyn ClassifierBackend>,
    ) -> Result<()> {
        if self.producer.is_some() {
            return Err(anyhow!("live scan session already running"));
        }

        classifier.warm_up()?;
        let ready = classifier.is_ready();
        self.debouncer.set_classifier_ready(ready);
        self.debouncer.start();
        if !ready {
            log::warn!("classifier {} not ready; session idle", classifier.name());
            return Ok(());
        }

        camera.connect()?;
        let frame_interval = Duration::from_millis(1_000 / u64::from(camera.target_fps().max(1)));

        let mailbox = Arc::clone(&self.mailbox);
        let stop_flag = Arc::clone(&self.stop_flag);
        stop_flag.store(false, Ordering::SeqCst);
        let cfg = self.cfg;
        let labels = self.labels.clone();

        let handle = std::thread::spawn(move || {
            while !stop_flag.load(Ordering::SeqCst) {
                let frame = match camera.next_frame() {
                    Ok(frame) => frame,
                    Err(e) => {
                        log::warn!("camera frame capture failed: {}", e);
                        std::thread::sleep(frame_interval);
                        continue;
                    }
                };
                let verdict = match classifier.classify(&frame.data, frame.width, frame.height) {
                    Ok(scores) => score_frame(&scores, &labels, &cfg),
                    Err(e) => {
                        // Classifier hiccups degrade to searching, same as a
                        // malformed score vector.
                        log::debug!("classify failed on frame {}: {}", frame.seq, e);
                        FrameVerdict::Searching
                    }
                };
                mailbox.post(verdict);
                std::thread::sleep(frame_interval);
            }
            log::debug!("frame producer stopped");
        });
        self.producer = Some(handle);
        Ok(())
    }

    /// Drain the latest frame verdict into the debouncer, waiting up to
    /// `timeout` for one to arrive. Returns the catch when it fires.
    pub fn poll(&mut self, timeout: Duration) -> Option<DetectionResult> {
        let verdict = self.mailbox.recv_timeout(timeout)?;
        self.debouncer.apply(verdict)
    }

    /// Apply a verdict directly, bypassing the mailbox. Used by the owner when
    /// it already sits on the producer context (and by tests).
    pub fn apply(&mut self, verdict: FrameVerdict) -> Option<DetectionResult> {
        self.debouncer.apply(verdict)
    }

    /// Observable state for the UI layer.
    pub fn update(&self) -> LiveScanUpdate {
        self.debouncer.update()
    }

    /// Re-arm after a catch was consumed or rejected; scanning resumes.
    pub fn reset(&mut self) {
        self.debouncer.reset();
    }

    pub fn is_running(&self) -> bool {
        self.producer.is_some()
    }

    /// End the session: stops the producer thread and forces `Idle`.
    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.producer.take() {
            let _ = handle.join();
        }
        self.debouncer.stop();
    }
}

impl Drop for LiveScanSession {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraConfig;
    use crate::classify::StubClassifier;
    use crate::debounce::LiveScanStatus;

    #[test]
    fn not_ready_classifier_leaves_session_idle() {
        let mut session =
            LiveScanSession::new(DebounceConfig::default(), LabelTable::default_food_labels());
        let camera = CameraSource::new(CameraConfig::default()).unwrap();
        session
            .start(camera, Box::new(StubClassifier::not_ready(12)))
            .unwrap();
        assert!(!session.is_running());
        assert_eq!(session.update().status, LiveScanStatus::Idle);
    }

    #[test]
    fn double_start_rejected() {
        let mut session =
            LiveScanSession::new(DebounceConfig::default(), LabelTable::default_food_labels());
        let camera = CameraSource::new(CameraConfig::default()).unwrap();
        session
            .start(camera, Box::new(StubClassifier::new(12)))
            .unwrap();
        assert!(session.is_running());

        let second_camera = CameraSource::new(CameraConfig::default()).unwrap();
        assert!(session
            .start(second_camera, Box::new(StubClassifier::new(12)))
            .is_err());
        session.stop();
        assert!(!session.is_running());
    }

    #[test]
    fn scripted_run_catches_through_the_mailbox() {
        // A script that always reports class 1 at high confidence.
        let mut frames = Vec::new();
        for _ in 0..2 {
            let mut scores = vec![0.05f32; 12];
            scores[1] = 0.95;
            frames.push(scores);
        }
        let classifier = StubClassifier::scripted(frames);

        let config = CameraConfig {
            target_fps: 200,
            width: 8,
            height: 8,
            ..CameraConfig::default()
        };
        let camera = CameraSource::new(config).unwrap();

        let mut session =
            LiveScanSession::new(DebounceConfig::default(), LabelTable::default_food_labels());
        session.start(camera, Box::new(classifier)).unwrap();

        let mut caught = None;
        for _ in 0..200 {
            if let Some(result) = session.poll(Duration::from_millis(100)) {
                caught = Some(result);
                break;
            }
        }
        session.stop();

        let caught = caught.expect("debounce fired");
        assert_eq!(caught.label, "banana");
        assert!(caught.confidence > 0.9);
    }
}
