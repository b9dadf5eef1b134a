//! Live-frame debouncer.
//!
//! Converts the noisy per-frame classification stream into a single reliable
//! "catch" event once the same label has held with high confidence across
//! several consecutive frames.
//!
//! Two steps, on two execution contexts:
//!
//! 1. [`score_frame`] runs on the frame producer (camera-rate, O(L) argmax).
//! 2. [`FrameDebouncer::apply`] runs on the session owner and does the O(1)
//!    counter bookkeeping.
//!
//! Guarantees:
//! - At most one catch per session; the latch only re-arms on [`FrameDebouncer::reset`].
//! - No catch before `consecutive_frames` qualifying frames.
//! - Malformed score vectors degrade to a searching verdict; nothing here
//!   returns an error or panics on classifier output.

use serde::{Deserialize, Serialize};

use crate::classify::LabelTable;

/// Below this the frame is treated as empty (searching).
pub const DEFAULT_WEAK_THRESHOLD: f32 = 0.35;
/// At or above this the frame confidently shows food.
pub const DEFAULT_PRESENCE_THRESHOLD: f32 = 0.55;
/// Minimum confidence for a frame to advance the consecutive counter.
pub const DEFAULT_CONFIRM_THRESHOLD: f32 = 0.70;
/// Matching, confident frames required before trusting a detection.
pub const DEFAULT_CONSECUTIVE_FRAMES: u32 = 5;

/// Debounce tuning knobs. Defaults match the shipped mobile build.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DebounceConfig {
    pub weak_threshold: f32,
    pub presence_threshold: f32,
    pub confirm_threshold: f32,
    pub consecutive_frames: u32,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            weak_threshold: DEFAULT_WEAK_THRESHOLD,
            presence_threshold: DEFAULT_PRESENCE_THRESHOLD,
            confirm_threshold: DEFAULT_CONFIRM_THRESHOLD,
            consecutive_frames: DEFAULT_CONSECUTIVE_FRAMES,
        }
    }
}

/// Live session status emitted to the UI layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiveScanStatus {
    /// No active session, or classifier not ready.
    Idle,
    /// Session active, nothing recognizable in view.
    Searching,
    /// Current frame shows a candidate; label/confidence may fluctuate.
    Detecting,
    /// The debounce condition fired; terminal until reset.
    Caught,
}

/// The debounced confirmation that a food item was reliably identified.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub label: String,
    /// Confidence of the frame that crossed the threshold, in `[0, 1]`.
    pub confidence: f32,
}

/// Per-frame classification outcome, produced on the camera context.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameVerdict {
    /// Nothing above the weak threshold (or a malformed score vector).
    Searching,
    /// Best-guess label for this frame.
    Detecting {
        label: String,
        confidence: f32,
        /// True when confidence sits between the weak and presence thresholds;
        /// the UI may render the label as a guess rather than a detection.
        tentative: bool,
    },
}

/// Snapshot of observable session state, plain and serializable.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LiveScanUpdate {
    pub status: LiveScanStatus,
    pub label: Option<String>,
    pub confidence: Option<f32>,
}

/// Score one frame: argmax over the raw score vector, normalize, threshold.
///
/// Raw scores above 1.0 are treated as unsigned-byte quantization and divided
/// by 255, so a quantized 255 and a float 1.0 normalize identically. An empty
/// vector, a NaN-only vector, or an argmax outside the label table all degrade
/// to [`FrameVerdict::Searching`].
pub fn score_frame(scores: &[f32], labels: &LabelTable, cfg: &DebounceConfig) -> FrameVerdict {
    let mut best_index = None;
    let mut best_score = f32::NEG_INFINITY;
    for (i, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        if score > best_score {
            best_score = score;
            best_index = Some(i);
        }
    }
    let Some(index) = best_index else {
        return FrameVerdict::Searching;
    };
    let Some(label) = labels.get(index) else {
        return FrameVerdict::Searching;
    };

    let confidence = normalize_score(best_score);
    if confidence >= cfg.presence_threshold {
        FrameVerdict::Detecting {
            label: label.to_string(),
            confidence,
            tentative: false,
        }
    } else if confidence > cfg.weak_threshold {
        FrameVerdict::Detecting {
            label: label.to_string(),
            confidence,
            tentative: true,
        }
    } else {
        FrameVerdict::Searching
    }
}

/// Normalize a raw classifier score into `[0, 1]`.
fn normalize_score(raw: f32) -> f32 {
    let value = if raw > 1.0 { raw / 255.0 } else { raw };
    value.clamp(0.0, 1.0)
}

/// Debounce state machine: counters plus the one-shot catch latch.
///
/// Scoped to one live session; the system assumes exactly one active camera
/// session at a time.
#[derive(Debug)]
pub struct FrameDebouncer {
    cfg: DebounceConfig,
    status: LiveScanStatus,
    count: u32,
    last_label: Option<String>,
    fired: bool,
    active: bool,
    classifier_ready: bool,
    last_detection: Option<(String, f32)>,
}

impl FrameDebouncer {
    pub fn new(cfg: DebounceConfig) -> Self {
        Self {
            cfg,
            status: LiveScanStatus::Idle,
            count: 0,
            last_label: None,
            fired: false,
            active: false,
            classifier_ready: false,
            last_detection: None,
        }
    }

    /// Record classifier readiness. While not ready, status is forced to
    /// `Idle` regardless of session-start calls.
    pub fn set_classifier_ready(&mut self, ready: bool) {
        self.classifier_ready = ready;
        if !ready {
            self.status = LiveScanStatus::Idle;
        } else if self.active && self.status == LiveScanStatus::Idle {
            self.status = LiveScanStatus::Searching;
        }
    }

    /// Begin a session: clears all counters and the latch.
    pub fn start(&mut self) {
        self.active = true;
        self.clear_counters();
        self.fired = false;
        self.status = if self.classifier_ready {
            LiveScanStatus::Searching
        } else {
            LiveScanStatus::Idle
        };
    }

    /// Re-arm after a catch was consumed or rejected. Does not change whether
    /// the session is active; an active session resumes searching.
    pub fn reset(&mut self) {
        self.clear_counters();
        self.fired = false;
        if self.active && self.classifier_ready {
            self.status = LiveScanStatus::Searching;
        }
    }

    /// End the session and stop consuming frames.
    pub fn stop(&mut self) {
        self.active = false;
        self.clear_counters();
        self.fired = false;
        self.status = LiveScanStatus::Idle;
    }

    fn clear_counters(&mut self) {
        self.count = 0;
        self.last_label = None;
        self.last_detection = None;
    }

    /// Apply one frame verdict. Returns the catch exactly once per session,
    /// when the consecutive-frame condition first holds.
    pub fn apply(&mut self, verdict: FrameVerdict) -> Option<DetectionResult> {
        if !self.active || !self.classifier_ready {
            return None;
        }
        // Caught is terminal for the session until reset().
        if self.fired {
            return None;
        }

        match verdict {
            FrameVerdict::Searching => {
                self.clear_counters();
                self.status = LiveScanStatus::Searching;
                None
            }
            FrameVerdict::Detecting {
                label, confidence, ..
            } => {
                self.last_detection = Some((label.clone(), confidence));
                self.status = LiveScanStatus::Detecting;

                if confidence >= self.cfg.confirm_threshold {
                    if self.last_label.as_deref() == Some(label.as_str()) {
                        self.count += 1;
                    } else {
                        self.count = 1;
                        self.last_label = Some(label.clone());
                    }
                    if self.count >= self.cfg.consecutive_frames {
                        self.fired = true;
                        self.status = LiveScanStatus::Caught;
                        return Some(DetectionResult { label, confidence });
                    }
                } else if self.last_label.as_deref() != Some(label.as_str()) {
                    // Ambiguous low-confidence frame with a new label: track the
                    // label but contribute nothing toward the catch threshold.
                    self.count = 0;
                    self.last_label = Some(label);
                }
                // Low-confidence frame with the same label retains the current
                // count: it neither advances nor resets the run.
                None
            }
        }
    }

    pub fn status(&self) -> LiveScanStatus {
        self.status
    }

    pub fn is_caught(&self) -> bool {
        self.fired
    }

    /// Current observable state for the UI layer.
    pub fn update(&self) -> LiveScanUpdate {
        let (label, confidence) = match &self.last_detection {
            Some((label, confidence)) => (Some(label.clone()), Some(*confidence)),
            None => (None, None),
        };
        LiveScanUpdate {
            status: self.status,
            label,
            confidence,
        }
    }
}

impl Default for FrameDebouncer {
    fn default() -> Self {
        Self::new(DebounceConfig::default())
    }
}
