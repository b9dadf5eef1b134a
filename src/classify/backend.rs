use anyhow::Result;

/// Classifier backend trait.
///
/// A backend wraps an ML inference runtime that scores each camera frame
/// against a fixed set of known food classes. The core does not load or
/// interpret model files; it only consumes the per-frame score vector.
///
/// Implementations must:
/// - Return a score vector of constant length across calls (one entry per class)
/// - Treat the pixel slice as read-only and ephemeral
/// - Never block on network or disk inside `classify`
///
/// Scores may be float probabilities in `[0, 1]` or unsigned-byte quantized
/// values in `[0, 255]`; the debouncer normalizes both (see
/// [`crate::debounce::score_frame`]).
pub trait ClassifierBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Returns true once the model is loaded and inference can run.
    ///
    /// While this is false, live-scan sessions are forced to `Idle`.
    fn is_ready(&self) -> bool;

    /// Score one frame. The returned vector has one raw score per known class.
    fn classify(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<f32>>;

    /// Optional warm-up hook (model load, first-inference priming).
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
