use anyhow::{anyhow, Result};
use sha2::{Digest, Sha256};

use crate::classify::backend::ClassifierBackend;

/// Stub classifier for tests and the demo daemon.
///
/// Derives a score vector from a SHA-256 digest of the pixel data, so the same
/// frame always produces the same scores. A scene that holds still across
/// several frames therefore yields a stable label run, which is what the
/// debouncer needs to reach a catch.
pub struct StubClassifier {
    classes: usize,
    ready: bool,
    script: Option<ScriptState>,
}

struct ScriptState {
    frames: Vec<Vec<f32>>,
    cursor: usize,
}

impl StubClassifier {
    pub fn new(classes: usize) -> Self {
        Self {
            classes,
            ready: true,
            script: None,
        }
    }

    /// A classifier that replays a fixed sequence of score vectors, cycling
    /// when exhausted. Used by session tests to stage exact frame runs.
    pub fn scripted(frames: Vec<Vec<f32>>) -> Self {
        let classes = frames.first().map(|f| f.len()).unwrap_or(0);
        Self {
            classes,
            ready: true,
            script: Some(ScriptState { frames, cursor: 0 }),
        }
    }

    /// A classifier that reports not-ready, for testing the forced-idle path.
    pub fn not_ready(classes: usize) -> Self {
        Self {
            classes,
            ready: false,
            script: None,
        }
    }
}

impl ClassifierBackend for StubClassifier {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn classify(&mut self, pixels: &[u8], _width: u32, _height: u32) -> Result<Vec<f32>> {
        if !self.ready {
            return Err(anyhow!("stub classifier not ready"));
        }

        if let Some(script) = self.script.as_mut() {
            if script.frames.is_empty() {
                return Ok(vec![]);
            }
            let frame = script.frames[script.cursor % script.frames.len()].clone();
            script.cursor += 1;
            return Ok(frame);
        }

        let digest: [u8; 32] = Sha256::digest(pixels).into();
        let winner = digest[0] as usize % self.classes.max(1);
        // Winner confidence in [0, 1] from the digest; background noise well
        // below any detection threshold.
        let winner_score = digest[1] as f32 / 255.0;
        let mut scores = vec![0.0f32; self.classes];
        for (i, score) in scores.iter_mut().enumerate() {
            *score = (digest[2 + (i % 30)] as f32 / 255.0) * 0.2;
        }
        if let Some(slot) = scores.get_mut(winner) {
            *slot = winner_score.max(0.21);
        }
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_pixels_same_scores() {
        let mut backend = StubClassifier::new(8);
        let a = backend.classify(b"frame", 4, 4).unwrap();
        let b = backend.classify(b"frame", 4, 4).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
    }

    #[test]
    fn scripted_cycles() {
        let mut backend = StubClassifier::scripted(vec![vec![0.9, 0.1], vec![0.1, 0.9]]);
        assert_eq!(backend.classify(b"x", 1, 1).unwrap(), vec![0.9, 0.1]);
        assert_eq!(backend.classify(b"x", 1, 1).unwrap(), vec![0.1, 0.9]);
        assert_eq!(backend.classify(b"x", 1, 1).unwrap(), vec![0.9, 0.1]);
    }

    #[test]
    fn not_ready_errors() {
        let mut backend = StubClassifier::not_ready(4);
        assert!(!backend.is_ready());
        assert!(backend.classify(b"x", 1, 1).is_err());
    }
}
