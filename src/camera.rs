//! Camera frame source.
//!
//! The live-scan core consumes a push-based frame producer; real device
//! pipelines (mobile camera APIs) live outside this crate. `CameraSource`
//! provides the seam plus a synthetic `stub://` backend used by tests and the
//! demo daemon.
//!
//! The source is responsible for:
//! - Producing `CameraFrame` instances at roughly the target rate
//! - Assigning monotonic sequence numbers
//!
//! It provides no backpressure: consumers that run behind simply miss frames.

use anyhow::Result;
use rand::Rng;

use crate::frame::CameraFrame;

/// Configuration for a camera source.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Source URL. `stub://<name>` selects the synthetic backend.
    pub url: String,
    /// Target frame rate (frames per second).
    pub target_fps: u32,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            url: "stub://rear_camera".to_string(),
            target_fps: 15,
            width: 320,
            height: 240,
        }
    }
}

/// Camera frame source.
///
/// Only the synthetic backend is built in; anything that is not a `stub://`
/// URL is rejected, since device capture is an external collaborator.
pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCameraSource),
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Result<Self> {
        if config.url.starts_with("stub://") {
            Ok(Self {
                backend: CameraBackend::Synthetic(SyntheticCameraSource::new(config)),
            })
        } else {
            anyhow::bail!(
                "unsupported camera url {:?}: device capture is supplied by the host platform",
                config.url
            )
        }
    }

    /// Open the source.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.connect(),
        }
    }

    /// Capture the next frame.
    pub fn next_frame(&mut self) -> Result<CameraFrame> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.next_frame(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.is_healthy(),
        }
    }

    pub fn stats(&self) -> CameraStats {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.stats(),
        }
    }

    pub fn target_fps(&self) -> u32 {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.config.target_fps,
        }
    }
}

/// Statistics for a camera source.
#[derive(Clone, Debug)]
pub struct CameraStats {
    pub frames_captured: u64,
    pub url: String,
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests and the demo daemon
// ----------------------------------------------------------------------------

/// How many frames a synthetic "scene" holds still before switching.
const SCENE_HOLD_FRAMES: u64 = 30;

struct SyntheticCameraSource {
    config: CameraConfig,
    connected: bool,
    frame_count: u64,
    scene_state: u8,
}

impl SyntheticCameraSource {
    fn new(config: CameraConfig) -> Self {
        Self {
            config,
            connected: false,
            frame_count: 0,
            scene_state: 0,
        }
    }

    fn connect(&mut self) -> Result<()> {
        self.connected = true;
        log::info!("CameraSource: connected to {} (synthetic)", self.config.url);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<CameraFrame> {
        if !self.connected {
            anyhow::bail!("camera source not connected; call connect() first");
        }

        // Switch scenes periodically; within a scene the pixels are held
        // constant so a deterministic classifier sees a stable label run.
        if self.frame_count % SCENE_HOLD_FRAMES == 0 {
            self.scene_state = rand::thread_rng().gen();
            log::debug!(
                "CameraSource: synthetic scene change (state={})",
                self.scene_state
            );
        }

        let len = (self.config.width * self.config.height) as usize;
        let mut data = vec![0u8; len];
        for (i, px) in data.iter_mut().enumerate() {
            *px = self.scene_state.wrapping_add((i % 7) as u8);
        }

        let frame = CameraFrame::new(data, self.config.width, self.config.height, self.frame_count);
        self.frame_count += 1;
        Ok(frame)
    }

    fn is_healthy(&self) -> bool {
        self.connected
    }

    fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frame_count,
            url: self.config.url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_url_selects_synthetic_backend() {
        let mut source = CameraSource::new(CameraConfig::default()).unwrap();
        assert!(!source.is_healthy());
        source.connect().unwrap();
        assert!(source.is_healthy());

        let f0 = source.next_frame().unwrap();
        let f1 = source.next_frame().unwrap();
        assert_eq!(f0.seq, 0);
        assert_eq!(f1.seq, 1);
        // Scene holds: consecutive frames are identical.
        assert_eq!(f0.data, f1.data);
        assert_eq!(source.stats().frames_captured, 2);
    }

    #[test]
    fn non_stub_url_rejected() {
        let config = CameraConfig {
            url: "rtsp://example".to_string(),
            ..CameraConfig::default()
        };
        assert!(CameraSource::new(config).is_err());
    }

    #[test]
    fn capture_before_connect_errors() {
        let mut source = CameraSource::new(CameraConfig::default()).unwrap();
        assert!(source.next_frame().is_err());
    }
}
