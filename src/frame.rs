//! Camera frame value type.
//!
//! A `CameraFrame` is one discrete classification opportunity supplied by the
//! camera pipeline. Frames carry no timestamp guarantee; the producer may drop
//! frames when it runs behind, and the debounce logic tolerates that (a dropped
//! frame merely delays reaching the consecutive-frame threshold).

/// One captured frame, ready for classification.
#[derive(Clone, Debug)]
pub struct CameraFrame {
    /// Raw pixel data (grayscale or packed RGB, backend-defined).
    pub data: Vec<u8>,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Monotonic sequence number assigned by the source.
    pub seq: u64,
}

impl CameraFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, seq: u64) -> Self {
        Self {
            data,
            width,
            height,
            seq,
        }
    }
}
