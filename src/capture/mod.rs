use image::RgbImage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("could not open camera {index}: {reason}")]
    DeviceUnavailable { index: u32, reason: String },
    #[error("failed to read frame: {0}")]
    ReadFailed(String),
}

/// One captured camera frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// A video capture device. Implementations are blocking; the session runs
/// them on a dedicated worker.
///
/// `close` must be safe to call whether or not `open` succeeded — the session
/// releases the source on every exit path.
pub trait FrameSource: Send {
    fn open(&mut self) -> Result<(), CaptureError>;
    fn read_frame(&mut self) -> Result<Frame, CaptureError>;
    fn close(&mut self);
}
