use thiserror::Error;

use crate::capture::Frame;

#[derive(Debug, Error)]
#[error("inference failed: {0}")]
pub struct ClassifierError(pub String);

/// The vision model, reduced to what the decision policy needs: how many
/// circlips are visible in a frame. Blocking; one call per captured frame.
pub trait Classifier: Send + Sync {
    fn infer(&self, frame: &Frame) -> Result<u32, ClassifierError>;
}
