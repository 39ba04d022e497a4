use std::path::PathBuf;

pub use crate::detection::{Detection, PredictionBundle};
pub use crate::sample::{PointCloudSample, SampleBatch, SampleRecord};

/// Number of `f32` fields per point: x, y, z, intensity.
pub const POINT_WIDTH: usize = 4;

/// Minimum number of box components: center (3), extents (3), heading (1).
pub const BOX_WIDTH: usize = 7;

/// Common error type for the detection pipeline.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("malformed sample {}: {reason}", .path.display())]
    Format { path: PathBuf, reason: String },
    #[error("unsupported point cloud format: {0}")]
    UnsupportedFormat(String),
    #[error("frame {frame_id}: detector returned {actual} prediction bundles, expected {expected}")]
    Cardinality {
        frame_id: usize,
        expected: usize,
        actual: usize,
    },
    #[error(
        "frame {frame_id}: prediction shape mismatch (boxes {boxes}x{box_width}, scores {scores}, labels {labels})"
    )]
    ShapeMismatch {
        frame_id: usize,
        boxes: usize,
        box_width: usize,
        scores: usize,
        labels: usize,
    },
    #[error("sample index {index} out of range for {len} samples")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("i/o failure on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed writing detections to {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("detector failure: {0}")]
    Detector(String),
}

pub type DetectResult<T> = Result<T, DetectError>;

/// Opaque inference capability.
///
/// The pipeline always hands over a batch holding exactly one sample and
/// expects exactly one bundle back. Implementations are driven from a single
/// thread, one call at a time.
pub trait Detector {
    fn infer(&mut self, batch: &SampleBatch) -> DetectResult<Vec<PredictionBundle>>;
}

impl<F> Detector for F
where
    F: FnMut(&SampleBatch) -> DetectResult<Vec<PredictionBundle>>,
{
    fn infer(&mut self, batch: &SampleBatch) -> DetectResult<Vec<PredictionBundle>> {
        self(batch)
    }
}
