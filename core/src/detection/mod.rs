pub mod bundle;
pub mod replay;

pub use bundle::{Detection, PredictionBundle};
pub use replay::{RecordedPrediction, ReplayDetector};
