//! Core of the single-scene 3D detection demo.
//!
//! Point-cloud samples are discovered and decoded by [`dataset::SampleSource`],
//! handed one at a time to a [`prelude::Detector`], and the resulting boxes are
//! persisted row by row by [`recording::DetectionRecorder`]. [`pipeline::Pipeline`]
//! sequences the three.

pub mod dataset;
pub mod detection;
pub mod pipeline;
pub mod prelude;
pub mod recording;
pub mod sample;
pub mod telemetry;

pub use pipeline::{Pipeline, RunState, RunSummary};
pub use prelude::{DetectError, DetectResult, Detector};
