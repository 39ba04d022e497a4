use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::detection::bundle::PredictionBundle;
use crate::prelude::{DetectError, DetectResult, Detector};
use crate::sample::SampleBatch;

/// Prediction set captured for one frame, as stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordedPrediction {
    pub frame_id: usize,
    #[serde(default)]
    pub pred_boxes: Vec<Vec<f32>>,
    #[serde(default)]
    pub pred_scores: Vec<f32>,
    #[serde(default)]
    pub pred_labels: Vec<i64>,
}

impl RecordedPrediction {
    pub fn to_bundle(&self) -> DetectResult<PredictionBundle> {
        PredictionBundle::from_rows(
            &self.pred_boxes,
            self.pred_scores.clone(),
            self.pred_labels.clone(),
        )
    }
}

/// Detector that replays predictions captured from an earlier model run.
///
/// Each sample in the batch yields one bundle; frames without a recording
/// yield an empty bundle.
#[derive(Debug, Default)]
pub struct ReplayDetector {
    frames: BTreeMap<usize, Vec<RecordedPrediction>>,
}

impl ReplayDetector {
    pub fn new(recordings: Vec<RecordedPrediction>) -> Self {
        let mut frames: BTreeMap<usize, Vec<RecordedPrediction>> = BTreeMap::new();
        for recording in recordings {
            frames.entry(recording.frame_id).or_default().push(recording);
        }
        Self { frames }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Reads a JSON array of [`RecordedPrediction`]s.
    pub fn load<P: AsRef<Path>>(path: P) -> DetectResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| DetectError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let recordings: Vec<RecordedPrediction> =
            serde_json::from_str(&contents).map_err(|err| {
                DetectError::Detector(format!("parsing recordings {}: {}", path.display(), err))
            })?;
        Ok(Self::new(recordings))
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

impl Detector for ReplayDetector {
    fn infer(&mut self, batch: &SampleBatch) -> DetectResult<Vec<PredictionBundle>> {
        let mut bundles = Vec::with_capacity(batch.batch_size());
        for frame_id in batch.frame_ids() {
            match self.frames.get(&frame_id) {
                Some(recordings) => {
                    for recording in recordings {
                        bundles.push(recording.to_bundle()?);
                    }
                }
                None => bundles.push(PredictionBundle::empty()),
            }
        }
        Ok(bundles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{PointCloudSample, SampleRecord};
    use ndarray::Array2;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn batch_for(frame_id: usize) -> SampleBatch {
        let points = PointCloudSample::from_array(Array2::zeros((1, 4))).unwrap();
        SampleBatch::collate(vec![SampleRecord::new(points, frame_id)])
    }

    #[test]
    fn replay_loads_json_recordings() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"[{"frame_id": 1,
                  "pred_boxes": [[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 0.5]],
                  "pred_scores": [0.9],
                  "pred_labels": [1]}]"#,
        )
        .unwrap();

        let mut detector = ReplayDetector::load(file.path()).unwrap();
        assert_eq!(detector.frame_count(), 1);

        let bundles = detector.infer(&batch_for(1)).unwrap();
        assert_eq!(bundles.len(), 1);
        assert_eq!(bundles[0].len(), 1);
        assert_eq!(bundles[0].pred_boxes[[0, 6]], 0.5);
    }

    #[test]
    fn replay_yields_empty_bundle_for_unknown_frame() {
        let mut detector = ReplayDetector::empty();
        let bundles = detector.infer(&batch_for(7)).unwrap();
        assert_eq!(bundles.len(), 1);
        assert!(bundles[0].is_empty());
    }

    #[test]
    fn replay_surfaces_duplicate_recordings() {
        let recording = RecordedPrediction {
            frame_id: 2,
            ..Default::default()
        };
        let mut detector = ReplayDetector::new(vec![recording.clone(), recording]);
        assert_eq!(detector.infer(&batch_for(2)).unwrap().len(), 2);
    }
}
