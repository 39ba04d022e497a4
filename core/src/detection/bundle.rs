use ndarray::{Array1, Array2, ArrayView1};

use crate::prelude::{DetectError, DetectResult, BOX_WIDTH};

/// One predicted object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection<'a> {
    /// `[cx, cy, cz, w, l, h, heading, ..]`
    pub bbox: ArrayView1<'a, f32>,
    pub score: f32,
    pub label: i64,
}

impl<'a> Detection<'a> {
    pub fn center(&self) -> [f32; 3] {
        [self.bbox[0], self.bbox[1], self.bbox[2]]
    }

    pub fn extents(&self) -> [f32; 3] {
        [self.bbox[3], self.bbox[4], self.bbox[5]]
    }

    /// Heading plus any trailing components the detector appends.
    pub fn heading(&self) -> Vec<f32> {
        self.bbox.iter().skip(BOX_WIDTH - 1).copied().collect()
    }
}

/// Raw prediction set for one sample as returned by a detector.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionBundle {
    pub pred_boxes: Array2<f32>,
    pub pred_scores: Array1<f32>,
    pub pred_labels: Array1<i64>,
}

impl PredictionBundle {
    pub fn new(
        pred_boxes: Array2<f32>,
        pred_scores: Array1<f32>,
        pred_labels: Array1<i64>,
    ) -> Self {
        Self {
            pred_boxes,
            pred_scores,
            pred_labels,
        }
    }

    /// A bundle with no detections.
    pub fn empty() -> Self {
        Self::new(
            Array2::zeros((0, BOX_WIDTH)),
            Array1::zeros(0),
            Array1::zeros(0),
        )
    }

    /// Builds a bundle from row-major box lists, rejecting ragged rows.
    pub fn from_rows(
        boxes: &[Vec<f32>],
        scores: Vec<f32>,
        labels: Vec<i64>,
    ) -> DetectResult<Self> {
        let width = boxes.first().map_or(BOX_WIDTH, Vec::len);
        if boxes.iter().any(|row| row.len() != width) {
            return Err(DetectError::Detector(format!(
                "ragged box rows, expected {} components each",
                width
            )));
        }
        let flat: Vec<f32> = boxes.iter().flatten().copied().collect();
        let pred_boxes = Array2::from_shape_vec((boxes.len(), width), flat)
            .map_err(|err| DetectError::Detector(err.to_string()))?;

        Ok(Self::new(
            pred_boxes,
            Array1::from(scores),
            Array1::from(labels),
        ))
    }

    /// Number of detections, given the bundle has already been validated.
    pub fn len(&self) -> usize {
        self.pred_boxes.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks that boxes, scores and labels agree on a detection count and
    /// that every box carries at least the seven standard components.
    pub fn validate(&self, frame_id: usize) -> DetectResult<usize> {
        let boxes = self.pred_boxes.nrows();
        let box_width = self.pred_boxes.ncols();
        let scores = self.pred_scores.len();
        let labels = self.pred_labels.len();

        if boxes != scores || boxes != labels || (boxes > 0 && box_width < BOX_WIDTH) {
            return Err(DetectError::ShapeMismatch {
                frame_id,
                boxes,
                box_width,
                scores,
                labels,
            });
        }
        Ok(boxes)
    }

    pub fn detections(&self) -> impl Iterator<Item = Detection<'_>> {
        self.pred_boxes
            .rows()
            .into_iter()
            .zip(self.pred_scores.iter())
            .zip(self.pred_labels.iter())
            .map(|((bbox, &score), &label)| Detection { bbox, score, label })
    }
}
