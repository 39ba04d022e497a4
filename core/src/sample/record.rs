use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::prelude::POINT_WIDTH;

/// Decoded point cloud: one row per point, columns `x, y, z, intensity`.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloudSample {
    points: Array2<f32>,
}

impl PointCloudSample {
    /// Wraps a point matrix. Returns `None` when the matrix is not `N x 4`.
    pub fn from_array(points: Array2<f32>) -> Option<Self> {
        (points.ncols() == POINT_WIDTH).then_some(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.points.nrows() == 0
    }

    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.points.view()
    }

    pub fn point(&self, index: usize) -> Option<ArrayView1<'_, f32>> {
        (index < self.len()).then(|| self.points.row(index))
    }
}

/// A loaded sample tagged with its position in the run.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRecord {
    pub points: PointCloudSample,
    pub frame_id: usize,
}

impl SampleRecord {
    pub fn new(points: PointCloudSample, frame_id: usize) -> Self {
        Self { points, frame_id }
    }
}
