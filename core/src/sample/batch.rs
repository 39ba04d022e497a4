use ndarray::{s, Array2};

use crate::prelude::POINT_WIDTH;
use crate::sample::record::SampleRecord;

/// Packaged form of one or more records, as handed to a detector.
///
/// Collation never touches the records themselves; it only adds derived
/// fields next to them.
#[derive(Debug, Clone)]
pub struct SampleBatch {
    records: Vec<SampleRecord>,
    collated_points: Array2<f32>,
}

impl SampleBatch {
    /// Stacks the points of every record into a single matrix whose first
    /// column is the record's position within the batch.
    pub fn collate(records: Vec<SampleRecord>) -> Self {
        let total: usize = records.iter().map(|record| record.points.len()).sum();
        let mut collated_points = Array2::<f32>::zeros((total, POINT_WIDTH + 1));

        let mut offset = 0;
        for (batch_index, record) in records.iter().enumerate() {
            let rows = record.points.len();
            let mut block = collated_points.slice_mut(s![offset..offset + rows, ..]);
            block.column_mut(0).fill(batch_index as f32);
            block.slice_mut(s![.., 1..]).assign(&record.points.view());
            offset += rows;
        }

        Self {
            records,
            collated_points,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }

    pub fn frame_ids(&self) -> Vec<usize> {
        self.records.iter().map(|record| record.frame_id).collect()
    }

    /// Points of all records with a leading batch-index column, `(sum N) x 5`.
    pub fn collated_points(&self) -> &Array2<f32> {
        &self.collated_points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::PointCloudSample;
    use ndarray::array;

    fn record(frame_id: usize, points: Array2<f32>) -> SampleRecord {
        SampleRecord::new(PointCloudSample::from_array(points).unwrap(), frame_id)
    }

    #[test]
    fn collate_prefixes_batch_index_and_keeps_records() {
        let first = record(3, array![[1.0, 2.0, 3.0, 0.5], [4.0, 5.0, 6.0, 0.25]]);
        let second = record(4, array![[7.0, 8.0, 9.0, 1.0]]);
        let batch = SampleBatch::collate(vec![first.clone(), second.clone()]);

        assert_eq!(batch.batch_size(), 2);
        assert_eq!(batch.frame_ids(), vec![3, 4]);
        assert_eq!(batch.records()[0], first);
        assert_eq!(batch.records()[1], second);
        assert_eq!(
            batch.collated_points(),
            &array![
                [0.0, 1.0, 2.0, 3.0, 0.5],
                [0.0, 4.0, 5.0, 6.0, 0.25],
                [1.0, 7.0, 8.0, 9.0, 1.0]
            ]
        );
    }

    #[test]
    fn collate_handles_empty_cloud() {
        let empty = record(0, Array2::zeros((0, 4)));
        let batch = SampleBatch::collate(vec![empty]);
        assert_eq!(batch.batch_size(), 1);
        assert_eq!(batch.collated_points().dim(), (0, 5));
    }
}
