use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use csv::{Writer, WriterBuilder};

use crate::detection::PredictionBundle;
use crate::prelude::{DetectError, DetectResult, Detector};
use crate::recording::row::OutputRow;
use crate::sample::{SampleBatch, SampleRecord};
use crate::telemetry::log::LogManager;

/// Bundles expected back for a single-sample batch.
const BUNDLES_PER_CALL: usize = 1;

/// Runs one detector call per sample and appends the boxes to a run-wide
/// space-delimited file.
///
/// The underlying writer is flushed after every sample and again when the
/// recorder is dropped, so rows of completed samples survive a later failure.
pub struct DetectionRecorder<W: Write = File> {
    writer: Writer<W>,
    destination: PathBuf,
    rows_written: usize,
    logger: LogManager,
}

impl DetectionRecorder<File> {
    /// Opens `path` in truncate mode, creating parent directories as needed.
    pub fn create<P: AsRef<Path>>(path: P) -> DetectResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| DetectError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        let file = File::create(path).map_err(|source| DetectError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_writer(file, path))
    }
}

impl<W: Write> DetectionRecorder<W> {
    /// Wraps an arbitrary sink; `destination` is only used in error messages.
    pub fn from_writer<P: Into<PathBuf>>(sink: W, destination: P) -> Self {
        let writer = WriterBuilder::new()
            .delimiter(b' ')
            .has_headers(false)
            .flexible(true)
            .from_writer(sink);
        Self {
            writer,
            destination: destination.into(),
            rows_written: 0,
            logger: LogManager::new(),
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Invokes the detector on `record` and persists its detections.
    /// Returns the number of rows written for this sample.
    pub fn process<D: Detector + ?Sized>(
        &mut self,
        record: SampleRecord,
        detector: &mut D,
    ) -> DetectResult<usize> {
        let frame_id = record.frame_id;
        let bundle = self.infer(record, detector)?;
        self.write_bundle(frame_id, &bundle)
    }

    /// Packages `record` as a batch of one, runs the detector and returns the
    /// validated bundle.
    pub fn infer<D: Detector + ?Sized>(
        &self,
        record: SampleRecord,
        detector: &mut D,
    ) -> DetectResult<PredictionBundle> {
        let frame_id = record.frame_id;
        let batch = SampleBatch::collate(vec![record]);
        let mut bundles = detector.infer(&batch)?;

        if bundles.len() != BUNDLES_PER_CALL {
            return Err(DetectError::Cardinality {
                frame_id,
                expected: BUNDLES_PER_CALL,
                actual: bundles.len(),
            });
        }

        let bundle = bundles.remove(0);
        bundle.validate(frame_id)?;
        Ok(bundle)
    }

    /// Appends one row per detection in `bundle`, then flushes.
    pub fn write_bundle(
        &mut self,
        frame_id: usize,
        bundle: &PredictionBundle,
    ) -> DetectResult<usize> {
        let count = bundle.validate(frame_id)?;

        for detection in bundle.detections() {
            let row = OutputRow::from_detection(frame_id, &detection);
            self.writer
                .write_record(row.fields())
                .map_err(|source| DetectError::Write {
                    path: self.destination.clone(),
                    source,
                })?;
            self.rows_written += 1;
        }
        self.flush()?;

        self.logger.debug(&format!(
            "frame {} -> {} row(s) appended to {}",
            frame_id,
            count,
            self.destination.display()
        ));
        Ok(count)
    }

    pub fn flush(&mut self) -> DetectResult<()> {
        self.writer.flush().map_err(|source| DetectError::Io {
            path: self.destination.clone(),
            source,
        })
    }

    /// Flushes and hands back the underlying sink.
    pub fn into_inner(self) -> DetectResult<W> {
        let destination = self.destination;
        self.writer.into_inner().map_err(|err| DetectError::Io {
            path: destination,
            source: err.into_error(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::PointCloudSample;
    use ndarray::{array, Array2};
    use tempfile::tempdir;

    fn record(frame_id: usize) -> SampleRecord {
        let points = PointCloudSample::from_array(array![[0.0, 1.0, 2.0, 0.5]]).unwrap();
        SampleRecord::new(points, frame_id)
    }

    fn stub<F>(detector: F) -> F
    where
        F: FnMut(&SampleBatch) -> DetectResult<Vec<PredictionBundle>>,
    {
        detector
    }

    fn recorder() -> DetectionRecorder<Vec<u8>> {
        DetectionRecorder::from_writer(Vec::new(), "memory")
    }

    fn output(recorder: DetectionRecorder<Vec<u8>>) -> String {
        String::from_utf8(recorder.into_inner().unwrap()).unwrap()
    }

    fn fields(line: &str) -> Vec<f32> {
        line.split(' ').map(|field| field.parse().unwrap()).collect()
    }

    #[test]
    fn process_writes_one_permuted_row_per_detection() {
        let boxes = array![
            [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 0.1],
            [-1.0, -2.0, -3.0, 0.4, 0.5, 0.6, -1.2],
            [10.0, 20.0, 0.5, 3.9, 1.6, 1.5, 3.1]
        ];
        let expected = boxes.clone();
        let mut detector = stub(move |batch| {
            assert_eq!(batch.batch_size(), 1);
            assert_eq!(batch.frame_ids(), vec![4]);
            Ok(vec![PredictionBundle::new(
                boxes.clone(),
                array![0.9, 0.5, 0.25],
                array![1, 2, 3],
            )])
        });

        let mut recorder = recorder();
        let rows = recorder.process(record(4), &mut detector).unwrap();
        assert_eq!(rows, 3);
        assert_eq!(recorder.rows_written(), 3);

        let text = output(recorder);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);

        for (i, line) in lines.iter().enumerate() {
            let values = fields(line);
            assert_eq!(values.len(), 15);
            assert_eq!(values[0], 4.0);
            assert_eq!(values[1], (i + 1) as f32);
            assert_eq!(&values[2..6], &[0.0f32; 4]);
            assert_eq!(values[14], 0.0);

            let b = expected.row(i);
            assert_eq!(
                &values[7..14],
                &[b[3], b[4], b[5], b[0], b[1], b[2], b[6]]
            );

            let restored = [
                values[10], values[11], values[12], values[7], values[8], values[9], values[13],
            ];
            assert_eq!(restored.to_vec(), b.to_vec());
        }
    }

    #[test]
    fn empty_bundle_writes_nothing() {
        let mut detector = stub(|_| Ok(vec![PredictionBundle::empty()]));
        let mut recorder = recorder();
        assert_eq!(recorder.process(record(0), &mut detector).unwrap(), 0);
        assert!(output(recorder).is_empty());
    }

    #[test]
    fn two_bundles_for_one_sample_is_cardinality_error() {
        let mut detector = stub(|_| {
            let bundle = PredictionBundle::new(Array2::zeros((1, 7)), array![0.5], array![1]);
            Ok(vec![bundle.clone(), bundle])
        });
        let mut recorder = recorder();
        let err = recorder.process(record(2), &mut detector).unwrap_err();
        assert!(matches!(
            err,
            DetectError::Cardinality {
                frame_id: 2,
                expected: 1,
                actual: 2
            }
        ));
        assert!(output(recorder).is_empty());
    }

    #[test]
    fn no_bundle_is_cardinality_error() {
        let mut detector = stub(|_| Ok(Vec::new()));
        let err = recorder().process(record(0), &mut detector).unwrap_err();
        assert!(matches!(err, DetectError::Cardinality { actual: 0, .. }));
    }

    #[test]
    fn mismatched_lengths_are_shape_errors() {
        let mut detector = stub(|_| {
            Ok(vec![PredictionBundle::new(
                Array2::zeros((3, 7)),
                array![0.1, 0.2, 0.3],
                array![1, 2],
            )])
        });
        let mut recorder = recorder();
        let err = recorder.process(record(0), &mut detector).unwrap_err();
        assert!(matches!(err, DetectError::ShapeMismatch { labels: 2, .. }));
        assert_eq!(recorder.rows_written(), 0);
    }

    #[test]
    fn detector_errors_propagate_unchanged() {
        let mut detector = stub(|_| Err(DetectError::Detector("device lost".to_string())));
        let err = recorder().process(record(0), &mut detector).unwrap_err();
        assert!(matches!(err, DetectError::Detector(msg) if msg == "device lost"));
    }

    #[test]
    fn create_truncates_and_keeps_flushed_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("res").join("seq_000008.csv");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "stale contents\n").unwrap();

        let mut good = stub(|_| {
            Ok(vec![PredictionBundle::new(
                array![[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 0.5]],
                array![0.75],
                array![1],
            )])
        });
        let mut bad = stub(|_| Ok(vec![]));

        let mut recorder = DetectionRecorder::create(&path).unwrap();
        recorder.process(record(0), &mut good).unwrap();
        assert!(recorder.process(record(1), &mut bad).is_err());

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "0 1 0 0 0 0 0.75 4 5 6 1 2 3 0.5 0\n");
        drop(recorder);
    }
}
