use std::collections::BTreeMap;
use std::io::Write;

use tokio::sync::watch;

use crate::dataset::SampleSource;
use crate::detection::PredictionBundle;
use crate::prelude::{DetectResult, Detector};
use crate::recording::DetectionRecorder;
use crate::telemetry::{LogManager, MetricsRecorder, MetricsSnapshot};

/// Position of a run in its per-sample cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Loading(usize),
    Invoking(usize),
    Recording(usize),
    Done,
    /// Stop requested before sample `n` was loaded.
    Stopped(usize),
    /// Failure while handling sample `n`.
    Aborted(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub samples: usize,
    pub rows: usize,
    pub state: RunState,
}

impl RunSummary {
    pub fn stopped(&self) -> bool {
        matches!(self.state, RunState::Stopped(_))
    }
}

/// Sequential driver: load, invoke and record each sample in index order.
pub struct Pipeline {
    state: RunState,
    stop: Option<watch::Receiver<bool>>,
    class_names: Vec<String>,
    metrics: MetricsRecorder,
    logger: LogManager,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            state: RunState::Init,
            stop: None,
            class_names: Vec::new(),
            metrics: MetricsRecorder::new(),
            logger: LogManager::new(),
        }
    }

    /// Stop requests are only honoured between samples.
    pub fn with_stop_signal(mut self, stop: watch::Receiver<bool>) -> Self {
        self.stop = Some(stop);
        self
    }

    /// Names for 1-based detector labels, used in progress logs.
    pub fn with_class_names(mut self, class_names: Vec<String>) -> Self {
        self.class_names = class_names;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn run<D, W>(
        &mut self,
        source: &SampleSource,
        detector: &mut D,
        recorder: &mut DetectionRecorder<W>,
    ) -> DetectResult<RunSummary>
    where
        D: Detector + ?Sized,
        W: Write,
    {
        self.state = RunState::Init;
        self.logger
            .record(&format!("Total number of samples: \t{}", source.len()));

        let mut samples = 0;
        let mut rows = 0;
        for index in 0..source.len() {
            if self.stop_requested() {
                self.state = RunState::Stopped(index);
                self.logger
                    .warn(&format!("stop requested, halting before sample {}", index));
                break;
            }

            match self.step(index, source, detector, recorder) {
                Ok(written) => {
                    samples += 1;
                    rows += written;
                    self.metrics.record_sample(written);
                }
                Err(err) => {
                    self.state = RunState::Aborted(index);
                    self.metrics.record_error();
                    if let Err(flush_err) = recorder.flush() {
                        self.logger
                            .warn(&format!("flush after failure did not complete: {}", flush_err));
                    }
                    self.logger
                        .warn(&format!("aborting run at sample {}: {}", index, err));
                    return Err(err);
                }
            }
        }

        if !matches!(self.state, RunState::Stopped(_)) {
            self.state = RunState::Done;
        }
        recorder.flush()?;

        Ok(RunSummary {
            samples,
            rows,
            state: self.state,
        })
    }

    fn step<D, W>(
        &mut self,
        index: usize,
        source: &SampleSource,
        detector: &mut D,
        recorder: &mut DetectionRecorder<W>,
    ) -> DetectResult<usize>
    where
        D: Detector + ?Sized,
        W: Write,
    {
        self.state = RunState::Loading(index);
        self.logger
            .record(&format!("Visualized sample index: \t{}", index + 1));
        let record = source.record(index)?;
        self.logger.debug(&format!(
            "loaded {} point(s) from {}",
            record.points.len(),
            source.path(index)?.display()
        ));

        self.state = RunState::Invoking(index);
        let frame_id = record.frame_id;
        let bundle = recorder.infer(record, detector)?;

        self.state = RunState::Recording(index);
        self.log_class_counts(frame_id, &bundle);
        recorder.write_bundle(frame_id, &bundle)
    }

    fn stop_requested(&self) -> bool {
        self.stop.as_ref().map_or(false, |stop| *stop.borrow())
    }

    fn log_class_counts(&self, frame_id: usize, bundle: &PredictionBundle) {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for label in bundle.pred_labels.iter() {
            *counts.entry(self.class_name(*label)).or_default() += 1;
        }
        let summary = counts
            .iter()
            .map(|(name, count)| format!("{}: {}", name, count))
            .collect::<Vec<_>>()
            .join(", ");
        self.logger.record(&format!(
            "frame {} -> {} detection(s) [{}]",
            frame_id,
            bundle.len(),
            summary
        ));
    }

    fn class_name(&self, label: i64) -> String {
        usize::try_from(label)
            .ok()
            .and_then(|label| label.checked_sub(1))
            .and_then(|index| self.class_names.get(index))
            .cloned()
            .unwrap_or_else(|| format!("label {}", label))
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
