use std::sync::Mutex;

pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub samples: usize,
    pub rows: usize,
    pub errors: usize,
}

#[derive(Default)]
struct Metrics {
    samples: usize,
    rows: usize,
    errors: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics::default()),
        }
    }

    /// Counts one fully recorded sample and the rows it produced.
    pub fn record_sample(&self, rows: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.samples += 1;
            metrics.rows += rows;
        }
    }

    pub fn record_error(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.errors += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(metrics) = self.inner.lock() {
            MetricsSnapshot {
                samples: metrics.samples,
                rows: metrics.rows,
                errors: metrics.errors,
            }
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
