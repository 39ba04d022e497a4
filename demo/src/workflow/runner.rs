use crate::workflow::config::DemoConfig;
use crate::workflow::paths::RunPaths;
use anyhow::Context;
use detcore::dataset::{SampleFormat, SampleSource};
use detcore::detection::ReplayDetector;
use detcore::recording::DetectionRecorder;
use detcore::{Pipeline, RunSummary};
use log::{debug, info, warn};
use std::path::PathBuf;
use tokio::sync::watch;

/// Everything a single demo run needs, resolved from the command line.
#[derive(Clone, Debug)]
pub struct RunSettings {
    pub data_root: PathBuf,
    pub file_number: String,
    pub format: SampleFormat,
    pub res: PathBuf,
    /// Recorded predictions replayed in place of the network.
    pub ckpt: Option<PathBuf>,
}

pub struct Runner {
    config: DemoConfig,
    settings: RunSettings,
}

impl Runner {
    pub fn new(config: DemoConfig, settings: RunSettings) -> Self {
        Self { config, settings }
    }

    pub fn paths(&self) -> RunPaths {
        RunPaths::new(
            &self.settings.data_root,
            &self.settings.file_number,
            self.settings.format,
            &self.settings.res,
        )
    }

    pub fn execute(&self, stop: Option<watch::Receiver<bool>>) -> anyhow::Result<RunSummary> {
        let paths = self.paths();
        info!("data_path: {}", paths.point_cloud.display());
        info!("img_path: {}", paths.image.display());
        info!("calib_path: {}", paths.calib.display());
        debug!("res_img: {}", paths.result_image.display());
        debug!(
            "detector sections: data_config={:?} model={:?}",
            self.config.data_config, self.config.model
        );

        let source = SampleSource::with_format(&paths.point_cloud, self.settings.format)
            .with_context(|| format!("resolving samples at {}", paths.point_cloud.display()))?;

        info!(
            "building detector for {} class(es): {}",
            self.config.num_class(),
            self.config.class_names.join(", ")
        );
        let mut detector = match &self.settings.ckpt {
            Some(ckpt) => {
                let detector = ReplayDetector::load(ckpt)
                    .with_context(|| format!("loading predictions from {}", ckpt.display()))?;
                info!(
                    "replaying predictions for {} frame(s) from {}",
                    detector.frame_count(),
                    ckpt.display()
                );
                detector
            }
            None => {
                warn!("no checkpoint given, every sample will report zero detections");
                ReplayDetector::empty()
            }
        };

        let mut recorder = DetectionRecorder::create(&paths.result_sequence).with_context(|| {
            format!(
                "opening detection output {}",
                paths.result_sequence.display()
            )
        })?;

        let mut pipeline = Pipeline::new().with_class_names(self.config.class_names.clone());
        if let Some(stop) = stop {
            pipeline = pipeline.with_stop_signal(stop);
        }

        let summary = pipeline
            .run(&source, &mut detector, &mut recorder)
            .with_context(|| format!("running detection over {}", source.root().display()))?;

        let metrics = pipeline.metrics();
        info!(
            "recorded {} row(s) for {} sample(s) into {}",
            metrics.rows,
            metrics.samples,
            recorder.destination().display()
        );
        Ok(summary)
    }
}
