use detcore::dataset::SampleFormat;
use std::path::{Path, PathBuf};

/// Per-modality locations derived from a data root and a file number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub point_cloud: PathBuf,
    pub image: PathBuf,
    pub calib: PathBuf,
    pub result_image: PathBuf,
    /// Run-wide detection rows, `seq_<file_number>.csv`.
    pub result_sequence: PathBuf,
}

impl RunPaths {
    pub fn new(data_root: &Path, file_number: &str, format: SampleFormat, res: &Path) -> Self {
        Self {
            point_cloud: data_root
                .join("velodyne")
                .join(format!("{}{}", file_number, format.extension())),
            image: data_root.join("image_2").join(format!("{}.png", file_number)),
            calib: data_root.join("calib").join(format!("{}.txt", file_number)),
            result_image: res.join(format!("{}.png", file_number)),
            result_sequence: res.join(format!("seq_{}.csv", file_number)),
        }
    }
}
