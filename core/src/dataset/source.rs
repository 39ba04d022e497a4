use std::path::{Path, PathBuf};

use glob::{glob_with, MatchOptions, Pattern};

use crate::dataset::format::SampleFormat;
use crate::prelude::{DetectError, DetectResult};
use crate::sample::{PointCloudSample, SampleRecord};
use crate::telemetry::log::LogManager;

/// Ordered list of point-cloud files resolved from a directory or a single file.
///
/// Index order is the lexicographic order of the paths and stays stable
/// between runs over the same inputs.
pub struct SampleSource {
    root: PathBuf,
    format: SampleFormat,
    files: Vec<PathBuf>,
}

impl SampleSource {
    /// Resolves `root` with a textual extension such as `".bin"`.
    pub fn open<P: AsRef<Path>>(root: P, ext: &str) -> DetectResult<Self> {
        let format = ext.parse::<SampleFormat>()?;
        Self::with_format(root, format)
    }

    pub fn with_format<P: AsRef<Path>>(root: P, format: SampleFormat) -> DetectResult<Self> {
        let root = root.as_ref().to_path_buf();
        let mut files = if root.is_dir() {
            enumerate(&root, format)?
        } else {
            vec![root.clone()]
        };
        files.sort();

        LogManager::new().debug(&format!(
            "resolved {} {} sample(s) under {}",
            files.len(),
            format,
            root.display()
        ));

        Ok(Self {
            root,
            format,
            files,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn path(&self, index: usize) -> DetectResult<&Path> {
        self.files
            .get(index)
            .map(PathBuf::as_path)
            .ok_or(DetectError::IndexOutOfRange {
                index,
                len: self.files.len(),
            })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn load(&self, index: usize) -> DetectResult<PointCloudSample> {
        let path = self.path(index)?;
        self.format.decode(path)
    }

    /// Loads sample `index` and tags it with its frame id.
    pub fn record(&self, index: usize) -> DetectResult<SampleRecord> {
        Ok(SampleRecord::new(self.load(index)?, index))
    }
}

fn enumerate(root: &Path, format: SampleFormat) -> DetectResult<Vec<PathBuf>> {
    let root_str = root.to_str().ok_or_else(|| DetectError::Io {
        path: root.to_path_buf(),
        source: std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "sample root is not valid UTF-8",
        ),
    })?;
    let pattern = format!("{}/*{}", Pattern::escape(root_str), format.extension());

    // `*` must not pick up hidden entries such as `._000001.bin`.
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };
    let entries = glob_with(&pattern, options).map_err(|err| DetectError::Io {
        path: root.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()),
    })?;

    entries
        .map(|entry| {
            entry.map_err(|err| {
                let path = err.path().to_path_buf();
                DetectError::Io {
                    path,
                    source: err.into(),
                }
            })
        })
        .collect()
}
