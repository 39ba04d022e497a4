use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use byteorder::{ByteOrder, LittleEndian};
use ndarray::Array2;
use ndarray_npy::read_npy;

use crate::prelude::{DetectError, DetectResult, POINT_WIDTH};
use crate::sample::PointCloudSample;

const POINT_BYTES: usize = POINT_WIDTH * std::mem::size_of::<f32>();

/// Point-cloud encodings that have a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// Headerless little-endian `f32` stream, four values per point.
    Bin,
    /// NumPy `.npy` array of shape `(N, 4)`.
    Npy,
}

impl SampleFormat {
    /// File extension including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            SampleFormat::Bin => ".bin",
            SampleFormat::Npy => ".npy",
        }
    }

    pub fn decode(&self, path: &Path) -> DetectResult<PointCloudSample> {
        match self {
            SampleFormat::Bin => decode_bin(path),
            SampleFormat::Npy => decode_npy(path),
        }
    }
}

impl FromStr for SampleFormat {
    type Err = DetectError;

    fn from_str(ext: &str) -> Result<Self, Self::Err> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "bin" => Ok(SampleFormat::Bin),
            "npy" => Ok(SampleFormat::Npy),
            _ => Err(DetectError::UnsupportedFormat(ext.to_string())),
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

fn decode_bin(path: &Path) -> DetectResult<PointCloudSample> {
    let bytes = fs::read(path).map_err(|source| DetectError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_bin_bytes(path, &bytes)
}

fn decode_bin_bytes(path: &Path, bytes: &[u8]) -> DetectResult<PointCloudSample> {
    if bytes.len() % POINT_BYTES != 0 {
        return Err(DetectError::Format {
            path: path.to_path_buf(),
            reason: format!(
                "{} bytes is not a multiple of the {}-byte point width",
                bytes.len(),
                POINT_BYTES
            ),
        });
    }

    let mut values = vec![0.0f32; bytes.len() / std::mem::size_of::<f32>()];
    LittleEndian::read_f32_into(bytes, &mut values);

    let rows = bytes.len() / POINT_BYTES;
    let points = Array2::from_shape_vec((rows, POINT_WIDTH), values).map_err(|err| {
        DetectError::Format {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }
    })?;

    PointCloudSample::from_array(points).ok_or_else(|| DetectError::Format {
        path: path.to_path_buf(),
        reason: "point matrix lost its width".into(),
    })
}

fn decode_npy(path: &Path) -> DetectResult<PointCloudSample> {
    let points: Array2<f32> = read_npy(path).map_err(|err| DetectError::Format {
        path: path.to_path_buf(),
        reason: err.to_string(),
    })?;

    let columns = points.ncols();
    PointCloudSample::from_array(points).ok_or_else(|| DetectError::Format {
        path: path.to_path_buf(),
        reason: format!("expected {} columns per point, found {}", POINT_WIDTH, columns),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use ndarray_npy::write_npy;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    fn encode(values: &[f32]) -> Vec<u8> {
        let mut bytes = vec![0u8; values.len() * 4];
        LittleEndian::write_f32_into(values, &mut bytes);
        bytes
    }

    #[test]
    fn format_parses_known_extensions() {
        assert_eq!(".bin".parse::<SampleFormat>().unwrap(), SampleFormat::Bin);
        assert_eq!("npy".parse::<SampleFormat>().unwrap(), SampleFormat::Npy);
        assert_eq!(".BIN".parse::<SampleFormat>().unwrap(), SampleFormat::Bin);
    }

    #[test]
    fn format_rejects_unknown_extension() {
        let err = ".pcd".parse::<SampleFormat>().unwrap_err();
        assert!(matches!(err, DetectError::UnsupportedFormat(ext) if ext == ".pcd"));
    }

    #[test]
    fn bin_decodes_rows_of_four() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&encode(&[1.0, 2.0, 3.0, 0.5, -1.0, -2.0, -3.0, 0.75]))
            .unwrap();

        let sample = SampleFormat::Bin.decode(file.path()).unwrap();
        assert_eq!(
            sample.view(),
            array![[1.0, 2.0, 3.0, 0.5], [-1.0, -2.0, -3.0, 0.75]]
        );
    }

    #[test]
    fn bin_rejects_lengths_off_the_point_width() {
        for len in [1usize, 4, 15, 17, 20, 36] {
            let err = decode_bin_bytes(Path::new("scan.bin"), &vec![0u8; len]).unwrap_err();
            assert!(matches!(err, DetectError::Format { .. }), "length {}", len);
        }
        for len in [0usize, 16, 48] {
            let sample = decode_bin_bytes(Path::new("scan.bin"), &vec![0u8; len]).unwrap();
            assert_eq!(sample.len(), len / 16);
        }
    }

    #[test]
    fn bin_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = SampleFormat::Bin
            .decode(&dir.path().join("missing.bin"))
            .unwrap_err();
        assert!(matches!(err, DetectError::Io { .. }));
    }

    #[test]
    fn npy_decodes_four_column_arrays() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scan.npy");
        write_npy(&path, &array![[1.0f32, 2.0, 3.0, 0.1]]).unwrap();

        let sample = SampleFormat::Npy.decode(&path).unwrap();
        assert_eq!(sample.len(), 1);
        assert_eq!(sample.point(0).unwrap()[3], 0.1);
    }

    #[test]
    fn npy_rejects_wrong_width() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scan.npy");
        write_npy(&path, &array![[1.0f32, 2.0, 3.0]]).unwrap();

        let err = SampleFormat::Npy.decode(&path).unwrap_err();
        assert!(matches!(err, DetectError::Format { .. }));
    }
}
