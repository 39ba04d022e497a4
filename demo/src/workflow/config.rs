use anyhow::Context;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Detector configuration file. Only the class list is interpreted here;
/// the data and model sections are handed to the detector untouched.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DemoConfig {
    #[serde(rename = "CLASS_NAMES", alias = "class_names")]
    pub class_names: Vec<String>,
    #[serde(
        rename = "DATA_CONFIG",
        alias = "data_config",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub data_config: Option<serde_yaml::Value>,
    #[serde(
        rename = "MODEL",
        alias = "model",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub model: Option<serde_yaml::Value>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            class_names: vec!["Car".into(), "Pedestrian".into(), "Cyclist".into()],
            data_config: None,
            model: None,
        }
    }
}

impl DemoConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading detector config {}", path_ref.display()))?;
        let config: DemoConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing detector config {}", path_ref.display()))?;
        Ok(config)
    }

    /// Falls back to the KITTI class list when `path` does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        if path_ref.exists() {
            Self::load(path_ref)
        } else {
            warn!(
                "detector config {} not found, using default classes",
                path_ref.display()
            );
            Ok(Self::default())
        }
    }

    pub fn num_class(&self) -> usize {
        self.class_names.len()
    }
}
