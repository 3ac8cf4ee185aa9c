//! Dataset configuration and TOML config-file loading.

use crate::transform::TransformPipeline;
use crate::types::{DatasetResult, DavisDatasetError, PairingMode, Split};
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_NAME: &str = "davis-dataset.toml";
const CONFIG_ENV: &str = "DAVIS_DATASET_CONFIG";
pub const DEFAULT_YEAR: u32 = 2017;
pub const DEFAULT_RESOLUTION: &str = "480p";

#[derive(Debug, Clone)]
pub struct DavisConfig {
    /// Top-level directory holding `ImageSets/`, `JPEGImages/` and `Annotations/`.
    pub dataset_root: PathBuf,
    /// Requested split as supplied by the caller; checked and lowercased by [`DavisConfig::validate`].
    pub split: String,
    /// Challenge year, selects `ImageSets/<year>/`.
    pub year: u32,
    /// Resolution variant, selects `JPEGImages/<resolution>/` and `Annotations/<resolution>/`.
    pub resolution: String,
    /// Whether downstream transforms should compute edge maps. Not used when building.
    pub compute_edge: bool,
    pub pairing: PairingMode,
    /// Pipeline applied to each loaded sample. Required; `None` fails validation.
    pub transforms: Option<TransformPipeline>,
}

impl Default for DavisConfig {
    fn default() -> Self {
        Self {
            dataset_root: PathBuf::from("data/DAVIS"),
            split: Split::Train.as_str().to_string(),
            year: DEFAULT_YEAR,
            resolution: DEFAULT_RESOLUTION.to_string(),
            compute_edge: false,
            pairing: PairingMode::default(),
            transforms: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DavisConfigFile {
    dataset_root: Option<String>,
    split: Option<String>,
    year: Option<u32>,
    resolution: Option<String>,
    edge: Option<bool>,
    pairing: Option<PairingMode>,
}

impl DavisConfig {
    pub fn new(dataset_root: impl Into<PathBuf>, split: impl Into<String>) -> Self {
        Self {
            dataset_root: dataset_root.into(),
            split: split.into(),
            ..Self::default()
        }
    }

    pub fn with_year(mut self, year: u32) -> Self {
        self.year = year;
        self
    }

    pub fn with_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = resolution.into();
        self
    }

    pub fn with_edge(mut self, compute_edge: bool) -> Self {
        self.compute_edge = compute_edge;
        self
    }

    pub fn with_pairing(mut self, pairing: PairingMode) -> Self {
        self.pairing = pairing;
        self
    }

    pub fn with_transforms(mut self, transforms: TransformPipeline) -> Self {
        self.transforms = Some(transforms);
        self
    }

    /// Checks the split name and the presence of a transform pipeline, in that order.
    pub fn validate(&self) -> DatasetResult<Split> {
        let split: Split = self.split.parse()?;
        if self.transforms.is_none() {
            return Err(DavisDatasetError::config(
                "`transforms` is necessary, but it is None",
            ));
        }
        Ok(split)
    }

    /// Load from the file named by `DAVIS_DATASET_CONFIG`, else `davis-dataset.toml`
    /// in the working directory, else defaults.
    pub fn load_default() -> DatasetResult<Self> {
        match config_file_path(std::env::var_os(CONFIG_ENV), Path::new(".")) {
            Some(path) => Self::from_path(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_path(path: &Path) -> DatasetResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| DavisDatasetError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw).map_err(|source| DavisDatasetError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })
    }

    fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        let file: DavisConfigFile = toml::from_str(raw)?;
        Ok(Self::from_file(file))
    }

    fn from_file(file: DavisConfigFile) -> Self {
        let defaults = Self::default();
        DavisConfig {
            dataset_root: file
                .dataset_root
                .map(|v| expand_path(&v))
                .unwrap_or(defaults.dataset_root),
            split: file.split.unwrap_or(defaults.split),
            year: file.year.unwrap_or(defaults.year),
            resolution: file
                .resolution
                .filter(|r| !r.trim().is_empty())
                .unwrap_or(defaults.resolution),
            compute_edge: file.edge.unwrap_or(defaults.compute_edge),
            pairing: file.pairing.unwrap_or(defaults.pairing),
            transforms: None,
        }
    }
}

/// Config file to load: the env override if set, else `davis-dataset.toml` under `dir` if present.
fn config_file_path(env_value: Option<OsString>, dir: &Path) -> Option<PathBuf> {
    if let Some(path) = env_value.filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(path));
    }
    let local = dir.join(DEFAULT_CONFIG_NAME);
    local.exists().then_some(local)
}

fn expand_path(raw: &str) -> PathBuf {
    let mut out = raw.to_string();
    if let Some(stripped) = out.strip_prefix('~') {
        if let Ok(home) = std::env::var("HOME") {
            out = format!("{home}{stripped}");
        }
    }
    PathBuf::from(expand_env(&out))
}

fn expand_env(input: &str) -> String {
    let mut out = String::new();
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = &after[..end];
        match std::env::var(key) {
            Ok(val) => out.push_str(&val),
            Err(_) => out.push_str(&rest[start..start + end + 3]),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}
