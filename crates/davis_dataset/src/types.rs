//! Core types, error definitions, and data structures for davis_dataset.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Number of segmentation classes in this DAVIS variant.
pub const NUM_CLASSES: usize = 8;
/// Label value that loss computation must not score.
pub const IGNORE_INDEX: u8 = 255;

pub type DatasetResult<T> = Result<T, DavisDatasetError>;

#[derive(Debug, Error)]
pub enum DavisDatasetError {
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("config file error at {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("cannot read config file {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("sequence `{sequence}` has no directory at {path}")]
    MissingSequenceDir { sequence: String, path: PathBuf },
    #[error("sequence `{sequence}`: {path} has no matching image/label file")]
    UnpairedFile { sequence: String, path: PathBuf },
    #[error("sequence `{sequence}`: more than one file with stem `{stem}` in {dir}")]
    DuplicateStem {
        sequence: String,
        stem: String,
        dir: PathBuf,
    },
    #[error("json error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot read sample file {path}: {source}")]
    SampleIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("sample index {index} out of range for manifest of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("transform `{name}` failed on {path}: {msg}")]
    Transform {
        name: String,
        path: PathBuf,
        msg: String,
    },
}

/// Coarse classification of [`DavisDatasetError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid or missing configuration, detected before touching the dataset tree.
    Configuration,
    /// Filesystem layout problems found while building (or persisting) a manifest.
    ManifestBuild,
    /// Failures loading a sample from an already-built manifest.
    Load,
}

impl DavisDatasetError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) | Self::ConfigFile { .. } | Self::ConfigIo { .. } => {
                ErrorKind::Configuration
            }
            Self::Io { .. }
            | Self::MissingSequenceDir { .. }
            | Self::UnpairedFile { .. }
            | Self::DuplicateStem { .. }
            | Self::Json { .. } => ErrorKind::ManifestBuild,
            Self::SampleIo { .. } | Self::IndexOutOfRange { .. } | Self::Transform { .. } => {
                ErrorKind::Load
            }
        }
    }

    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    pub fn is_manifest_build(&self) -> bool {
        self.kind() == ErrorKind::ManifestBuild
    }
}

/// Dataset partition selecting which index file is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Val,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
        }
    }

    /// Name of the index file under `ImageSets/<year>/`.
    pub fn index_file_name(&self) -> String {
        format!("{}.txt", self.as_str())
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Split {
    type Err = DavisDatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "train" => Ok(Split::Train),
            "val" => Ok(Split::Val),
            _ => Err(DavisDatasetError::config(format!(
                "`split` should be one of ('train', 'val') in DAVIS dataset, but got `{s}`"
            ))),
        }
    }
}

/// How files inside a sequence directory are matched with their annotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairingMode {
    /// Match image and label files by file stem; unmatched files are an error.
    #[default]
    Stem,
    /// Pair the i-th image with the i-th label in sorted order, stopping at the shorter list.
    Positional,
}

impl FromStr for PairingMode {
    type Err = DavisDatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stem" => Ok(PairingMode::Stem),
            "positional" => Ok(PairingMode::Positional),
            _ => Err(DavisDatasetError::config(format!(
                "`pairing` should be one of ('stem', 'positional'), but got `{s}`"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleEntry {
    pub image_path: PathBuf,
    pub label_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub split: Split,
    pub year: u32,
    pub resolution: String,
    pub entries: Vec<SampleEntry>,
}

impl Manifest {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SampleEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SampleEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a SampleEntry;
    type IntoIter = std::slice::Iter<'a, SampleEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// One image/annotation pair read from disk, before and after transforms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSample {
    pub image_path: PathBuf,
    pub label_path: PathBuf,
    pub image: Vec<u8>,
    pub label: Vec<u8>,
    /// Passed through for downstream edge-map transforms.
    pub compute_edge: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceSummary {
    pub sequence: String,
    pub images: usize,
    pub labels: usize,
    pub paired: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestSummary {
    pub sequences: Vec<SequenceSummary>,
    pub total_images: usize,
    pub total_labels: usize,
    pub total_paired: usize,
}

impl ManifestSummary {
    /// Sequences whose image and label counts disagree.
    pub fn mismatched(&self) -> impl Iterator<Item = &SequenceSummary> {
        self.sequences.iter().filter(|s| s.images != s.labels)
    }
}
