//! Resolving the DAVIS directory layout and building image/annotation manifests.

use crate::config::DavisConfig;
use crate::types::{
    DatasetResult, DavisDatasetError, Manifest, ManifestSummary, PairingMode, SampleEntry,
    SequenceSummary, Split,
};
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Resolved paths for one split/year/resolution of a DAVIS root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DavisLayout {
    pub index_file: PathBuf,
    pub image_root: PathBuf,
    pub label_root: PathBuf,
}

impl DavisLayout {
    pub fn resolve(root: &Path, split: Split, year: u32, resolution: &str) -> Self {
        Self {
            index_file: root
                .join("ImageSets")
                .join(year.to_string())
                .join(split.index_file_name()),
            image_root: root.join("JPEGImages").join(resolution),
            label_root: root.join("Annotations").join(resolution),
        }
    }

    /// Sequence identifiers listed in the index file, in file order. Blank lines are skipped.
    pub fn read_sequence_ids(&self) -> DatasetResult<Vec<String>> {
        let raw = fs::read_to_string(&self.index_file)
            .map_err(|e| DavisDatasetError::io(&self.index_file, e))?;
        Ok(raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    pub fn image_dir(&self, sequence: &str) -> PathBuf {
        self.image_root.join(sequence)
    }

    pub fn label_dir(&self, sequence: &str) -> PathBuf {
        self.label_root.join(sequence)
    }
}

/// Regular, non-hidden files of a sequence directory, sorted by file name.
fn list_sequence_dir(sequence: &str, dir: &Path) -> DatasetResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(DavisDatasetError::MissingSequenceDir {
            sequence: sequence.to_string(),
            path: dir.to_path_buf(),
        });
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| DavisDatasetError::io(dir, e))? {
        let entry = entry.map_err(|e| DavisDatasetError::io(dir, e))?;
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if hidden || !path.is_file() {
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}

fn pair_positional(sequence: &str, images: Vec<PathBuf>, labels: Vec<PathBuf>) -> Vec<SampleEntry> {
    if images.len() != labels.len() {
        warn!(
            sequence,
            images = images.len(),
            labels = labels.len(),
            "image/label counts differ; trailing files are dropped"
        );
    }
    images
        .into_iter()
        .zip(labels)
        .map(|(image_path, label_path)| SampleEntry {
            image_path,
            label_path,
        })
        .collect()
}

fn stem_of(path: &Path) -> OsString {
    path.file_stem().map(OsStr::to_os_string).unwrap_or_default()
}

fn index_by_stem(
    sequence: &str,
    dir: &Path,
    files: &[PathBuf],
) -> DatasetResult<BTreeMap<OsString, PathBuf>> {
    let mut by_stem = BTreeMap::new();
    for path in files {
        let stem = stem_of(path);
        if by_stem.contains_key(&stem) {
            return Err(DavisDatasetError::DuplicateStem {
                sequence: sequence.to_string(),
                stem: stem.to_string_lossy().into_owned(),
                dir: dir.to_path_buf(),
            });
        }
        by_stem.insert(stem, path.clone());
    }
    Ok(by_stem)
}

/// Pairs follow the sorted image listing; every label must be claimed by one image.
fn pair_by_stem(
    sequence: &str,
    layout: &DavisLayout,
    images: Vec<PathBuf>,
    labels: Vec<PathBuf>,
) -> DatasetResult<Vec<SampleEntry>> {
    index_by_stem(sequence, &layout.image_dir(sequence), &images)?;
    let mut labels = index_by_stem(sequence, &layout.label_dir(sequence), &labels)?;
    let mut pairs = Vec::with_capacity(images.len());
    for image_path in images {
        let Some(label_path) = labels.remove(&stem_of(&image_path)) else {
            return Err(DavisDatasetError::UnpairedFile {
                sequence: sequence.to_string(),
                path: image_path,
            });
        };
        pairs.push(SampleEntry {
            image_path,
            label_path,
        });
    }
    if let Some((_, orphan)) = labels.into_iter().next() {
        return Err(DavisDatasetError::UnpairedFile {
            sequence: sequence.to_string(),
            path: orphan,
        });
    }
    Ok(pairs)
}

/// Build the ordered image/annotation manifest described by `config`.
///
/// The configuration is validated before the filesystem is touched. Any missing index
/// file, missing sequence directory or (in stem mode) unmatched file aborts the build.
pub fn build_manifest(config: &DavisConfig) -> DatasetResult<Manifest> {
    let split = config.validate()?;
    build_validated(config, split)
}

pub(crate) fn build_validated(config: &DavisConfig, split: Split) -> DatasetResult<Manifest> {
    let layout = DavisLayout::resolve(&config.dataset_root, split, config.year, &config.resolution);
    let sequences = layout.read_sequence_ids()?;

    let mut entries = Vec::new();
    for sequence in &sequences {
        let images = list_sequence_dir(sequence, &layout.image_dir(sequence))?;
        let labels = list_sequence_dir(sequence, &layout.label_dir(sequence))?;
        let pairs = match config.pairing {
            PairingMode::Positional => pair_positional(sequence, images, labels),
            PairingMode::Stem => pair_by_stem(sequence, &layout, images, labels)?,
        };
        debug!(sequence = sequence.as_str(), pairs = pairs.len(), "indexed sequence");
        entries.extend(pairs);
    }

    info!(
        root = %config.dataset_root.display(),
        split = %split,
        year = config.year,
        resolution = config.resolution.as_str(),
        sequences = sequences.len(),
        samples = entries.len(),
        "built DAVIS manifest"
    );
    Ok(Manifest {
        split,
        year: config.year,
        resolution: config.resolution.clone(),
        entries,
    })
}

/// Count image and annotation files per sequence without pairing them.
///
/// `paired` is the number of entries positional pairing would produce, so mismatched
/// sequences show up here instead of failing a stem-mode build.
pub fn summarize_layout(config: &DavisConfig) -> DatasetResult<ManifestSummary> {
    let split = config.validate()?;
    let layout = DavisLayout::resolve(&config.dataset_root, split, config.year, &config.resolution);
    let mut summary = ManifestSummary::default();
    for sequence in layout.read_sequence_ids()? {
        let images = list_sequence_dir(&sequence, &layout.image_dir(&sequence))?.len();
        let labels = list_sequence_dir(&sequence, &layout.label_dir(&sequence))?.len();
        let paired = images.min(labels);
        summary.total_images += images;
        summary.total_labels += labels;
        summary.total_paired += paired;
        summary.sequences.push(SequenceSummary {
            sequence,
            images,
            labels,
            paired,
        });
    }
    Ok(summary)
}

impl Manifest {
    pub fn save_json(&self, path: &Path) -> DatasetResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| DavisDatasetError::io(parent, e))?;
        }
        let raw = serde_json::to_vec_pretty(self).map_err(|source| DavisDatasetError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, raw).map_err(|e| DavisDatasetError::io(path, e))
    }

    pub fn load_json(path: &Path) -> DatasetResult<Self> {
        let raw = fs::read(path).map_err(|e| DavisDatasetError::io(path, e))?;
        serde_json::from_slice(&raw).map_err(|source| DavisDatasetError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}
