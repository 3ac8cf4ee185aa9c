//! Dataset record exposing a built manifest to training/evaluation loops.

use crate::config::DavisConfig;
use crate::manifest::build_validated;
use crate::transform::TransformPipeline;
use crate::types::{
    DatasetResult, DavisDatasetError, LoadedSample, Manifest, SampleEntry, Split, IGNORE_INDEX,
    NUM_CLASSES,
};
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Segmentation dataset as seen by a training loop: a manifest plus the metadata
/// needed to score predictions and load samples.
pub trait SegmentationDataset: Send + Sync {
    fn name(&self) -> &str;
    fn manifest(&self) -> &Manifest;
    fn num_classes(&self) -> usize;
    fn ignore_index(&self) -> u8;
    fn compute_edge(&self) -> bool;
    fn load(&self, index: usize) -> DatasetResult<LoadedSample>;

    fn len(&self) -> usize {
        self.manifest().len()
    }

    fn is_empty(&self) -> bool {
        self.manifest().is_empty()
    }
}

#[derive(Debug)]
pub struct DavisDataset {
    pub num_classes: usize,
    pub ignore_index: u8,
    config: DavisConfig,
    split: Split,
    transforms: TransformPipeline,
    manifest: Manifest,
}

impl DavisDataset {
    pub const NAME: &'static str = "davis";

    /// Validate `config` and build the manifest. Nothing is returned on failure.
    ///
    /// The pipeline moves out of `config`, so [`DavisDataset::config`] reports no transforms;
    /// use [`DavisDataset::transforms`] instead.
    pub fn new(mut config: DavisConfig) -> DatasetResult<Self> {
        let split = config.validate()?;
        let manifest = build_validated(&config, split)?;
        let transforms = config.transforms.take().unwrap_or_default();
        info!(
            split = %split,
            samples = manifest.len(),
            transforms = transforms.describe().as_str(),
            edge = config.compute_edge,
            "DAVIS dataset ready"
        );
        Ok(Self {
            num_classes: NUM_CLASSES,
            ignore_index: IGNORE_INDEX,
            config,
            split,
            transforms,
            manifest,
        })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn config(&self) -> &DavisConfig {
        &self.config
    }

    pub fn split(&self) -> Split {
        self.split
    }

    pub fn year(&self) -> u32 {
        self.config.year
    }

    pub fn resolution(&self) -> &str {
        &self.config.resolution
    }

    pub fn compute_edge(&self) -> bool {
        self.config.compute_edge
    }

    pub fn transforms(&self) -> &TransformPipeline {
        &self.transforms
    }

    pub fn len(&self) -> usize {
        self.manifest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifest.is_empty()
    }

    /// Read the `index`-th pair from disk and run it through the transform pipeline.
    pub fn get(&self, index: usize) -> DatasetResult<LoadedSample> {
        let entry = self
            .manifest
            .get(index)
            .ok_or(DavisDatasetError::IndexOutOfRange {
                index,
                len: self.manifest.len(),
            })?;
        let sample = self.read_entry(entry)?;
        self.transforms.apply(sample)
    }

    pub fn iter(&self) -> impl Iterator<Item = DatasetResult<LoadedSample>> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    fn read_entry(&self, entry: &SampleEntry) -> DatasetResult<LoadedSample> {
        let read = |path: &PathBuf| {
            fs::read(path).map_err(|source| DavisDatasetError::SampleIo {
                path: path.clone(),
                source,
            })
        };
        let image = read(&entry.image_path)?;
        let label = read(&entry.label_path)?;
        Ok(LoadedSample {
            image_path: entry.image_path.clone(),
            label_path: entry.label_path.clone(),
            image,
            label,
            compute_edge: self.config.compute_edge,
        })
    }
}

impl SegmentationDataset for DavisDataset {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn ignore_index(&self) -> u8 {
        self.ignore_index
    }

    fn compute_edge(&self) -> bool {
        self.config.compute_edge
    }

    fn load(&self, index: usize) -> DatasetResult<LoadedSample> {
        self.get(index)
    }
}
