//! Image/annotation manifest building for the DAVIS video object segmentation dataset.
//!
//! This crate provides utilities for:
//! - Resolving the `ImageSets/`, `JPEGImages/` and `Annotations/` layout for a split
//! - Building an ordered manifest of image/label path pairs
//! - Loading manifest entries through a pluggable transform pipeline
//! - Constructing datasets by name through an explicit registry

// Module declarations
pub mod config;
pub mod dataset;
pub mod manifest;
pub mod registry;
pub mod transform;
pub mod types;

// Re-export public API
pub use config::DavisConfig;
pub use dataset::{DavisDataset, SegmentationDataset};
pub use manifest::{build_manifest, summarize_layout, DavisLayout};
pub use registry::{DatasetConstructor, DatasetRegistry};
pub use transform::{Transform, TransformPipeline, TransformPipelineBuilder};
pub use types::*;
