//! Name-keyed factory for constructing datasets at startup.

use crate::config::DavisConfig;
use crate::dataset::{DavisDataset, SegmentationDataset};
use crate::types::{DatasetResult, DavisDatasetError};
use std::collections::BTreeMap;

pub type DatasetConstructor =
    Box<dyn Fn(DavisConfig) -> DatasetResult<Box<dyn SegmentationDataset>> + Send + Sync>;

/// Registry of dataset constructors. Lookups are case-insensitive.
#[derive(Default)]
pub struct DatasetRegistry {
    constructors: BTreeMap<String, DatasetConstructor>,
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the datasets shipped by this crate.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(DavisDataset::NAME, |cfg| {
            Ok(Box::new(DavisDataset::new(cfg)?) as Box<dyn SegmentationDataset>)
        });
        registry
    }

    /// Register `ctor` under `name`, replacing any previous constructor with that name.
    pub fn register<F>(&mut self, name: &str, ctor: F)
    where
        F: Fn(DavisConfig) -> DatasetResult<Box<dyn SegmentationDataset>> + Send + Sync + 'static,
    {
        self.constructors
            .insert(name.to_ascii_lowercase(), Box::new(ctor));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(&name.to_ascii_lowercase())
    }

    pub fn names(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    pub fn build(&self, name: &str, config: DavisConfig) -> DatasetResult<Box<dyn SegmentationDataset>> {
        let ctor = self
            .constructors
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| {
                DavisDatasetError::config(format!(
                    "unknown dataset `{name}` (registered: {})",
                    self.names().join(", ")
                ))
            })?;
        ctor(config)
    }
}

impl std::fmt::Debug for DatasetRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetRegistry")
            .field("names", &self.names())
            .finish()
    }
}
