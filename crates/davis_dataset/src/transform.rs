//! Per-sample transform pipeline applied after a manifest entry is loaded.

use crate::types::{DatasetResult, LoadedSample};
use std::fmt;
use std::sync::Arc;

/// One step of a [`TransformPipeline`].
///
/// Implementations receive the raw bytes of an image/annotation pair and return the
/// (possibly rewritten) sample. Decoding and augmentation live in the implementor.
pub trait Transform: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;
    fn apply(&self, sample: LoadedSample) -> DatasetResult<LoadedSample>;
}

/// Ordered composition of transforms. An empty pipeline passes samples through unchanged.
#[derive(Clone, Default)]
pub struct TransformPipeline {
    steps: Vec<Arc<dyn Transform>>,
}

impl TransformPipeline {
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn builder() -> TransformPipelineBuilder {
        TransformPipelineBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn apply(&self, sample: LoadedSample) -> DatasetResult<LoadedSample> {
        self.steps
            .iter()
            .try_fold(sample, |sample, step| step.apply(sample))
    }

    pub fn describe(&self) -> String {
        if self.steps.is_empty() {
            return "identity".to_string();
        }
        self.steps
            .iter()
            .map(|s| s.name())
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

impl fmt::Debug for TransformPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformPipeline")
            .field("steps", &self.describe())
            .finish()
    }
}

pub struct TransformPipelineBuilder {
    inner: TransformPipeline,
}

impl Default for TransformPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformPipelineBuilder {
    pub fn new() -> Self {
        Self {
            inner: TransformPipeline::default(),
        }
    }
    pub fn push<T: Transform + 'static>(mut self, step: T) -> Self {
        self.inner.steps.push(Arc::new(step));
        self
    }
    pub fn push_shared(mut self, step: Arc<dyn Transform>) -> Self {
        self.inner.steps.push(step);
        self
    }
    pub fn build(self) -> TransformPipeline {
        self.inner
    }
}
