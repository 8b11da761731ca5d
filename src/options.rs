//! Sorting configuration of an [`Image`](crate::image::Image)

use crate::error::Result;
use crate::types::Dimension;
use serde::{Deserialize, Serialize};

/// How chunks are compared and sorted when assembling an image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageOptions {
    /// Properties that must be equal in every chunk of one image
    pub equal_props: Vec<String>,

    /// Secondary sort properties in registration order, the last one is tried first
    pub secondary_sort: Vec<String>,

    /// Chunks are never treated as having fewer axes than this
    pub min_indexing_dim: Dimension,

    /// Properties kept in a chunk when it is split for a list valued sort key
    pub protected_props: Vec<String>,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            equal_props: ["sequenceNumber", "rowVec", "columnVec", "sliceVec", "voxelSize"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            secondary_sort: vec!["acquisitionNumber".to_string(), "acquisitionTime".to_string()],
            min_indexing_dim: Dimension::Row,
            protected_props: vec!["source".to_string()],
        }
    }
}

impl ImageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the equal properties
    pub fn with_equal_props<S: Into<String>>(mut self, props: impl IntoIterator<Item = S>) -> Self {
        self.equal_props = props.into_iter().map(Into::into).collect();
        self
    }

    /// Register another secondary sort property with the highest priority
    pub fn with_secondary_sort(mut self, prop: impl Into<String>) -> Self {
        self.secondary_sort.push(prop.into());
        self
    }

    pub fn with_min_indexing_dim(mut self, dim: Dimension) -> Self {
        self.min_indexing_dim = dim;
        self
    }

    pub fn with_protected_prop(mut self, prop: impl Into<String>) -> Self {
        self.protected_props.push(prop.into());
        self
    }

    /// Load options from JSON, missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
