use anyhow::{ensure, Result};
use geo::MultiPolygon;

use crate::types::AttrValue;

/// One feature of a source layer; `values` is aligned with the layer's fields.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFeature {
    pub geometry: Option<MultiPolygon<f64>>,
    pub values:   Vec<AttrValue>,
}

/// A per-country boundary layer as published, before any normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceLayer {
    fields:   Vec<String>,
    features: Vec<SourceFeature>,
}

impl SourceLayer {
    /// Construct a layer, checking every feature carries one value per field.
    pub fn new(fields: Vec<String>, features: Vec<SourceFeature>) -> Result<Self> {
        for (row, feature) in features.iter().enumerate() {
            ensure!(feature.values.len() == fields.len(),
                "[types::layer] row {row} has {} values for {} fields", feature.values.len(), fields.len());
        }
        Ok(Self { fields, features })
    }

    #[inline] pub fn fields(&self) -> &[String] { &self.fields }

    #[inline] pub fn features(&self) -> &[SourceFeature] { &self.features }

    #[inline] pub fn len(&self) -> usize { self.features.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.features.is_empty() }

    /// Position of a field by exact name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }

    /// Values of one column in row order.
    pub fn column(&self, idx: usize) -> Vec<AttrValue> {
        self.features.iter()
            .map(|f| f.values.get(idx).cloned().unwrap_or(AttrValue::Null))
            .collect()
    }

    /// Drop features without geometry (or with an empty one), returning how many were dropped.
    pub fn drop_null_geometries(&mut self) -> usize {
        let before = self.features.len();
        self.features.retain(|f| f.geometry.as_ref().is_some_and(|g| !g.0.is_empty()));
        before - self.features.len()
    }
}
