//! Reconciliation of a country's subdivisions with its canonical outline.
//!
//! The outline (admin0 polygons minus lakes) is authoritative. Subdivisions are
//! clipped to it, and the gaps between the clipped subdivisions and the outline
//! ("slivers") are handed to the subdivision they share the longest edge with.

use ahash::AHashMap;
use geo::{Area, BooleanOps, BoundingRect, MultiPolygon, Polygon, Rect};
use log::{debug, warn};

use crate::error::BoundaryError;
use crate::geom::{envelope_of, shared_boundary_length, union_all, Geometries};
use crate::types::Subdivision;

/// Shared-edge tolerance as a fraction of the outline's bounding diagonal.
/// Overlay output is snapped to a grid scaled to the input extent.
const EDGE_TOLERANCE_RATIO: f64 = 1e-7;

/// Smallest shared-edge tolerance, in degrees.
const MIN_EDGE_TOLERANCE: f64 = 1e-9;

// ---- Reference layers ----

/// One feature of the canonical admin0 layer.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineFeature {
    pub iso3:       Option<String>,
    /// Code used for disputed territories with no ISO3 of their own.
    pub color_code: Option<String>,
    pub geometry:   MultiPolygon<f64>,
}

/// The canonical admin0 layer.
#[derive(Debug, Clone)]
pub struct CountryOutlines {
    keys:  Vec<(Option<String>, Option<String>)>,
    geoms: Geometries,
}

impl CountryOutlines {
    pub fn new(features: Vec<OutlineFeature>) -> Self {
        let (keys, shapes): (Vec<_>, Vec<_>) = features.into_iter()
            .map(|f| ((f.iso3, f.color_code), f.geometry))
            .unzip();
        Self { keys, geoms: Geometries::new(shapes) }
    }

    #[inline] pub fn len(&self) -> usize { self.geoms.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.geoms.is_empty() }

    /// Polygons whose ISO3 or color code equals `code`.
    pub fn select(&self, code: &str) -> Vec<&MultiPolygon<f64>> {
        self.keys.iter().zip(self.geoms.shapes())
            .filter(|((iso3, color), _)| iso3.as_deref() == Some(code) || color.as_deref() == Some(code))
            .map(|(_, shape)| shape)
            .collect()
    }

    /// Bounding rectangle of everything matching `code`.
    pub fn extent(&self, code: &str) -> Option<Rect<f64>> {
        Geometries::new(self.select(code).into_iter().cloned().collect()).bounds()
    }
}

/// Lake polygons removed from every outline.
#[derive(Debug, Clone)]
pub struct WaterMask {
    geoms: Geometries,
}

impl WaterMask {
    pub fn new(lakes: Vec<MultiPolygon<f64>>) -> Self {
        Self { geoms: Geometries::new(lakes) }
    }

    /// An empty mask.
    pub fn none() -> Self { Self::new(Vec::new()) }

    #[inline] pub fn len(&self) -> usize { self.geoms.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.geoms.is_empty() }

    /// `shape` minus every lake whose bounds meet it.
    pub fn subtract_from(&self, shape: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        let Some(rect) = shape.bounding_rect() else { return shape.clone() };
        let lakes = self.geoms.query(&envelope_of(&rect, 0.0));
        if lakes.is_empty() { return shape.clone() }
        let water = union_all(lakes.into_iter().map(|i| self.geoms.shapes()[i].clone()));
        shape.difference(&water)
    }
}

// ---- Reconciliation ----

/// Outcome of reconciling one country.
#[derive(Debug, Clone)]
pub struct Reconciled {
    /// Clipped and repaired subdivisions, in input order.
    pub subdivisions:         Vec<Subdivision>,
    pub slivers_attached:     usize,
    pub slivers_dropped:      usize,
    /// Codes of subdivisions lying entirely outside the outline.
    pub dropped_subdivisions: Vec<String>,
}

pub struct BoundaryReconciler<'a> {
    outlines:       &'a CountryOutlines,
    water:          &'a WaterMask,
    edge_tolerance: Option<f64>,
}

impl<'a> BoundaryReconciler<'a> {
    pub fn new(outlines: &'a CountryOutlines, water: &'a WaterMask) -> Self {
        Self { outlines, water, edge_tolerance: None }
    }

    /// Use a fixed shared-edge tolerance (degrees) instead of one derived from the outline extent.
    pub fn with_edge_tolerance(mut self, tolerance: Option<f64>) -> Self {
        self.edge_tolerance = tolerance;
        self
    }

    /// Distance within which a sliver edge and a subdivision edge count as shared.
    pub fn edge_tolerance(&self, target: &MultiPolygon<f64>) -> f64 {
        if let Some(tolerance) = self.edge_tolerance { return tolerance }
        let diagonal = target.bounding_rect().map_or(0.0, |r| r.width().hypot(r.height()));
        (diagonal * EDGE_TOLERANCE_RATIO).max(MIN_EDGE_TOLERANCE)
    }

    /// Union of the outline polygons for `code`, minus water.
    pub fn target_outline(&self, code: &str) -> Result<MultiPolygon<f64>, BoundaryError> {
        let selected = self.outlines.select(code);
        if selected.is_empty() {
            return Err(BoundaryError::MissingOutline { code: code.to_string() });
        }
        let outline = union_all(selected.into_iter().cloned());
        Ok(self.water.subtract_from(&outline))
    }

    /// Clip `subdivisions` to the outline of `code` and fill the remaining gaps.
    pub fn reconcile(&self, code: &str, subdivisions: Vec<Subdivision>) -> Result<Reconciled, BoundaryError> {
        let degenerate = |reason: &str| BoundaryError::GeometryDegenerate { iso3: code.to_string(), reason: reason.to_string() };

        let target = self.target_outline(code)?;
        if target.unsigned_area() <= 0.0 {
            return Err(degenerate("outline has no area once water is removed"));
        }

        // Pieces inside the outline; the parts outside are discarded.
        let mut dropped_subdivisions = Vec::new();
        let mut kept: Vec<Subdivision> = Vec::with_capacity(subdivisions.len());
        for sub in subdivisions {
            let piece = sub.geometry.intersection(&target);
            if piece.0.is_empty() || piece.unsigned_area() <= 0.0 {
                warn!("[reconcile] {code}: subdivision {} lies outside the outline; dropped", sub.code);
                dropped_subdivisions.push(sub.code);
                continue;
            }
            kept.push(Subdivision { geometry: piece, ..sub });
        }
        if kept.is_empty() {
            return Err(degenerate("no subdivision overlaps the outline"));
        }

        // Slivers: the outline not covered by any piece.
        let pieces = Geometries::new(kept.iter().map(|s| s.geometry.clone()).collect());
        let slivers = target.difference(&pieces.union());
        let tolerance = self.edge_tolerance(&target);

        let mut attached: AHashMap<usize, Vec<Polygon<f64>>> = AHashMap::new();
        let mut slivers_dropped = 0;
        for sliver in slivers.0 {
            match nearest_piece(&pieces, &sliver, tolerance) {
                Some(idx) => attached.entry(idx).or_default().push(sliver),
                None => {
                    debug!("[reconcile] {code}: sliver of area {:.3e} shares no edge; dropped", sliver.unsigned_area());
                    slivers_dropped += 1;
                }
            }
        }
        let slivers_attached = attached.values().map(Vec::len).sum();
        debug!("[reconcile] {code}: {slivers_attached} slivers attached, {slivers_dropped} dropped");

        let subdivisions = kept.into_iter().enumerate()
            .map(|(idx, sub)| match attached.remove(&idx) {
                Some(extra) => {
                    let parts = std::iter::once(sub.geometry).chain(extra.into_iter().map(|p| MultiPolygon(vec![p])));
                    Subdivision { geometry: union_all(parts), ..sub }
                }
                None => sub,
            })
            .collect();

        Ok(Reconciled { subdivisions, slivers_attached, slivers_dropped, dropped_subdivisions })
    }
}

/// Piece sharing the longest positive-length edge with `sliver`; ties go to the lowest index.
fn nearest_piece(pieces: &Geometries, sliver: &Polygon<f64>, tolerance: f64) -> Option<usize> {
    let rect = sliver.bounding_rect()?;
    let sliver = MultiPolygon(vec![sliver.clone()]);
    let mut best: Option<(usize, f64)> = None;
    for idx in pieces.query(&envelope_of(&rect, tolerance)) {
        let length = shared_boundary_length(&sliver, &pieces.shapes()[idx], tolerance);
        if length > 0.0 && best.is_none_or(|(_, l)| length > l) {
            best = Some((idx, length));
        }
    }
    best.map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1), (x: x0, y: y0),
        ]])
    }

    fn outline(iso3: Option<&str>, color: Option<&str>, shape: MultiPolygon<f64>) -> OutlineFeature {
        OutlineFeature { iso3: iso3.map(Into::into), color_code: color.map(Into::into), geometry: shape }
    }

    #[test]
    fn outline_selects_iso3_and_color_code() {
        let outlines = CountryOutlines::new(vec![
            outline(Some("ABC"), None, rect(0.0, 0.0, 1.0, 1.0)),
            outline(None, Some("ABC"), rect(1.0, 0.0, 2.0, 1.0)),
            outline(Some("DEF"), None, rect(5.0, 5.0, 6.0, 6.0)),
        ]);
        let water = WaterMask::none();
        let target = BoundaryReconciler::new(&outlines, &water).target_outline("ABC").unwrap();
        assert!((target.unsigned_area() - 2.0).abs() < 1e-9);
        assert_eq!(outlines.select("DEF").len(), 1);
    }

    #[test]
    fn water_is_removed_from_outline() {
        let outlines = CountryOutlines::new(vec![outline(Some("ABC"), None, rect(0.0, 0.0, 2.0, 1.0))]);
        let water = WaterMask::new(vec![rect(0.2, 0.2, 0.4, 0.4), rect(10.0, 10.0, 11.0, 11.0)]);
        let target = BoundaryReconciler::new(&outlines, &water).target_outline("ABC").unwrap();
        assert!((target.unsigned_area() - (2.0 - 0.04)).abs() < 1e-9);
    }

    #[test]
    fn missing_outline_is_an_error() {
        let outlines = CountryOutlines::new(vec![]);
        let water = WaterMask::none();
        let err = BoundaryReconciler::new(&outlines, &water).target_outline("XYZ").unwrap_err();
        assert!(matches!(err, BoundaryError::MissingOutline { code } if code == "XYZ"));
    }

    #[test]
    fn edge_tolerance_scales_with_the_outline() {
        let outlines = CountryOutlines::new(vec![]);
        let water = WaterMask::none();
        let reconciler = BoundaryReconciler::new(&outlines, &water);
        let small = reconciler.edge_tolerance(&rect(0.0, 0.0, 1e-3, 1e-3));
        let large = reconciler.edge_tolerance(&rect(0.0, 0.0, 30.0, 40.0));
        assert_eq!(small, MIN_EDGE_TOLERANCE);
        assert!((large - 5e-6).abs() < 1e-12);

        let fixed = BoundaryReconciler::new(&outlines, &water).with_edge_tolerance(Some(1e-4));
        assert_eq!(fixed.edge_tolerance(&rect(0.0, 0.0, 30.0, 40.0)), 1e-4);
    }
}
