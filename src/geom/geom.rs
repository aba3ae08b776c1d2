use arcgraph::{SimplifyError, SimplifyOptions, Topology};
use geo::{BooleanOps, BoundingRect, CoordsIter, InteriorPoint, MultiPolygon, Point, Rect};
use rstar::{RTree, AABB};

use crate::geom::{bbox::merge_rects, BoundingBox};

/// Geometries represents a collection of MultiPolygons indexed by an R-tree of their bounding boxes.
#[derive(Debug, Clone)]
pub(crate) struct Geometries {
    shapes: Vec<MultiPolygon<f64>>,
    rtree: RTree<BoundingBox>,
}

impl Geometries {
    /// Construct a Geometries object from a vector of MultiPolygons.
    /// Empty shapes are kept in place but never returned by queries.
    pub(crate) fn new(polygons: Vec<MultiPolygon<f64>>) -> Self {
        Self {
            rtree: RTree::bulk_load(
                polygons.iter().enumerate()
                    .filter_map(|(i, polygon)| polygon.bounding_rect().map(|rect| BoundingBox::new(i, rect)))
                    .collect()
            ),
            shapes: polygons,
        }
    }

    /// Get the number of MultiPolygons.
    #[inline] pub(crate) fn len(&self) -> usize { self.shapes.len() }

    /// Check if there are no MultiPolygons.
    #[inline] pub(crate) fn is_empty(&self) -> bool { self.shapes.is_empty() }

    /// Get a reference to the list of MultiPolygons.
    #[inline] pub(crate) fn shapes(&self) -> &[MultiPolygon<f64>] { &self.shapes }

    #[inline] pub(crate) fn into_shapes(self) -> Vec<MultiPolygon<f64>> { self.shapes }

    /// Indices of shapes whose bounding box intersects the envelope, in ascending order.
    pub(crate) fn query(&self, envelope: &AABB<[f64; 2]>) -> Vec<usize> {
        let mut hits: Vec<usize> = self.rtree.locate_in_envelope_intersecting(envelope)
            .map(|bbox| bbox.idx())
            .collect();
        hits.sort_unstable();
        hits
    }

    /// Compute the bounding rectangle of all MultiPolygons.
    pub(crate) fn bounds(&self) -> Option<Rect<f64>> {
        self.shapes.iter()
            .filter_map(|polygon| polygon.bounding_rect())
            .reduce(merge_rects)
    }

    /// A point inside (or on the boundary of) each MultiPolygon; `None` for empty shapes.
    pub(crate) fn interior_points(&self) -> Vec<Option<Point<f64>>> {
        self.shapes.iter()
            .map(|polygon| polygon.interior_point())
            .collect()
    }

    /// Compute the union of all MultiPolygons into a single MultiPolygon.
    /// This method may be slow for large numbers of complex polygons.
    pub(crate) fn union(&self) -> MultiPolygon<f64> {
        union_all(self.shapes.iter().cloned())
    }

    /// Total number of coordinates over all shapes.
    pub(crate) fn num_coords(&self) -> usize {
        self.shapes.iter().map(|shape| shape.coords_count()).sum()
    }

    /// Simplify all shapes together so that shared borders stay shared.
    pub(crate) fn simplify(&self, options: &SimplifyOptions) -> Result<Self, SimplifyError> {
        let topology = Topology::new(&self.shapes);
        Ok(Self::new(arcgraph::simplify(&topology, options)?))
    }
}

/// Union of a sequence of MultiPolygons; empty when the sequence is.
pub(crate) fn union_all(shapes: impl IntoIterator<Item = MultiPolygon<f64>>) -> MultiPolygon<f64> {
    shapes.into_iter()
        .filter(|shape| !shape.0.is_empty())
        .reduce(|a, b| a.union(&b))
        .unwrap_or_else(|| MultiPolygon(Vec::new()))
}
