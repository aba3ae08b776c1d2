//! Topology-preserving Douglas-Peucker simplification.
//!
//! Each arc of a [`Topology`] is simplified exactly once with its junction
//! endpoints pinned, so two features sharing a border receive the same
//! simplified border and no gap or overlap opens between them.
//!
//! Two repair passes run until stable:
//!
//! * rings that collapse below three distinct vertices, or below `min_area`
//!   of their original area, get their arcs restored when
//!   `prevent_oversimplify` is set;
//! * simplified segments that cross any other segment get both of their arcs
//!   restored.  Restored arcs carry their original vertices, so the output
//!   never introduces a crossing the input did not already have.

use std::fmt;

use geo::{
    algorithm::line_intersection::{line_intersection, LineIntersection},
    Coord, Line, MultiPolygon, Polygon,
};
use rstar::{RTree, RTreeObject, AABB};

use crate::ids::VertexId;
use crate::topology::{Ring, Topology};

/// Tolerances and guards for [`simplify`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimplifyOptions {
    /// Maximum perpendicular deviation, in input units (degrees for WGS84).
    pub tolerance: f64,
    /// Restore a ring's arcs instead of letting it degenerate.
    pub prevent_oversimplify: bool,
    /// Minimum fraction of its original area a ring must keep, in `[0, 1)`.
    pub min_area: f64,
}

impl Default for SimplifyOptions {
    fn default() -> Self {
        Self { tolerance: 0.01, prevent_oversimplify: true, min_area: 0.25 }
    }
}

/// Errors that can occur during simplification.
#[derive(Debug, Clone, PartialEq)]
pub enum SimplifyError {
    /// A non-empty input feature lost every polygon.
    EmptyFeature(usize),
    /// Tolerance was negative or not finite.
    InvalidTolerance(f64),
}

impl fmt::Display for SimplifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimplifyError::EmptyFeature(i) => write!(f, "feature {i} was emptied by simplification"),
            SimplifyError::InvalidTolerance(t) => write!(f, "invalid simplification tolerance {t}"),
        }
    }
}

impl std::error::Error for SimplifyError {}

/// Simplify every feature of `topology`, returning one MultiPolygon per input feature.
pub fn simplify(topology: &Topology, options: &SimplifyOptions) -> Result<Vec<MultiPolygon<f64>>, SimplifyError> {
    if !options.tolerance.is_finite() || options.tolerance < 0.0 {
        return Err(SimplifyError::InvalidTolerance(options.tolerance));
    }

    let original = topology.arc_vertices();
    let mut kept: Vec<Vec<VertexId>> = topology.arcs.iter()
        .map(|arc| {
            let coords: Vec<Coord<f64>> = arc.vertices.iter().map(|&v| topology.coord(v)).collect();
            douglas_peucker(&coords, options.tolerance).into_iter()
                .map(|i| arc.vertices[i])
                .collect()
        })
        .collect();
    let mut restored: Vec<bool> = kept.iter().zip(&original)
        .map(|(k, o)| k.len() == o.len())
        .collect();

    let original_areas: Vec<f64> = topology.rings()
        .map(|ring| ring_area(topology, &topology.ring_vertices(ring, &original)))
        .collect();

    loop {
        let mut changed = false;

        if options.prevent_oversimplify {
            for (ring, &area) in topology.rings().zip(&original_areas) {
                if ring_is_acceptable(topology, ring, &kept, area, options.min_area) { continue }
                for r in &ring.arcs {
                    if !restored[r.arc.0] {
                        kept[r.arc.0] = original[r.arc.0].clone();
                        restored[r.arc.0] = true;
                        changed = true;
                    }
                }
            }
        }

        for arc in crossing_arcs(topology, &kept) {
            if !restored[arc] {
                kept[arc] = original[arc].clone();
                restored[arc] = true;
                changed = true;
            }
        }

        if !changed { break }
    }

    topology.features.iter().enumerate()
        .map(|(i, feature)| {
            let polygons: Vec<Polygon<f64>> = feature.polygons.iter()
                .filter_map(|p| {
                    let exterior = topology.ring_vertices(&p.exterior, &kept);
                    if exterior.len() < 3 { return None }
                    let interiors = p.interiors.iter()
                        .map(|ring| topology.ring_vertices(ring, &kept))
                        .filter(|verts| verts.len() >= 3)
                        .map(|verts| topology.ring_line(&verts))
                        .collect();
                    Some(Polygon::new(topology.ring_line(&exterior), interiors))
                })
                .collect();
            if polygons.is_empty() && !feature.polygons.is_empty() {
                return Err(SimplifyError::EmptyFeature(i));
            }
            Ok(MultiPolygon(polygons))
        })
        .collect()
}

/// Indices of the points kept by Douglas-Peucker; endpoints are always kept.
/// A closed input (first == last) measures against the first point until the
/// farthest vertex splits it.
pub fn douglas_peucker(points: &[Coord<f64>], tolerance: f64) -> Vec<usize> {
    let n = points.len();
    if n < 3 { return (0..n).collect() }

    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    let mut stack = vec![(0usize, n - 1)];
    while let Some((first, last)) = stack.pop() {
        let mut max_dist = 0.0;
        let mut index = first;
        for i in first + 1..last {
            let d = segment_distance(points[i], points[first], points[last]);
            if d > max_dist {
                max_dist = d;
                index = i;
            }
        }
        if max_dist > tolerance {
            keep[index] = true;
            stack.push((first, index));
            stack.push((index, last));
        }
    }

    (0..n).filter(|&i| keep[i]).collect()
}

/// Distance from `p` to the segment `a`–`b` (to `a` when the segment is a point).
fn segment_distance(p: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return (p.x - a.x).hypot(p.y - a.y);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0);
    (p.x - (a.x + t * dx)).hypot(p.y - (a.y + t * dy))
}

/// Shoelace area of an open vertex cycle (absolute value).
fn ring_area(topology: &Topology, verts: &[VertexId]) -> f64 {
    let n = verts.len();
    let mut a = 0.0;
    for i in 0..n {
        let p = topology.coord(verts[i]);
        let q = topology.coord(verts[(i + 1) % n]);
        a += p.x * q.y - q.x * p.y;
    }
    (a / 2.0).abs()
}

fn ring_is_acceptable(topology: &Topology, ring: &Ring, kept: &[Vec<VertexId>], original_area: f64, min_area: f64) -> bool {
    let verts = topology.ring_vertices(ring, kept);
    verts.len() >= 3 && ring_area(topology, &verts) >= min_area * original_area
}

// ---------------------------------------------------------------------------
// Crossing detection
// ---------------------------------------------------------------------------

/// A simplified segment in an R-tree, tagged with its arc and position.
struct Segment {
    arc:  usize,
    idx:  usize,
    line: Line<f64>,
}

impl RTreeObject for Segment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.line.start.into(), self.line.end.into())
    }
}

/// Arcs with at least one segment crossing another segment.
fn crossing_arcs(topology: &Topology, kept: &[Vec<VertexId>]) -> Vec<usize> {
    let segments: Vec<Segment> = kept.iter().enumerate()
        .flat_map(|(arc, verts)| verts.windows(2).enumerate()
            .map(move |(idx, w)| (arc, idx, w[0], w[1])))
        .filter(|&(_, _, a, b)| a != b)
        .map(|(arc, idx, a, b)| Segment {
            arc, idx, line: Line::new(topology.coord(a), topology.coord(b)),
        })
        .collect();
    let tree = RTree::bulk_load(segments);

    let mut hits: Vec<usize> = Vec::new();
    for (s, t) in tree.intersection_candidates_with_other_tree(&tree) {
        if (s.arc, s.idx) >= (t.arc, t.idx) { continue }
        if segments_conflict(s, t) {
            hits.push(s.arc);
            hits.push(t.arc);
        }
    }
    hits.sort_unstable();
    hits.dedup();
    hits
}

fn segments_conflict(s: &Segment, t: &Segment) -> bool {
    let Some(hit) = line_intersection(s.line, t.line) else { return false };
    match hit {
        LineIntersection::Collinear { intersection } => intersection.start != intersection.end,
        LineIntersection::SinglePoint { is_proper: true, .. } => true,
        LineIntersection::SinglePoint { intersection, .. } => {
            // Meeting at an endpoint is fine only when both segments end there.
            let at_s = intersection == s.line.start || intersection == s.line.end;
            let at_t = intersection == t.line.start || intersection == t.line.end;
            !(at_s && at_t)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn c(x: f64, y: f64) -> Coord<f64> { Coord { x, y } }

    #[test]
    fn straight_line_keeps_endpoints_only() {
        let pts = [c(0.0, 0.0), c(1.0, 0.001), c(2.0, 0.0), c(3.0, 0.0)];
        assert_eq!(douglas_peucker(&pts, 0.01), vec![0, 3]);
    }

    #[test]
    fn spike_above_tolerance_is_kept() {
        let pts = [c(0.0, 0.0), c(1.0, 1.0), c(2.0, 0.0)];
        assert_eq!(douglas_peucker(&pts, 0.5), vec![0, 1, 2]);
    }

    #[test]
    fn closed_input_keeps_farthest_vertex() {
        let pts = [c(0.0, 0.0), c(1.0, 0.0), c(1.0, 1.0), c(0.0, 1.0), c(0.0, 0.0)];
        let kept = douglas_peucker(&pts, 0.1);
        assert!(kept.contains(&2));
        assert_eq!(kept.first(), Some(&0));
        assert_eq!(kept.last(), Some(&4));
    }

    #[test]
    fn segment_distance_handles_degenerate_segment() {
        assert_eq!(segment_distance(c(3.0, 4.0), c(0.0, 0.0), c(0.0, 0.0)), 5.0);
        assert_eq!(segment_distance(c(1.0, 1.0), c(0.0, 0.0), c(2.0, 0.0)), 1.0);
    }

    #[test]
    fn negative_tolerance_is_rejected() {
        let topo = Topology::new(&[]);
        let opts = SimplifyOptions { tolerance: -1.0, ..Default::default() };
        assert_eq!(simplify(&topo, &opts), Err(SimplifyError::InvalidTolerance(-1.0)));
    }
}
