//! Shared-arc topology for a coverage of polygon features.
//!
//! # Structure
//!
//! Every ring of every input polygon is cut at **junctions**: vertices where
//! the set of neighbouring vertices differs from a simple two-neighbour path
//! (three or more distinct neighbours across all rings).  The runs of vertices
//! between junctions are **arcs**.  An arc traversed by two rings (the shared
//! border of two neighbouring features) is stored once, and each ring refers to
//! it by [`ArcRef`], possibly in reverse.
//!
//! A ring without any junction (an island, or a hole exactly filled by another
//! feature) becomes a single closed arc, rotated to start at its lowest vertex
//! id so that both rings tracing it resolve to the same arc.
//!
//! Vertices are identified by exact coordinate equality.  Inputs that do not
//! share vertex coordinates along common borders simply produce unshared arcs.

use ahash::AHashMap;
use geo::{Coord, LineString, MultiPolygon};
use smallvec::SmallVec;

use crate::ids::{ArcId, VertexId};

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A maximal run of vertices between two junctions.
#[derive(Clone, Debug)]
pub struct Arc {
    pub vertices: Vec<VertexId>,
}

impl Arc {
    /// True for the single arc of a junction-free ring (first == last).
    pub fn is_closed(&self) -> bool {
        self.vertices.len() > 1 && self.vertices.first() == self.vertices.last()
    }
}

/// A directed reference from a ring to an arc.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArcRef {
    pub arc:      ArcId,
    pub reversed: bool,
}

/// A closed ring expressed as a cycle of arc references.
#[derive(Clone, Debug, Default)]
pub struct Ring {
    pub arcs: Vec<ArcRef>,
}

/// One polygon: an exterior ring and zero or more holes.
#[derive(Clone, Debug)]
pub struct PolygonRings {
    pub exterior:  Ring,
    pub interiors: Vec<Ring>,
}

/// One input feature (a MultiPolygon).
#[derive(Clone, Debug, Default)]
pub struct Feature {
    pub polygons: Vec<PolygonRings>,
}

// ---------------------------------------------------------------------------
// Topology
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default)]
pub struct Topology {
    pub(crate) coords:   Vec<Coord<f64>>,
    pub(crate) arcs:     Vec<Arc>,
    pub(crate) features: Vec<Feature>,
}

/// Hashable identity of a coordinate; `+ 0.0` folds `-0.0` into `0.0`.
#[inline]
fn coord_key(c: Coord<f64>) -> (u64, u64) {
    ((c.x + 0.0).to_bits(), (c.y + 0.0).to_bits())
}

impl Topology {
    /// Build the shared-arc topology of a set of features.
    pub fn new(features: &[MultiPolygon<f64>]) -> Self {
        let mut coords: Vec<Coord<f64>> = Vec::new();
        let mut lookup: AHashMap<(u64, u64), VertexId> = AHashMap::new();

        // 1) Intern every ring as an open cycle of vertex ids.
        //    raw[feature][polygon][ring] with ring 0 the exterior.
        let mut raw: Vec<Vec<Vec<Vec<VertexId>>>> = Vec::with_capacity(features.len());
        for mp in features {
            let mut polygons = Vec::with_capacity(mp.0.len());
            for polygon in &mp.0 {
                let Some(exterior) = intern_ring(polygon.exterior(), &mut coords, &mut lookup) else { continue };
                let mut rings = vec![exterior];
                rings.extend(polygon.interiors().iter()
                    .filter_map(|ring| intern_ring(ring, &mut coords, &mut lookup)));
                polygons.push(rings);
            }
            raw.push(polygons);
        }

        // 2) Collect distinct neighbours per vertex to find junctions.
        let mut neighbors: Vec<SmallVec<[VertexId; 4]>> = vec![SmallVec::new(); coords.len()];
        for ring in raw.iter().flatten().flatten() {
            let n = ring.len();
            for i in 0..n {
                let v = ring[i];
                for w in [ring[(i + n - 1) % n], ring[(i + 1) % n]] {
                    if !neighbors[v.0].contains(&w) {
                        neighbors[v.0].push(w);
                    }
                }
            }
        }
        let is_junction: Vec<bool> = neighbors.iter().map(|nbrs| nbrs.len() > 2).collect();

        // 3) Cut rings into arcs and deduplicate shared arcs.
        let mut arcs: Vec<Arc> = Vec::new();
        let mut arc_index: AHashMap<Vec<VertexId>, ArcId> = AHashMap::new();
        let features = raw.into_iter()
            .map(|polygons| Feature {
                polygons: polygons.into_iter()
                    .map(|rings| {
                        let mut rings = rings.into_iter()
                            .map(|ring| cut_ring(&ring, &is_junction, &mut arcs, &mut arc_index));
                        let exterior = rings.next().unwrap_or_default();
                        PolygonRings { exterior, interiors: rings.collect() }
                    })
                    .collect(),
            })
            .collect();

        Self { coords, arcs, features }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn num_vertices(&self) -> usize { self.coords.len() }
    pub fn num_arcs(&self)     -> usize { self.arcs.len() }
    pub fn num_features(&self) -> usize { self.features.len() }

    pub fn coord(&self, id: VertexId) -> Coord<f64> { self.coords[id.0] }
    pub fn arc(&self, id: ArcId)      -> &Arc        { &self.arcs[id.0] }
    pub fn features(&self)            -> &[Feature]  { &self.features }

    /// Number of arcs referenced by more than one ring (shared borders).
    pub fn num_shared_arcs(&self) -> usize {
        let mut uses = vec![0u32; self.arcs.len()];
        for ring in self.rings() {
            for r in &ring.arcs {
                uses[r.arc.0] += 1;
            }
        }
        uses.into_iter().filter(|&n| n > 1).count()
    }

    /// Iterate over every ring of every feature.
    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        self.features.iter()
            .flat_map(|f| f.polygons.iter())
            .flat_map(|p| std::iter::once(&p.exterior).chain(p.interiors.iter()))
    }

    // -----------------------------------------------------------------------
    // Reassembly
    // -----------------------------------------------------------------------

    /// Open vertex cycle of `ring` given a per-arc vertex list (original or simplified).
    pub(crate) fn ring_vertices(&self, ring: &Ring, arc_vertices: &[Vec<VertexId>]) -> Vec<VertexId> {
        let mut out: Vec<VertexId> = Vec::new();
        for r in &ring.arcs {
            let verts = &arc_vertices[r.arc.0];
            let ordered: Box<dyn Iterator<Item = &VertexId>> = if r.reversed {
                Box::new(verts.iter().rev())
            } else {
                Box::new(verts.iter())
            };
            for &v in ordered {
                if out.last() != Some(&v) {
                    out.push(v);
                }
            }
        }
        // Drop the closing vertex; callers close the ring themselves.
        if out.len() > 1 && out.first() == out.last() {
            out.pop();
        }
        out
    }

    /// Closed coordinate ring from an open vertex cycle.
    pub(crate) fn ring_line(&self, verts: &[VertexId]) -> LineString<f64> {
        let mut coords: Vec<Coord<f64>> = verts.iter().map(|&v| self.coords[v.0]).collect();
        if let Some(&first) = coords.first() {
            coords.push(first);
        }
        LineString(coords)
    }

    /// Original vertex list of every arc.
    pub(crate) fn arc_vertices(&self) -> Vec<Vec<VertexId>> {
        self.arcs.iter().map(|arc| arc.vertices.clone()).collect()
    }

    /// Reassemble the features from the unmodified arcs.
    #[cfg(test)]
    pub(crate) fn to_multipolygons(&self) -> Vec<MultiPolygon<f64>> {
        let arcs = self.arc_vertices();
        self.features.iter()
            .map(|feature| MultiPolygon(feature.polygons.iter()
                .map(|p| geo::Polygon::new(
                    self.ring_line(&self.ring_vertices(&p.exterior, &arcs)),
                    p.interiors.iter()
                        .map(|ring| self.ring_line(&self.ring_vertices(ring, &arcs)))
                        .collect(),
                ))
                .collect()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Construction helpers
// ---------------------------------------------------------------------------

/// Intern a ring as an open cycle, dropping the closing coordinate and
/// consecutive duplicates.  `None` for rings with fewer than three vertices.
fn intern_ring(
    ring:   &LineString<f64>,
    coords: &mut Vec<Coord<f64>>,
    lookup: &mut AHashMap<(u64, u64), VertexId>,
) -> Option<Vec<VertexId>> {
    let mut out: Vec<VertexId> = Vec::with_capacity(ring.0.len());
    for &c in &ring.0 {
        let id = *lookup.entry(coord_key(c)).or_insert_with(|| {
            coords.push(c);
            VertexId(coords.len() - 1)
        });
        if out.last() != Some(&id) {
            out.push(id);
        }
    }
    while out.len() > 1 && out.first() == out.last() {
        out.pop();
    }
    (out.len() >= 3).then_some(out)
}

/// Split an open vertex cycle into arcs at junctions, reusing existing arcs.
fn cut_ring(
    ring:        &[VertexId],
    is_junction: &[bool],
    arcs:        &mut Vec<Arc>,
    arc_index:   &mut AHashMap<Vec<VertexId>, ArcId>,
) -> Ring {
    let n = ring.len();
    let junctions: Vec<usize> = (0..n).filter(|&i| is_junction[ring[i].0]).collect();

    let mut pieces: Vec<Vec<VertexId>> = Vec::new();
    if junctions.is_empty() {
        // Closed arc starting at the lowest vertex id.
        // A ring tracing the same cycle the other way round matches it reversed.
        let start = (0..n).min_by_key(|&i| ring[i]).unwrap_or(0);
        pieces.push((0..=n).map(|k| ring[(start + k) % n]).collect());
    } else {
        for (k, &from) in junctions.iter().enumerate() {
            let to = junctions.get(k + 1).copied().unwrap_or(junctions[0] + n);
            pieces.push((from..=to).map(|i| ring[i % n]).collect());
        }
    }

    let arcs = pieces.into_iter()
        .map(|piece| {
            if let Some(&id) = arc_index.get(&piece) {
                return ArcRef { arc: id, reversed: false };
            }
            let reversed: Vec<VertexId> = piece.iter().rev().copied().collect();
            if let Some(&id) = arc_index.get(&reversed) {
                return ArcRef { arc: id, reversed: true };
            }
            let id = ArcId(arcs.len());
            arc_index.insert(piece.clone(), id);
            arcs.push(Arc { vertices: piece });
            ArcRef { arc: id, reversed: false }
        })
        .collect();

    Ring { arcs }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
