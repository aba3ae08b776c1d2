use geo::{BoundingRect, Line, LinesIter, MultiPolygon};
use rstar::{RTree, RTreeObject, AABB};

/// Boundary segment of a polygon in an R-tree.
struct Edge(Line<f64>);

impl RTreeObject for Edge {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.0.start.into(), self.0.end.into())
    }
}

/// Length along which two segments run on top of each other, within `tol`.
fn collinear_overlap(a: &Line<f64>, b: &Line<f64>, tol: f64) -> f64 {
    let (dx, dy) = (a.end.x - a.start.x, a.end.y - a.start.y);
    let len = dx.hypot(dy);
    if len == 0.0 { return 0.0 }
    let (ux, uy) = (dx / len, dy / len);

    // Perpendicular offset of both ends of `b` from the line through `a`.
    let offset = |x: f64, y: f64| ((x - a.start.x) * uy - (y - a.start.y) * ux).abs();
    if offset(b.start.x, b.start.y) > tol || offset(b.end.x, b.end.y) > tol { return 0.0 }

    // Projections of `b` onto `a`, where `a` spans [0, len].
    let t0 = (b.start.x - a.start.x) * ux + (b.start.y - a.start.y) * uy;
    let t1 = (b.end.x - a.start.x) * ux + (b.end.y - a.start.y) * uy;
    (t0.max(t1).min(len) - t0.min(t1).max(0.0)).max(0.0)
}

/// Length of the boundary shared by two polygons, counting only segments that
/// coincide within `tol`. Touching at a corner yields zero.
pub(crate) fn shared_boundary_length(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>, tol: f64) -> f64 {
    let (Some(ra), Some(rb)) = (a.bounding_rect(), b.bounding_rect()) else { return 0.0 };
    if ra.max().x + tol < rb.min().x || rb.max().x + tol < ra.min().x
        || ra.max().y + tol < rb.min().y || rb.max().y + tol < ra.min().y {
        return 0.0;
    }

    let tree = RTree::bulk_load(b.lines_iter().map(Edge).collect());
    a.lines_iter()
        .map(|line| {
            let env = AABB::from_corners(
                [line.start.x.min(line.end.x) - tol, line.start.y.min(line.end.y) - tol],
                [line.start.x.max(line.end.x) + tol, line.start.y.max(line.end.y) + tol],
            );
            tree.locate_in_envelope_intersecting(&env)
                .map(|edge| collinear_overlap(&line, &edge.0, tol))
                .sum::<f64>()
        })
        .sum()
}
