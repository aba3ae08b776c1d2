// Integration tests for shared-arc construction:
//   junction detection and arc deduplication.

use arcgraph::Topology;
use geo::{polygon, MultiPolygon};

/// Two unit-height squares sharing the edge x = 2, with extra vertices along it.
fn two_squares() -> Vec<MultiPolygon<f64>> {
    let left = polygon![
        (x: 0.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 0.5), (x: 2.001, y: 1.0),
        (x: 2.0, y: 1.5), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0), (x: 0.0, y: 0.0),
    ];
    let right = polygon![
        (x: 2.0, y: 0.0), (x: 4.0, y: 0.0), (x: 4.0, y: 2.0), (x: 2.0, y: 2.0),
        (x: 2.0, y: 1.5), (x: 2.001, y: 1.0), (x: 2.0, y: 0.5), (x: 2.0, y: 0.0),
    ];
    vec![MultiPolygon(vec![left]), MultiPolygon(vec![right])]
}

#[test]
fn shared_border_is_stored_once() {
    let topo = Topology::new(&two_squares());
    assert_eq!(topo.num_arcs(), 3);
    assert_eq!(topo.num_shared_arcs(), 1);
    assert_eq!(topo.num_features(), 2);
    // 4 + 4 corners minus 2 shared, plus 3 border vertices
    assert_eq!(topo.num_vertices(), 9);
}

#[test]
fn hole_filled_by_island_shares_one_closed_arc() {
    let outer = polygon!(
        exterior: [
            (x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0), (x: 0.0, y: 0.0),
        ],
        interiors: [[
            (x: 4.0, y: 4.0), (x: 4.0, y: 6.0), (x: 6.0, y: 6.0), (x: 6.0, y: 4.0), (x: 4.0, y: 4.0),
        ]],
    );
    let island = polygon![
        (x: 4.0, y: 4.0), (x: 6.0, y: 4.0), (x: 6.0, y: 6.0), (x: 4.0, y: 6.0), (x: 4.0, y: 4.0),
    ];
    let topo = Topology::new(&[MultiPolygon(vec![outer]), MultiPolygon(vec![island])]);
    assert_eq!(topo.num_arcs(), 2);
    assert_eq!(topo.num_shared_arcs(), 1);
    assert!(topo.features()[1].polygons[0].exterior.arcs[0].arc == topo.features()[0].polygons[0].interiors[0].arcs[0].arc);
}

#[test]
fn closing_and_duplicate_vertices_are_ignored() {
    let dup = polygon![
        (x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 0.0),
    ];
    let topo = Topology::new(&[MultiPolygon(vec![dup])]);
    assert_eq!(topo.num_vertices(), 3);
    assert_eq!(topo.arc(arcgraph::ArcId(0)).vertices.len(), 4);
}
