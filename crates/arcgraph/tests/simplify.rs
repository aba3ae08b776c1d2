// Integration tests for topology-preserving simplification:
//   shared borders stay shared, vertex counts never grow, rings never vanish
//   silently, and simplified arcs never cross their neighbours.

use arcgraph::{simplify, SimplifyError, SimplifyOptions, Topology};
use geo::{polygon, Area, BooleanOps, CoordsIter, MultiPolygon};

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
fn shared_border_is_simplified_identically() {
    let input = two_squares();
    let topo = Topology::new(&input);
    let output = simplify(&topo, &SimplifyOptions::default()).unwrap();

    assert!((output[0].unsigned_area() - 4.0).abs() < 1e-12);
    assert!((output[1].unsigned_area() - 4.0).abs() < 1e-12);
    // No overlap and no gap between the neighbours.
    assert!(output[0].intersection(&output[1]).unsigned_area() < 1e-12);
    assert!((output[0].union(&output[1]).unsigned_area() - 8.0).abs() < 1e-12);
}

#[test]
fn vertex_count_never_grows() {
    let input = two_squares();
    let topo = Topology::new(&input);
    let output = simplify(&topo, &SimplifyOptions::default()).unwrap();
    for (a, b) in input.iter().zip(&output) {
        assert!(b.coords_count() <= a.coords_count());
        assert!(!b.0.is_empty());
    }
}

#[test]
fn zero_tolerance_only_drops_collinear_vertices() {
    let square = polygon![
        (x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 2.0), (x: 0.0, y: 2.0), (x: 0.0, y: 0.0),
    ];
    let topo = Topology::new(&[MultiPolygon(vec![square])]);
    let opts = SimplifyOptions { tolerance: 0.0, ..Default::default() };
    let output = simplify(&topo, &opts).unwrap();
    assert_eq!(output[0].coords_count(), 5);
    assert!((output[0].unsigned_area() - 4.0).abs() < 1e-12);
}

#[test]
fn tiny_island_is_kept_when_preventing_oversimplify() {
    let island = polygon![
        (x: 0.0, y: 0.0), (x: 0.001, y: 0.0), (x: 0.001, y: 0.001), (x: 0.0, y: 0.001), (x: 0.0, y: 0.0),
    ];
    let topo = Topology::new(&[MultiPolygon(vec![island])]);
    let output = simplify(&topo, &SimplifyOptions::default()).unwrap();
    assert_eq!(output[0].coords_count(), 5);
}

#[test]
fn tiny_island_fails_loudly_without_guard() {
    let island = polygon![
        (x: 0.0, y: 0.0), (x: 0.001, y: 0.0), (x: 0.001, y: 0.001), (x: 0.0, y: 0.001), (x: 0.0, y: 0.0),
    ];
    let topo = Topology::new(&[MultiPolygon(vec![island])]);
    let opts = SimplifyOptions { prevent_oversimplify: false, ..Default::default() };
    assert_eq!(simplify(&topo, &opts), Err(SimplifyError::EmptyFeature(0)));
}

#[test]
fn simplified_edge_crossing_a_neighbour_is_restored() {
    // The dent at (5, 9.5) is within tolerance, but flattening it would cut
    // through the small square sitting above the dent.
    let dented = polygon![
        (x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 5.0, y: 9.5), (x: 0.0, y: 10.0), (x: 0.0, y: 0.0),
    ];
    let neighbour = polygon![
        (x: 4.9, y: 9.7), (x: 5.1, y: 9.7), (x: 5.1, y: 10.2), (x: 4.9, y: 10.2), (x: 4.9, y: 9.7),
    ];
    let input = vec![MultiPolygon(vec![dented]), MultiPolygon(vec![neighbour])];
    let topo = Topology::new(&input);
    let opts = SimplifyOptions { tolerance: 1.0, ..Default::default() };
    let output = simplify(&topo, &opts).unwrap();

    assert_eq!(output[0].coords_count(), input[0].coords_count());
    assert!(output[0].intersection(&output[1]).unsigned_area() < 1e-12);
}
