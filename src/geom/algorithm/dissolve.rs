use std::hash::Hash;

use ahash::AHashMap;
use geo::MultiPolygon;

use crate::geom::union_all;

/// Merge all shapes sharing a key into one MultiPolygon per key.
/// Keys come out in order of first appearance.
pub(crate) fn dissolve_by_key<K>(items: impl IntoIterator<Item = (K, MultiPolygon<f64>)>) -> Vec<(K, MultiPolygon<f64>)>
where
    K: Eq + Hash + Clone,
{
    let mut order: Vec<K> = Vec::new();
    let mut groups: AHashMap<K, Vec<MultiPolygon<f64>>> = AHashMap::new();
    for (key, shape) in items {
        groups.entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(shape);
    }

    order.into_iter()
        .map(|key| {
            let parts = groups.remove(&key).unwrap_or_default();
            let shape = if parts.len() == 1 {
                parts.into_iter().next().unwrap_or_else(|| MultiPolygon(Vec::new()))
            } else {
                union_all(parts)
            };
            (key, shape)
        })
        .collect()
}
