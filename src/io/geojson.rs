//! GeoJSON reading and writing for every layer the pipeline touches.

use std::{fs, path::Path};

use anyhow::{anyhow, bail, Context, Result};
use geo::{Coord, LineString, MultiPolygon, Point, Polygon};
use log::warn;
use serde_json::{json, Map, Value};

use crate::reconcile::{CountryOutlines, OutlineFeature, WaterMask};
use crate::store::{CentroidRecord, RegionFeature};
use crate::types::SubdivisionRecord;

/// Named CRS member written on published polygon layers.
pub const CRS84: &str = "urn:ogc:def:crs:OGC:1.3:CRS84";

// ---- Property names of the published admin1 contract ----
pub const ALPHA_3:    &str = "alpha_3";
pub const ADM0_REF:   &str = "ADM0_REF";
pub const ADM0_PCODE: &str = "ADM0_PCODE";
pub const ADM1_REF:   &str = "ADM1_REF";
pub const ADM1_PCODE: &str = "ADM1_PCODE";

fn crs_member() -> Value {
    json!({ "type": "name", "properties": { "name": CRS84 } })
}

// ---- Geometry encoding ----

fn ring_to_coords(ring: &LineString<f64>) -> Vec<[f64; 2]> {
    ring.coords().map(|c| [c.x, c.y]).collect()
}

fn polygon_coords(polygon: &Polygon<f64>) -> Vec<Vec<[f64; 2]>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(ring_to_coords)
        .collect()
}

/// Convert a MultiPolygon into a GeoJSON geometry.
pub(crate) fn multipolygon_to_geojson(mp: &MultiPolygon<f64>) -> Value {
    json!({
        "type": "MultiPolygon",
        "coordinates": mp.0.iter().map(polygon_coords).collect::<Vec<_>>(),
    })
}

/// Convert a Polygon into a GeoJSON geometry.
pub(crate) fn polygon_to_geojson(polygon: &Polygon<f64>) -> Value {
    json!({ "type": "Polygon", "coordinates": polygon_coords(polygon) })
}

pub(crate) fn point_to_geojson(point: &Point<f64>) -> Value {
    json!({ "type": "Point", "coordinates": [point.x(), point.y()] })
}

// ---- Geometry decoding ----

fn parse_ring(value: &Value) -> Result<LineString<f64>> {
    let points = value.as_array()
        .ok_or_else(|| anyhow!("[io::geojson] ring must be an array of positions"))?;
    let mut coords = points.iter()
        .map(|pos| {
            let x = pos.get(0).and_then(Value::as_f64);
            let y = pos.get(1).and_then(Value::as_f64);
            match (x, y) {
                (Some(x), Some(y)) => Ok(Coord { x, y }),
                _ => bail!("[io::geojson] invalid position {pos}"),
            }
        })
        .collect::<Result<Vec<_>>>()?;
    if let (Some(&first), Some(&last)) = (coords.first(), coords.last()) {
        if first != last { coords.push(first) }
    }
    Ok(LineString(coords))
}

fn parse_polygon(value: &Value) -> Result<Option<Polygon<f64>>> {
    let rings = value.as_array()
        .ok_or_else(|| anyhow!("[io::geojson] polygon must be an array of rings"))?;
    let mut rings = rings.iter().map(parse_ring);
    let Some(exterior) = rings.next().transpose()? else { return Ok(None) };
    Ok(Some(Polygon::new(exterior, rings.collect::<Result<Vec<_>>>()?)))
}

/// Parse a GeoJSON Polygon or MultiPolygon geometry; `None` for a null geometry.
pub(crate) fn geometry_from_geojson(value: &Value) -> Result<Option<MultiPolygon<f64>>> {
    if value.is_null() { return Ok(None) }
    let coords = &value["coordinates"];
    match value["type"].as_str() {
        Some("Polygon") => Ok(parse_polygon(coords)?.map(|p| MultiPolygon(vec![p]))),
        Some("MultiPolygon") => {
            let polygons = coords.as_array()
                .ok_or_else(|| anyhow!("[io::geojson] MultiPolygon coordinates must be an array"))?;
            let polygons = polygons.iter()
                .filter_map(|p| parse_polygon(p).transpose())
                .collect::<Result<Vec<_>>>()?;
            Ok(Some(MultiPolygon(polygons)))
        }
        other => bail!("[io::geojson] unsupported geometry type {other:?}"),
    }
}

// ---- Feature collections ----

/// Read and parse a JSON document.
pub fn read_json(path: &Path) -> Result<Value> {
    let bytes = fs::read(path)
        .with_context(|| format!("[io::geojson] Failed to read {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("[io::geojson] Failed to parse {}", path.display()))
}

/// Serialize a JSON document to `path`.
pub fn write_json(path: &Path, value: &Value) -> Result<()> {
    let bytes = serde_json::to_vec(value).context("[io::geojson] Failed to serialize GeoJSON")?;
    fs::write(path, bytes)
        .with_context(|| format!("[io::geojson] Failed to write {}", path.display()))
}

/// Properties and polygon geometry of each feature of a FeatureCollection.
pub(crate) fn features_from_geojson(value: &Value) -> Result<Vec<(Map<String, Value>, Option<MultiPolygon<f64>>)>> {
    let features = value["features"].as_array()
        .ok_or_else(|| anyhow!("[io::geojson] expected a FeatureCollection"))?;
    features.iter().enumerate()
        .map(|(i, feature)| {
            let properties = feature["properties"].as_object().cloned().unwrap_or_default();
            let geometry = geometry_from_geojson(&feature["geometry"])
                .with_context(|| format!("[io::geojson] feature {i}"))?;
            Ok((properties, geometry))
        })
        .collect()
}

/// Text form of a string or number property.
fn property_text(properties: &Map<String, Value>, key: &str) -> Option<String> {
    match properties.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn require_text(properties: &Map<String, Value>, key: &str, feature: usize) -> Result<String> {
    property_text(properties, key)
        .ok_or_else(|| anyhow!("[io::geojson] feature {feature} is missing property {key}"))
}

// ---- Admin1 polygons ----

fn subdivision_properties(r: &SubdivisionRecord) -> Value {
    json!({
        ALPHA_3:    r.country_code,
        ADM0_REF:   r.country_name,
        ADM0_PCODE: r.country_pcode2,
        ADM1_REF:   r.subdivision_name,
        ADM1_PCODE: r.subdivision_code,
    })
}

/// The global admin1 layer as a FeatureCollection with a named CRS.
pub(crate) fn subdivisions_to_geojson<'a>(records: impl IntoIterator<Item = &'a SubdivisionRecord>) -> Value {
    let features: Vec<Value> = records.into_iter()
        .map(|r| json!({
            "type": "Feature",
            "properties": subdivision_properties(r),
            "geometry": multipolygon_to_geojson(&r.geometry),
        }))
        .collect();
    json!({ "type": "FeatureCollection", "crs": crs_member(), "features": features })
}

/// Parse a published admin1 layer. Features without geometry are skipped.
pub(crate) fn subdivisions_from_geojson(value: &Value) -> Result<Vec<SubdivisionRecord>> {
    let mut records = Vec::new();
    for (i, (properties, geometry)) in features_from_geojson(value)?.into_iter().enumerate() {
        let Some(geometry) = geometry.filter(|g| !g.0.is_empty()) else {
            warn!("[io::geojson] admin1 feature {i} has no geometry; skipped");
            continue;
        };
        records.push(SubdivisionRecord {
            country_code:     require_text(&properties, ALPHA_3, i)?,
            country_name:     require_text(&properties, ADM0_REF, i)?,
            country_pcode2:   require_text(&properties, ADM0_PCODE, i)?,
            subdivision_code: require_text(&properties, ADM1_PCODE, i)?,
            subdivision_name: property_text(&properties, ADM1_REF).unwrap_or_default(),
            geometry,
        });
    }
    Ok(records)
}

pub fn read_subdivisions(path: &Path) -> Result<Vec<SubdivisionRecord>> {
    subdivisions_from_geojson(&read_json(path)?)
        .with_context(|| format!("[io::geojson] Invalid admin1 layer {}", path.display()))
}

pub fn write_subdivisions<'a>(path: &Path, records: impl IntoIterator<Item = &'a SubdivisionRecord>) -> Result<()> {
    write_json(path, &subdivisions_to_geojson(records))
}

// ---- Admin1 centroids ----

/// Centroids as a FeatureCollection of points, without a `crs` member.
pub(crate) fn centroids_to_geojson(centroids: &[CentroidRecord]) -> Value {
    let features: Vec<Value> = centroids.iter()
        .map(|c| json!({
            "type": "Feature",
            "properties": {
                ALPHA_3:    c.country_code,
                ADM0_REF:   c.country_name,
                ADM0_PCODE: c.country_pcode2,
                ADM1_REF:   c.subdivision_name,
                ADM1_PCODE: c.subdivision_code,
            },
            "geometry": point_to_geojson(&c.point),
        }))
        .collect();
    json!({ "type": "FeatureCollection", "features": features })
}

pub fn write_centroids(path: &Path, centroids: &[CentroidRecord]) -> Result<()> {
    write_json(path, &centroids_to_geojson(centroids))
}

// ---- Regional bounding boxes ----

pub(crate) fn regions_to_geojson(features: &[RegionFeature]) -> Value {
    let overall = features.iter()
        .map(|f| f.bbox.bbox)
        .reduce(|a, b| [a[0].min(b[0]), a[1].min(b[1]), a[2].max(b[2]), a[3].max(b[3])]);
    let features: Vec<Value> = features.iter()
        .map(|f| json!({
            "type": "Feature",
            "bbox": f.bbox.bbox,
            "properties": f.properties,
            "geometry": polygon_to_geojson(&f.bbox.polygon()),
        }))
        .collect();

    let mut collection = json!({ "type": "FeatureCollection", "crs": crs_member(), "features": features });
    if let Some(bbox) = overall {
        collection["bbox"] = json!(bbox);
    }
    collection
}

pub fn write_regions(path: &Path, features: &[RegionFeature]) -> Result<()> {
    write_json(path, &regions_to_geojson(features))
}

/// Properties of each feature of an existing regional bounding box file.
pub fn read_region_template(path: &Path) -> Result<Vec<Map<String, Value>>> {
    let value = read_json(path)?;
    let features = value["features"].as_array()
        .ok_or_else(|| anyhow!("[io::geojson] {} is not a FeatureCollection", path.display()))?;
    Ok(features.iter()
        .map(|f| f["properties"].as_object().cloned().unwrap_or_default())
        .collect())
}

// ---- Reference layers ----

/// Build the admin0 layer from parsed features, keyed by the two configured fields.
pub(crate) fn outlines_from_features(
    features:    Vec<(Map<String, Value>, Option<MultiPolygon<f64>>)>,
    iso3_field:  &str,
    color_field: &str,
) -> CountryOutlines {
    CountryOutlines::new(features.into_iter()
        .filter_map(|(properties, geometry)| Some(OutlineFeature {
            iso3:       property_text(&properties, iso3_field),
            color_code: property_text(&properties, color_field),
            geometry:   geometry?,
        }))
        .collect())
}

pub fn read_country_outlines(path: &Path, iso3_field: &str, color_field: &str) -> Result<CountryOutlines> {
    let features = features_from_geojson(&read_json(path)?)
        .with_context(|| format!("[io::geojson] Invalid outline layer {}", path.display()))?;
    Ok(outlines_from_features(features, iso3_field, color_field))
}

pub fn read_water_mask(path: &Path) -> Result<WaterMask> {
    let features = features_from_geojson(&read_json(path)?)
        .with_context(|| format!("[io::geojson] Invalid water layer {}", path.display()))?;
    Ok(WaterMask::new(features.into_iter().filter_map(|(_, geometry)| geometry).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn polygon_and_multipolygon_parse_alike() {
        let poly = json!({"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]});
        let multi = json!({"type": "MultiPolygon", "coordinates": [[[[0, 0], [1, 0], [1, 1], [0, 0]]]]});
        assert_eq!(geometry_from_geojson(&poly).unwrap(), geometry_from_geojson(&multi).unwrap());
        assert_eq!(geometry_from_geojson(&Value::Null).unwrap(), None);
        assert!(geometry_from_geojson(&json!({"type": "Point", "coordinates": [0, 0]})).is_err());
    }

    #[test]
    fn open_rings_are_closed() {
        let poly = json!({"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1]]]});
        let mp = geometry_from_geojson(&poly).unwrap().unwrap();
        assert_eq!(mp.0[0].exterior().0.len(), 4);
    }

    #[test]
    fn centroids_have_no_crs() {
        let c = CentroidRecord {
            country_code: "AFG".into(), country_name: "Afghanistan".into(), country_pcode2: "AF".into(),
            subdivision_code: "AF01".into(), subdivision_name: "Kabul".into(), point: Point::new(69.1, 34.5),
        };
        let value = centroids_to_geojson(&[c]);
        assert!(value.get("crs").is_none());
        assert_eq!(value["features"][0]["geometry"]["coordinates"], json!([69.1, 34.5]));
        assert_eq!(value["features"][0]["properties"][ADM1_PCODE], json!("AF01"));
    }

    #[test]
    fn outlines_take_configured_fields() {
        let square = MultiPolygon(vec![polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 0.0)]]);
        let features = vec![
            (json!({"ISO_3": "AFG"}).as_object().cloned().unwrap(), Some(square.clone())),
            (json!({"Color_Code": "xJK"}).as_object().cloned().unwrap(), Some(square)),
            (json!({"ISO_3": "SDN"}).as_object().cloned().unwrap(), None),
        ];
        let outlines = outlines_from_features(features, "ISO_3", "Color_Code");
        assert_eq!(outlines.len(), 2);
        assert_eq!(outlines.select("xJK").len(), 1);
        assert!(outlines.select("SDN").is_empty());
    }
}
