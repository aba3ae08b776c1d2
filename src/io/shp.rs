//! Shapefile reading into a [`SourceLayer`].

use std::path::Path;

use anyhow::{bail, Context, Result};
use geo::{Contains, Coord, LineString, MultiPolygon, Point, Polygon};
use shapefile::{dbase::{FieldValue, Record}, PolygonRing, Reader, Shape};

use crate::types::{AttrValue, SourceFeature, SourceLayer};

/// Name dbase gives the record deletion marker in its field list.
const DELETION_FLAG: &str = "DeletionFlag";

/// Assemble rings into polygons: every hole goes to the first exterior containing it.
/// A hole contained by no exterior is kept as an exterior of its own.
fn assemble_rings(rings: Vec<(bool, Vec<Coord<f64>>)>) -> MultiPolygon<f64> {
    /// Ensure first and last are the same for geo::LineString coords
    fn closed(mut coords: Vec<Coord<f64>>) -> LineString<f64> {
        if let (Some(&first), Some(&last)) = (coords.first(), coords.last()) {
            if first != last { coords.push(first) }
        }
        LineString(coords)
    }

    let mut exteriors: Vec<(LineString<f64>, Vec<LineString<f64>>)> = Vec::new();
    let mut holes: Vec<LineString<f64>> = Vec::new();
    for (is_exterior, coords) in rings {
        if coords.len() < 3 { continue }
        if is_exterior {
            exteriors.push((closed(coords), Vec::new()));
        } else {
            holes.push(closed(coords));
        }
    }

    for hole in holes {
        let first = Point(hole.0[0]);
        let owner = exteriors.iter()
            .position(|(ext, _)| Polygon::new(ext.clone(), Vec::new()).contains(&first));
        match owner {
            Some(i) => exteriors[i].1.push(hole),
            None => exteriors.push((hole, Vec::new())),
        }
    }

    MultiPolygon(exteriors.into_iter().map(|(ext, holes)| Polygon::new(ext, holes)).collect())
}

/// Rings of any shapefile polygon flavour (plain, M, Z) as (is_exterior, coords).
macro_rules! polygon_rings {
    ($polygon:expr) => {
        $polygon.rings().iter()
            .map(|ring| match ring {
                PolygonRing::Outer(points) => (true, points.iter().map(|p| Coord { x: p.x, y: p.y }).collect()),
                PolygonRing::Inner(points) => (false, points.iter().map(|p| Coord { x: p.x, y: p.y }).collect()),
            })
            .collect::<Vec<(bool, Vec<Coord<f64>>)>>()
    };
}

/// Convert a shapefile shape to a MultiPolygon; `None` for null shapes.
pub(crate) fn shape_to_multipolygon(shape: Shape) -> Result<Option<MultiPolygon<f64>>> {
    Ok(match shape {
        Shape::NullShape => None,
        Shape::Polygon(p) => Some(assemble_rings(polygon_rings!(p))),
        Shape::PolygonM(p) => Some(assemble_rings(polygon_rings!(p))),
        Shape::PolygonZ(p) => Some(assemble_rings(polygon_rings!(p))),
        other => bail!("[io::shp] expected polygon shapes, found {:?}", other.shapetype()),
    })
}

/// Convert a dbase value into an attribute value.
fn field_value(value: Option<&FieldValue>) -> AttrValue {
    match value {
        Some(FieldValue::Character(Some(s))) => AttrValue::Text(s.clone()),
        Some(FieldValue::Memo(s)) => AttrValue::Text(s.clone()),
        Some(FieldValue::Numeric(Some(n))) => AttrValue::Number(*n),
        Some(FieldValue::Float(Some(n))) => AttrValue::Number(*n as f64),
        Some(FieldValue::Integer(n)) => AttrValue::Number(*n as f64),
        Some(FieldValue::Double(n)) => AttrValue::Number(*n),
        Some(FieldValue::Currency(n)) => AttrValue::Number(*n),
        Some(FieldValue::Logical(Some(b))) => AttrValue::Text(b.to_string()),
        _ => AttrValue::Null,
    }
}

/// Field names of the `.dbf` beside `path`, in table order.
fn read_field_names(path: &Path) -> Result<Vec<String>> {
    let dbf = path.with_extension("dbf");
    let table = shapefile::dbase::Reader::from_path(&dbf)
        .with_context(|| format!("[io::shp] Failed to open attribute table: {}", dbf.display()))?;
    Ok(table.fields().iter()
        .map(|field| field.name().to_string())
        .filter(|name| name != DELETION_FLAG)
        .collect())
}

/// Reads every feature of a polygon shapefile with its attributes in field order.
pub fn read_source_layer(path: &Path) -> Result<SourceLayer> {
    let fields = read_field_names(path)?;
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("[io::shp] Failed to open shapefile: {}", path.display()))?;

    let mut features = Vec::new();
    for result in reader.iter_shapes_and_records() {
        let (shape, record): (Shape, Record) = result
            .with_context(|| format!("[io::shp] Error reading shape+record from {}", path.display()))?;
        features.push(SourceFeature {
            geometry: shape_to_multipolygon(shape)?,
            values: fields.iter().map(|f| field_value(record.get(f))).collect(),
        });
    }
    SourceLayer::new(fields, features)
}

/// Points of a point shapefile shape; multipoints are flattened, null shapes are empty.
pub(crate) fn shape_to_points(shape: Shape) -> Result<Vec<Point<f64>>> {
    Ok(match shape {
        Shape::NullShape => Vec::new(),
        Shape::Point(p) => vec![Point::new(p.x, p.y)],
        Shape::PointM(p) => vec![Point::new(p.x, p.y)],
        Shape::PointZ(p) => vec![Point::new(p.x, p.y)],
        Shape::Multipoint(mp) => mp.points().iter().map(|p| Point::new(p.x, p.y)).collect(),
        Shape::MultipointM(mp) => mp.points().iter().map(|p| Point::new(p.x, p.y)).collect(),
        Shape::MultipointZ(mp) => mp.points().iter().map(|p| Point::new(p.x, p.y)).collect(),
        other => bail!("[io::shp] expected point shapes, found {:?}", other.shapetype()),
    })
}

/// Reads every point of a point shapefile, e.g. a facility layer.
pub fn read_points(path: &Path) -> Result<Vec<Point<f64>>> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("[io::shp] Failed to open shapefile: {}", path.display()))?;

    let mut points = Vec::new();
    for result in reader.iter_shapes_and_records() {
        let (shape, _): (Shape, Record) = result
            .with_context(|| format!("[io::shp] Error reading shape+record from {}", path.display()))?;
        points.extend(shape_to_points(shape)?);
    }
    Ok(points)
}
