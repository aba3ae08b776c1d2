use std::fmt;

use geo::Point;
use log::warn;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::geom::Geometries;
use crate::store::GlobalMergeStore;

/// Interior point of a subdivision, keyed like the subdivision itself.
#[derive(Debug, Clone, PartialEq)]
pub struct CentroidRecord {
    pub country_code:     String,
    pub country_name:     String,
    pub country_pcode2:   String,
    pub subdivision_code: String,
    pub subdivision_name: String,
    pub point:            Point<f64>,
}

/// One line of a visualization's admin1 attribute lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRecord {
    pub country: String,
    pub iso3:    String,
    pub pcode:   String,
    pub name:    String,
}

/// Name as shown in lookups: diacritics removed, hyphens as spaces,
/// apostrophes and backticks dropped.
pub fn display_name(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| !matches!(c, '\'' | '`' | '\u{2019}'))
        .map(|c| if c == '-' { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Quote values that would otherwise split the flow mapping.
fn lookup_value(value: &str) -> String {
    if value.contains(',') { format!("\"{value}\"") } else { value.to_string() }
}

impl fmt::Display for LookupRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "- {{country: {}, iso3: {}, pcode: {}, name: {}}}",
            lookup_value(&self.country), self.iso3, self.pcode, lookup_value(&self.name))
    }
}

impl GlobalMergeStore {
    /// One interior point per stored subdivision.
    pub fn derive_centroids(&self) -> Vec<CentroidRecord> {
        let records: Vec<_> = self.records().collect();
        let points = Geometries::new(records.iter().map(|r| r.geometry.clone()).collect()).interior_points();
        records.into_iter().zip(points)
            .filter_map(|(record, point)| {
                let Some(point) = point else {
                    warn!("[store::derive] {} {} has no interior point", record.country_code, record.subdivision_code);
                    return None;
                };
                Some(CentroidRecord {
                    country_code:     record.country_code.clone(),
                    country_name:     record.country_name.clone(),
                    country_pcode2:   record.country_pcode2.clone(),
                    subdivision_code: record.subdivision_code.clone(),
                    subdivision_name: record.subdivision_name.clone(),
                    point,
                })
            })
            .collect()
    }

    /// Lookup entries for the given countries (all when `None`), sorted by
    /// display country then display name.
    pub fn derive_attribute_lookup(&self, countries: Option<&[String]>) -> Vec<LookupRecord> {
        let mut lookup: Vec<LookupRecord> = self.records()
            .filter(|r| countries.is_none_or(|list| list.contains(&r.country_code)))
            .map(|r| LookupRecord {
                country: display_name(&r.country_name),
                iso3:    r.country_code.clone(),
                pcode:   r.subdivision_code.clone(),
                name:    display_name(&r.subdivision_name),
            })
            .collect();
        lookup.sort_by(|a, b| (&a.country, &a.name, &a.pcode).cmp(&(&b.country, &b.name, &b.pcode)));
        lookup
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SubdivisionRecord;
    use geo::{polygon, Contains, Intersects, MultiPolygon};

    fn record(iso3: &str, country: &str, code: &str, name: &str, shape: MultiPolygon<f64>) -> SubdivisionRecord {
        SubdivisionRecord {
            country_code:     iso3.into(),
            country_name:     country.into(),
            country_pcode2:   iso3[..2].into(),
            subdivision_code: code.into(),
            subdivision_name: name.into(),
            geometry:         shape,
        }
    }

    fn c_shape() -> MultiPolygon<f64> {
        // Concave "C": the plain centroid falls outside the shape.
        MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0), (x: 3.0, y: 0.0), (x: 3.0, y: 1.0), (x: 1.0, y: 1.0),
            (x: 1.0, y: 2.0), (x: 3.0, y: 2.0), (x: 3.0, y: 3.0), (x: 0.0, y: 3.0), (x: 0.0, y: 0.0),
        ]])
    }

    #[test]
    fn display_names_are_normalized() {
        assert_eq!(display_name("Hérat"), "Herat");
        assert_eq!(display_name("Nangarhār"), "Nangarhar");
        assert_eq!(display_name("Cote d'Ivoire"), "Cote dIvoire");
        assert_eq!(display_name("Kohgīlūyeh-Boyer-Ahmad"), "Kohgiluyeh Boyer Ahmad");
        assert_eq!(display_name("Ta`izz"), "Taizz");
    }

    #[test]
    fn lookup_lines_quote_commas() {
        let row = LookupRecord {
            country: "Congo, The Democratic Republic of the".into(),
            iso3: "COD".into(),
            pcode: "CD10".into(),
            name: "Kinshasa".into(),
        };
        assert_eq!(row.to_string(),
            "- {country: \"Congo, The Democratic Republic of the\", iso3: COD, pcode: CD10, name: Kinshasa}");
        let row = LookupRecord { name: "A, B".into(), ..row };
        assert!(row.to_string().ends_with("name: \"A, B\"}"));
    }

    #[test]
    fn lookup_is_sorted_and_filtered() {
        let shape = c_shape();
        let store = GlobalMergeStore::from_records(vec![
            record("SDN", "Sudan", "SD02", "Khartoum", shape.clone()),
            record("AFG", "Afghanistan", "AF02", "Kabul", shape.clone()),
            record("AFG", "Afghanistan", "AF01", "Badakhshan", shape.clone()),
            record("TCD", "Chad", "TD01", "Batha", shape),
        ]);
        let all = store.derive_attribute_lookup(None);
        let codes: Vec<&str> = all.iter().map(|r| r.pcode.as_str()).collect();
        assert_eq!(codes, vec!["AF01", "AF02", "TD01", "SD02"]);

        let some = store.derive_attribute_lookup(Some(["SDN".to_string()].as_slice()));
        assert_eq!(some.len(), 1);
        assert_eq!(some[0].name, "Khartoum");
    }

    #[test]
    fn centroids_lie_within_their_shapes() {
        let shape = c_shape();
        let store = GlobalMergeStore::from_records(vec![record("AFG", "Afghanistan", "AF01", "Kabul", shape.clone())]);
        let centroids = store.derive_centroids();
        assert_eq!(centroids.len(), 1);
        let point = centroids[0].point;
        assert!(shape.contains(&point) || shape.intersects(&point));
        assert_eq!(centroids[0].subdivision_code, "AF01");
    }
}
