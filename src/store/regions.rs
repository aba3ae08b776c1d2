use std::collections::{BTreeMap, BTreeSet};

use geo::{BoundingRect, Polygon, Rect};
use log::{debug, warn};
use serde_json::{Map, Value};

use crate::error::RegionLookupGap;
use crate::geom::merge_rects;
use crate::reconcile::CountryOutlines;
use crate::store::GlobalMergeStore;

/// Name of the group made of every HRP country.
pub const HRP_GROUP: &str = "HRPs";

/// ISO3 → region name, as read from the regional office table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionAssignment {
    regions: BTreeMap<String, String>,
}

impl RegionAssignment {
    pub fn new(regions: BTreeMap<String, String>) -> Self { Self { regions } }

    pub fn region(&self, iso3: &str) -> Option<&str> {
        self.regions.get(iso3).map(String::as_str)
    }
}

impl FromIterator<(String, String)> for RegionAssignment {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self { regions: iter.into_iter().collect() }
    }
}

/// Bounding box of one region (or of the HRP group).
#[derive(Debug, Clone, PartialEq)]
pub struct RegionalBbox {
    pub region: String,
    pub bbox:   [f64; 4], // [minx, miny, maxx, maxy]
}

impl RegionalBbox {
    fn from_rect(region: &str, rect: Rect<f64>) -> Self {
        Self { region: region.to_string(), bbox: [rect.min().x, rect.min().y, rect.max().x, rect.max().y] }
    }

    /// The box as a closed polygon.
    pub fn polygon(&self) -> Polygon<f64> {
        let [minx, miny, maxx, maxy] = self.bbox;
        Rect::new((minx, miny), (maxx, maxy)).to_polygon()
    }
}

/// A regional bounding box feature ready to be written, with its properties.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionFeature {
    pub properties: Map<String, Value>,
    pub bbox:       RegionalBbox,
}

impl GlobalMergeStore {
    /// Extent of one country: its admin0 outline, or else its stored admin1 records.
    fn country_extent(&self, outlines: &CountryOutlines, iso3: &str) -> Option<Rect<f64>> {
        outlines.extent(iso3).or_else(|| {
            self.country(iso3)?.iter()
                .filter_map(|r| r.geometry.bounding_rect())
                .reduce(merge_rects)
        })
    }

    /// One bounding box per region of the `countries`, plus one for the HRP countries.
    /// Regions come out sorted by name with the HRP group last.
    pub fn derive_regional_bbox(
        &self,
        outlines:  &CountryOutlines,
        countries: &[String],
        regions:   &RegionAssignment,
        hrps:      &[String],
    ) -> Vec<RegionalBbox> {
        let mut groups: BTreeMap<&str, Rect<f64>> = BTreeMap::new();
        let mut unassigned: BTreeSet<&str> = BTreeSet::new();
        for iso3 in countries {
            let Some(region) = regions.region(iso3) else {
                unassigned.insert(iso3.as_str());
                continue;
            };
            let Some(rect) = self.country_extent(outlines, iso3) else {
                warn!("[store::regions] no geometry for {iso3}, left out of {region}");
                continue;
            };
            groups.entry(region)
                .and_modify(|acc| *acc = merge_rects(*acc, rect))
                .or_insert(rect);
        }
        if !unassigned.is_empty() {
            debug!("[store::regions] countries without a region: {}", unassigned.into_iter().collect::<Vec<_>>().join(", "));
        }

        let mut boxes: Vec<RegionalBbox> = groups.into_iter()
            .map(|(region, rect)| RegionalBbox::from_rect(region, rect))
            .collect();

        let hrp_rect = hrps.iter()
            .filter_map(|iso3| self.country_extent(outlines, iso3))
            .reduce(merge_rects);
        if let Some(rect) = hrp_rect {
            boxes.push(RegionalBbox::from_rect(HRP_GROUP, rect));
        }
        boxes
    }
}

/// Features keyed by `key` for freshly computed boxes.
pub fn region_features(key: &str, computed: &[RegionalBbox]) -> Vec<RegionFeature> {
    computed.iter()
        .map(|bbox| {
            let mut properties = Map::new();
            properties.insert(key.to_string(), Value::String(bbox.region.clone()));
            RegionFeature { properties, bbox: bbox.clone() }
        })
        .collect()
}

/// Refresh an existing template: each template feature keeps its properties and
/// takes the computed box of the region named by `key`. Template regions with no
/// computed box are dropped and reported.
pub fn apply_region_template(
    template: Vec<Map<String, Value>>,
    key:      &str,
    computed: &[RegionalBbox],
) -> (Vec<RegionFeature>, Vec<RegionLookupGap>) {
    let mut features = Vec::with_capacity(template.len());
    let mut gaps = Vec::new();
    for properties in template {
        let region = properties.get(key).and_then(Value::as_str).unwrap_or_default().to_string();
        match computed.iter().find(|b| b.region == region) {
            Some(bbox) => features.push(RegionFeature { properties, bbox: bbox.clone() }),
            None => {
                warn!("[store::regions] template region {region:?} has no computed bounding box; dropped");
                gaps.push(RegionLookupGap { region });
            }
        }
    }
    (features, gaps)
}
