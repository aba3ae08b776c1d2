use geo::MultiPolygon;

/// Country metadata needed to fill the fixed output contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryInfo {
    pub iso3: String,
    pub iso2: String,
    pub name: String,
}

/// A keyed subdivision while a country is in flight through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Subdivision {
    pub code:     String,
    pub name:     String,
    pub geometry: MultiPolygon<f64>,
}

/// One admin1 subdivision of the global dataset, in WGS84.
#[derive(Debug, Clone, PartialEq)]
pub struct SubdivisionRecord {
    pub country_code:     String, // ISO3, e.g. "AFG"
    pub country_name:     String,
    pub country_pcode2:   String, // ISO2, e.g. "AF"
    pub subdivision_code: String, // unique within the country, e.g. "AF01"
    pub subdivision_name: String,
    pub geometry:         MultiPolygon<f64>,
}

impl SubdivisionRecord {
    /// Attach country keys to a finished subdivision.
    pub fn new(country: &CountryInfo, subdivision: Subdivision) -> Self {
        Self {
            country_code:     country.iso3.clone(),
            country_name:     country.name.clone(),
            country_pcode2:   country.iso2.clone(),
            subdivision_code: subdivision.code,
            subdivision_name: subdivision.name,
            geometry:         subdivision.geometry,
        }
    }
}
