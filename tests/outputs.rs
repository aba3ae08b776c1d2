// Published files: admin1 layer round-trip, centroids, lookups, regional boxes
//   and per-subdivision statistics tables.

use std::{collections::BTreeMap, fs};

use adminbounds::{
    apply_region_template, read_population_table, read_subdivisions, region_features,
    write_centroids, write_lookup, write_regions, write_stat_table, write_subdivisions,
    CountryOutlines, GlobalMergeStore, OutlineFeature, RegionAssignment, SubdivisionRecord, CRS84,
    HEALTH_FACILITIES, POPULATION,
};
use geo::{polygon, Contains, MultiPolygon, Point};
use serde_json::Value;

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> MultiPolygon<f64> {
    MultiPolygon(vec![polygon![
        (x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1), (x: x0, y: y0),
    ]])
}

fn record(iso3: &str, country: &str, code: &str, name: &str, shape: MultiPolygon<f64>) -> SubdivisionRecord {
    SubdivisionRecord {
        country_code:     iso3.to_string(),
        country_name:     country.to_string(),
        country_pcode2:   code[..2].to_string(),
        subdivision_code: code.to_string(),
        subdivision_name: name.to_string(),
        geometry:         shape,
    }
}

fn store() -> GlobalMergeStore {
    GlobalMergeStore::from_records([
        record("AFG", "Afghanistan", "AF01", "Kābul", rect(69.0, 34.0, 69.5, 34.75)),
        record("AFG", "Afghanistan", "AF02", "Kapisa", rect(69.5, 34.0, 70.0, 35.0)),
        record("SDN", "Sudan", "SD01", "Khartoum", rect(32.0, 15.0, 34.0, 16.5)),
        record("CIV", "Côte d'Ivoire", "CI01", "Abidjan", rect(-4.3, 5.2, -3.7, 5.6)),
    ])
}

fn read(path: &std::path::Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn admin1_layer_round_trips_through_geojson() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wrl_polbnda_adm1.geojson");
    let store = store();

    write_subdivisions(&path, store.records()).unwrap();
    let json = read(&path);
    assert_eq!(json["crs"]["properties"]["name"], CRS84);
    assert_eq!(json["features"][0]["properties"]["alpha_3"], "AFG");
    assert_eq!(json["features"][0]["properties"]["ADM1_PCODE"], "AF01");

    let back = GlobalMergeStore::from_records(read_subdivisions(&path).unwrap());
    assert_eq!(back, store);
}

#[test]
fn centroids_are_points_inside_their_subdivisions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wrl_centroid_adm1.geojson");
    let store = store();
    let centroids = store.derive_centroids();
    assert_eq!(centroids.len(), store.len());

    for (centroid, record) in centroids.iter().zip(store.records()) {
        assert_eq!(centroid.subdivision_code, record.subdivision_code);
        assert!(record.geometry.contains(&centroid.point));
    }

    write_centroids(&path, &centroids).unwrap();
    let json = read(&path);
    assert!(json.get("crs").is_none());
    assert_eq!(json["features"][0]["geometry"]["type"], "Point");
}

#[test]
fn lookup_file_lists_normalized_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hno_adm1_attributes.txt");
    let store = store();
    let countries = vec!["AFG".to_string(), "CIV".to_string()];

    write_lookup(&path, &store.derive_attribute_lookup(Some(countries.as_slice()))).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text, "\
- {country: Afghanistan, iso3: AFG, pcode: AF01, name: Kabul}
- {country: Afghanistan, iso3: AFG, pcode: AF02, name: Kapisa}
- {country: Cote dIvoire, iso3: CIV, pcode: CI01, name: Abidjan}
");
}

#[test]
fn regional_boxes_group_countries_and_hrps() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hno_regions_bbox.geojson");
    let store = store();
    let outlines = CountryOutlines::new(vec![OutlineFeature {
        iso3:       Some("SDN".to_string()),
        color_code: None,
        geometry:   rect(21.8, 8.6, 38.6, 22.2),
    }]);
    let regions: RegionAssignment = [
        ("AFG".to_string(), "ROAP".to_string()),
        ("SDN".to_string(), "ROMENA".to_string()),
    ].into_iter().collect();
    let countries = vec!["AFG".to_string(), "SDN".to_string()];
    let hrps = vec!["AFG".to_string(), "SDN".to_string()];

    let computed = store.derive_regional_bbox(&outlines, &countries, &regions, &hrps);
    let names: Vec<&str> = computed.iter().map(|b| b.region.as_str()).collect();
    assert_eq!(names, ["ROAP", "ROMENA", "HRPs"]);
    // SDN extent comes from its outline, AFG from its stored records.
    assert_eq!(computed[1].bbox, [21.8, 8.6, 38.6, 22.2]);
    assert_eq!(computed[0].bbox, [69.0, 34.0, 70.0, 35.0]);
    assert_eq!(computed[2].bbox, [21.8, 8.6, 70.0, 35.0]);

    let key = "tbl_regcov_2020_ocha_Field3";
    write_regions(&path, &region_features(key, &computed)).unwrap();
    let json = read(&path);
    assert_eq!(json["crs"]["properties"]["name"], CRS84);
    assert_eq!(json["features"][2]["properties"][key], "HRPs");
    assert_eq!(json["features"][0]["bbox"], serde_json::json!([69.0, 34.0, 70.0, 35.0]));
    assert_eq!(json["features"][0]["geometry"]["type"], "Polygon");

    let mut template = serde_json::Map::new();
    template.insert(key.to_string(), Value::from("ROLAC"));
    let (features, gaps) = apply_region_template(vec![template], key, &computed);
    assert!(features.is_empty());
    assert_eq!(gaps[0].region, "ROLAC");
}

#[test]
fn population_table_joins_published_codes() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("afg_pop_adm1.csv");
    fs::write(&source, "\
ADM0_EN,ADM1_EN,ADM1_PCODE,F_TL,M_TL,T_TL
Afghanistan,Kabul,AF01,2500000,2704400,5204400
Afghanistan,Kapisa,AF02,220000,230000,450000
").unwrap();
    let tables = BTreeMap::from([("AFG".to_string(), read_population_table(&source).unwrap())]);
    let countries = vec!["AFG".to_string(), "SDN".to_string()];

    let path = dir.path().join("population_by_adm1.csv");
    write_stat_table(&path, POPULATION, &store().derive_population(&countries, &tables)).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "\
alpha_3,ADM0_REF,ADM1_PCODE,ADM1_REF,Population
AFG,Afghanistan,AF01,Kābul,5204400
AFG,Afghanistan,AF02,Kapisa,450000
SDN,Sudan,SD01,Khartoum,
");
}

#[test]
fn facility_counts_cover_every_selected_subdivision() {
    let dir = tempfile::tempdir().unwrap();
    let facilities = BTreeMap::from([
        ("AFG".to_string(), vec![Point::new(69.2, 34.5), Point::new(69.7, 34.9), Point::new(69.8, 34.1)]),
    ]);
    let countries = vec!["AFG".to_string(), "CIV".to_string()];
    let rows = store().derive_health_facilities(&countries, &facilities);

    let path = dir.path().join("health_facilities_by_adm1.csv");
    write_stat_table(&path, HEALTH_FACILITIES, &rows).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "alpha_3,ADM0_REF,ADM1_PCODE,ADM1_REF,Health_Facilities");
    assert_eq!(lines[1], "AFG,Afghanistan,AF01,Kābul,1");
    assert_eq!(lines[2], "AFG,Afghanistan,AF02,Kapisa,2");
    assert!(lines[3].starts_with("CIV,") && lines[3].ends_with(",Abidjan,"));
}
