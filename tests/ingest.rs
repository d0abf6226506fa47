use serde_json::json;
use std::fs;
use tempfile::TempDir;

use sitrep::config::EngineConfig;
use sitrep::index::EventIndex;
use sitrep::raw::{load_path, payload_sha256};
use sitrep::synonyms::SynonymTable;
use sitrep::synth::{feature_collection, synthetic_records};

const NOW: i64 = 1_712_000_000_000;

#[test]
fn loads_feature_collection_from_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.geojson");
    let body = json!({
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [36.23, 49.99]},
                "properties": {"event_id": "e1", "type": "Artillery shelling", "date": "14/03/2024"}
            },
            {
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [0, 0]},
                "properties": {"event_id": "e2", "type": "Airstrike"}
            },
            {
                "type": "Feature",
                "geometry": null,
                "properties": {"event_id": "e3", "lat": "46.6", "lon": "32.6", "date": "March 12, 2024"}
            },
            {"type": "Feature", "geometry": null, "properties": null}
        ]
    })
    .to_string();
    fs::write(&path, &body).unwrap();

    let (raws, info) = load_path(&path).unwrap();
    assert_eq!(info.features, 3);
    assert_eq!(info.skipped, 1);
    assert_eq!(info.sha256, payload_sha256(body.as_bytes()));

    let index = EventIndex::build(&raws, SynonymTable::default(), NOW);
    let report = index.report();
    assert_eq!(report.seen, 3);
    assert_eq!(report.indexed, 2);
    assert_eq!(report.dropped_coords, 1);
    assert_eq!(report.date_heuristic, 1);
    assert_eq!(index.all()[0].id, "e1");

    let e1 = index.by_id("e1").unwrap();
    assert_eq!((e1.lat, e1.lon), (49.99, 36.23));
    let e3 = index.by_id("e3").unwrap();
    assert_eq!(e3.category, None);
}

#[test]
fn synthetic_payload_survives_the_disk_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("synthetic.geojson");
    let records = synthetic_records(5, 120, NOW, 14);
    fs::write(&path, feature_collection(&records).to_string()).unwrap();

    let (loaded, info) = load_path(&path).unwrap();
    assert_eq!(info.features, records.len());
    let direct = EventIndex::build(&records, SynonymTable::default(), NOW);
    let from_disk = EventIndex::build(&loaded, SynonymTable::default(), NOW);
    assert_eq!(direct.report(), from_disk.report());
    let a: Vec<&str> = direct.all().iter().map(|e| e.id.as_str()).collect();
    let b: Vec<&str> = from_disk.all().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(a, b);
}

#[test]
fn malformed_payloads_are_errors() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.geojson");
    fs::write(&path, "{\"type\": \"FeatureCollection\"}").unwrap();
    assert!(load_path(&path).is_err());
    fs::write(&path, "not json").unwrap();
    assert!(load_path(&path).is_err());
    assert!(load_path(&dir.path().join("missing.geojson")).is_err());
}

#[test]
fn custom_synonym_file_feeds_search() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("synonyms.json");
    fs::write(&path, json!({"bakhmut": "artemivsk"}).to_string()).unwrap();

    let cfg = EngineConfig { synonyms_path: Some(path), ..EngineConfig::default() };
    let table = cfg.synonyms().unwrap();
    assert_eq!(table.len(), 1);

    let raws = vec![sitrep::RawRecord::new(
        json!({"id": "x", "title": "Fighting in Artemivsk", "lat": 48.6, "lon": 38.0})
            .as_object()
            .cloned()
            .unwrap(),
    )];
    let index = EventIndex::build(&raws, table, NOW);
    let spec = sitrep::FilterSpec { query: Some("bakhmut".into()), ..Default::default() };
    assert_eq!(sitrep::apply(&index, &spec).len(), 1);
}
