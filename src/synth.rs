//! Seeded synthetic payloads and filter specs for law checks and benches.

use chrono::{TimeZone, Utc};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde_json::{json, Map, Value};

use crate::classify::{Category, Severity};
use crate::filter::{FilterSpec, HOUR_MS};
use crate::index::EventIndex;
use crate::raw::RawRecord;

const TYPES: &[&str] = &[
    "Naval drone attack on vessel",
    "Kamikaze drone strike",
    "Shahed UAV",
    "Ballistic missile strike",
    "Cruise missile",
    "Airstrike with glide bomb",
    "Artillery shelling",
    "Mortar fire",
    "IED explosion",
    "Landmine",
    "Firefight",
    "Ambush on convoy",
    "Protest",
    "Diplomatic talks",
    "Warehouse fire",
    "Humanitarian convoy",
    "weather",
    "",
];

const TITLES: &[&str] = &[
    "Russian forces shell Kharkiv",
    "Ukrainian drones hit depot near Kherson",
    "Explosions reported in Kyiv",
    "Strike on Odesa port",
    "ZSU repels assault near Bakhmut",
    "Kremlin comments on Zaporizhzhia",
    "Quiet night in Lviv",
    "Air raid alert across the country",
];

const DATE_SHAPES: &[&str] = &["%d/%m/%y", "%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y", "%d.%m.%Y"];
const ACTORS: &[&str] = &["rus", "ukr", "", "UNK"];
const CLASSIFICATIONS: &[&str] = &["MANOEUVRE", "SHAPING_OFFENSIVE", "ATTRITION", ""];

fn pick<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or("")
}

/// `n` raw records spread over `days` days ending at `end_ms`. Roughly one in
/// ten has junk coordinates and one in twenty an unparsable date.
pub fn synthetic_records(seed: u64, n: usize, end_ms: i64, days: i64) -> Vec<RawRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let span = (days.max(1) * 24 * HOUR_MS).max(1);
    (0..n)
        .map(|i| {
            let ts = end_ms - rng.gen_range(0..span);
            let date = Utc
                .timestamp_millis_opt(ts)
                .single()
                .map(|dt| dt.format(pick(&mut rng, DATE_SHAPES)).to_string())
                .unwrap_or_default();
            let mut props = Map::new();
            props.insert("event_id".into(), json!(format!("syn-{}", i)));
            props.insert("title".into(), json!(pick(&mut rng, TITLES)));
            props.insert("type".into(), json!(pick(&mut rng, TYPES)));
            props.insert(
                "date".into(),
                json!(if rng.gen_bool(0.05) { "unknown".to_string() } else { date }),
            );
            props.insert("intensity".into(), json!((rng.gen::<f64>() * 100.0).round() / 100.0));
            props.insert("tie_total".into(), json!(rng.gen_range(0..160)));
            props.insert("actor_code".into(), json!(pick(&mut rng, ACTORS)));
            props.insert("classification".into(), json!(pick(&mut rng, CLASSIFICATIONS)));
            if rng.gen_bool(0.1) {
                props.insert("lat".into(), json!(0));
                props.insert("lon".into(), json!(0));
            } else {
                props.insert("lat".into(), json!(rng.gen_range(44.0..52.5)));
                props.insert("lon".into(), json!(rng.gen_range(22.0..40.0)));
            }
            RawRecord::new(props)
        })
        .collect()
}

/// A random spec with each predicate switched on independently.
pub fn random_spec(rng: &mut StdRng, index: &EventIndex) -> FilterSpec {
    let mut spec = FilterSpec::default();
    if let (Some(min), Some(max)) = (index.min_timestamp(), index.max_timestamp()) {
        if rng.gen_bool(0.3) {
            spec.start_ts = Some(rng.gen_range(min..=max));
        }
        if rng.gen_bool(0.3) {
            spec.end_ts = Some(rng.gen_range(min..=max));
        }
    }
    if rng.gen_bool(0.25) {
        spec.category = Category::ALL.choose(rng).map(|c| c.label().to_string());
    }
    if rng.gen_bool(0.2) {
        spec.actor = Some(pick(rng, &["RUS", "UKR", "UNK"]).to_string());
    }
    if rng.gen_bool(0.3) {
        spec.query = Some(pick(rng, &["kiev", "kyiv", "kharkov", "russia", "drone", "port"]).to_string());
    }
    if rng.gen_bool(0.3) {
        spec.severities = Severity::ALL
            .iter()
            .copied()
            .filter(|_| rng.gen_bool(0.5))
            .collect();
    }
    if rng.gen_bool(0.3) {
        spec.recency_hours = rng.gen_range(1..=240);
        spec.persistence = rng.gen_bool(0.5);
    }
    spec
}

/// Drop one active predicate at random; the result is never narrower.
pub fn widen(rng: &mut StdRng, spec: &FilterSpec) -> FilterSpec {
    let active = spec.active_predicates();
    let mut wide = spec.clone();
    match active.choose(rng).copied() {
        Some("date") => {
            wide.start_ts = None;
            wide.end_ts = None;
        }
        Some("category") => wide.category = None,
        Some("actor") => wide.actor = None,
        Some("search") => wide.query = None,
        Some("severity") => wide.severities.clear(),
        Some("recency") => wide.recency_hours = 0,
        _ => {}
    }
    wide
}

/// JSON FeatureCollection body for `records`.
pub fn feature_collection(records: &[RawRecord]) -> Value {
    let features: Vec<Value> = records
        .iter()
        .map(|r| {
            let geometry = match r.coordinates {
                Some([lon, lat]) => json!({"type": "Point", "coordinates": [lon, lat]}),
                None => Value::Null,
            };
            json!({
                "type": "Feature",
                "geometry": geometry,
                "properties": Value::Object(r.properties.clone()),
            })
        })
        .collect();
    json!({"type": "FeatureCollection", "features": features})
}
