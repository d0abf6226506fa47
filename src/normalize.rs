//! Raw record to canonical [`Event`].
//!
//! Normalization never fails. Every field has a documented default, so
//! everything downstream can assume a fully populated event.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::classify::{classify_category, derive_side, severity_for, Category, Severity, Side};
use crate::logging::log_date_fallback;
use crate::raw::RawRecord;
use crate::synonyms::SynonymTable;

pub const DEFAULT_INTENSITY: f64 = 0.2;
pub const DEFAULT_ACTOR: &str = "UNK";

/// Which parse path produced an event's timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    Strict,
    Heuristic,
    Now,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Epoch milliseconds, UTC.
    pub timestamp: i64,
    pub date_source: DateSource,
    pub lat: f64,
    pub lon: f64,
    pub raw_type: String,
    pub category: Option<Category>,
    pub intensity: f64,
    pub severity: Severity,
    pub side: Side,
    pub actor_code: String,
    pub classification: String,
    pub tie_total: f64,
    pub vec_t: f64,
    pub vec_k: f64,
    pub vec_e: f64,
    #[serde(skip)]
    pub search_blob: String,
}

impl Event {
    pub fn category_label(&self) -> Option<&'static str> {
        self.category.as_ref().map(Category::label)
    }
}

/// Normalized record before coordinate validation.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub event: Event,
    /// False when the id was synthesized.
    pub has_source_id: bool,
    pub coords_ok: bool,
}

// =============================================================================
// Dates
// =============================================================================

struct StrictFormat {
    sep: char,
    widths: [(usize, usize); 3],
    chrono_fmt: &'static str,
}

/// Tried in order; the first shape and calendar match wins.
const STRICT_FORMATS: &[StrictFormat] = &[
    // DD/MM/YY
    StrictFormat { sep: '/', widths: [(1, 2), (1, 2), (2, 2)], chrono_fmt: "%d/%m/%y" },
    // DD/MM/YYYY
    StrictFormat { sep: '/', widths: [(1, 2), (1, 2), (4, 4)], chrono_fmt: "%d/%m/%Y" },
    // YYYY-MM-DD
    StrictFormat { sep: '-', widths: [(4, 4), (1, 2), (1, 2)], chrono_fmt: "%Y-%m-%d" },
    // DD-MM-YYYY
    StrictFormat { sep: '-', widths: [(1, 2), (1, 2), (4, 4)], chrono_fmt: "%d-%m-%Y" },
    // DD.MM.YYYY
    StrictFormat { sep: '.', widths: [(1, 2), (1, 2), (4, 4)], chrono_fmt: "%d.%m.%Y" },
    // MM/DD/YYYY
    StrictFormat { sep: '/', widths: [(1, 2), (1, 2), (4, 4)], chrono_fmt: "%m/%d/%Y" },
];

impl StrictFormat {
    fn shape_matches(&self, s: &str) -> bool {
        let parts: Vec<&str> = s.split(self.sep).collect();
        parts.len() == 3
            && parts.iter().zip(self.widths.iter()).all(|(p, (min, max))| {
                (*min..=*max).contains(&p.len()) && p.bytes().all(|b| b.is_ascii_digit())
            })
    }

    fn parse(&self, s: &str) -> Option<NaiveDate> {
        if !self.shape_matches(s) {
            return None;
        }
        NaiveDate::parse_from_str(s, self.chrono_fmt).ok()
    }
}

const HEURISTIC_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M",
    "%d.%m.%Y %H:%M",
];

const HEURISTIC_DATE_FORMATS: &[&str] = &[
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%Y/%m/%d",
    "%Y.%m.%d",
];

fn midnight_ms(date: NaiveDate) -> Option<i64> {
    date.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt).timestamp_millis())
}

/// One of the six fixed numeric layouts, as UTC midnight.
pub fn parse_strict_date(raw: &str) -> Option<i64> {
    let s = raw.trim();
    STRICT_FORMATS.iter().find_map(|f| f.parse(s)).and_then(midnight_ms)
}

fn heuristic_calendar_date(s: &str) -> Option<i64> {
    HEURISTIC_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(midnight_ms)
}

/// A bare calendar date with no time of day (strict layouts, month names,
/// `YYYY/MM/DD`), as UTC midnight.
pub fn parse_calendar_date(raw: &str) -> Option<i64> {
    let s = raw.trim();
    parse_strict_date(s).or_else(|| heuristic_calendar_date(s))
}

/// Permissive parsing for anything the strict layouts reject.
pub fn parse_heuristic_date(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.timestamp_millis());
    }
    for fmt in HEURISTIC_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&dt).timestamp_millis());
        }
    }
    if let Some(ts) = heuristic_calendar_date(s) {
        return Some(ts);
    }
    if s.bytes().all(|b| b.is_ascii_digit()) && (9..=13).contains(&s.len()) {
        let n: i64 = s.parse().ok()?;
        // Ten digits or fewer reads as seconds.
        return Some(if s.len() <= 10 { n * 1000 } else { n });
    }
    // Leading ISO date followed by anything else.
    s.get(..10)
        .filter(|head| head.as_bytes().get(4) == Some(&b'-'))
        .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
        .and_then(midnight_ms)
}

/// Strict layouts, then heuristics, then `now_ms`.
pub fn parse_date(raw: Option<&str>, now_ms: i64) -> (i64, DateSource) {
    let Some(raw) = raw else {
        return (now_ms, DateSource::Now);
    };
    if let Some(ts) = parse_strict_date(raw) {
        return (ts, DateSource::Strict);
    }
    if let Some(ts) = parse_heuristic_date(raw) {
        return (ts, DateSource::Heuristic);
    }
    (now_ms, DateSource::Now)
}

// =============================================================================
// Search blob
// =============================================================================

fn push_value_text(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Null => {}
        Value::String(s) => {
            let t = s.trim();
            if !t.is_empty() {
                out.push(t.to_lowercase());
            }
        }
        Value::Number(n) => out.push(n.to_string()),
        Value::Bool(b) => out.push(b.to_string()),
        Value::Array(items) => items.iter().for_each(|v| push_value_text(v, out)),
        Value::Object(map) => map.values().for_each(|v| push_value_text(v, out)),
    }
}

/// Lowercase text of every non-empty property (key order), then the
/// synonym counterparts of names found in the title.
pub fn build_search_blob(raw: &RawRecord, title: &str, synonyms: &SynonymTable) -> String {
    let mut parts = Vec::new();
    for value in raw.properties.values() {
        push_value_text(value, &mut parts);
    }
    let title_lc = title.to_lowercase();
    parts.extend(synonyms.counterparts_in(&title_lc).into_iter().map(str::to_string));
    parts.join(" ")
}

// =============================================================================
// Normalizer
// =============================================================================

fn synthesized_id(raw: &RawRecord) -> String {
    let mut hasher = Sha256::new();
    hasher.update(Value::Object(raw.properties.clone()).to_string().as_bytes());
    if let Some([lon, lat]) = raw.coordinates {
        hasher.update(lon.to_le_bytes());
        hasher.update(lat.to_le_bytes());
    }
    format!("gen-{}", &hex::encode(hasher.finalize())[..12])
}

fn usable_coord(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite() && *x != 0.0)
}

/// Converts raw records with a fixed clock and synonym table.
#[derive(Debug, Clone)]
pub struct Normalizer<'a> {
    synonyms: &'a SynonymTable,
    now_ms: i64,
}

impl<'a> Normalizer<'a> {
    pub fn new(synonyms: &'a SynonymTable, now_ms: i64) -> Self {
        Self { synonyms, now_ms }
    }

    pub fn normalize(&self, raw: &RawRecord) -> Normalized {
        let source_id = ["event_id", "cluster_id", "id"]
            .iter()
            .find_map(|key| raw.text(key));
        let has_source_id = source_id.is_some();
        let id = source_id.unwrap_or_else(|| synthesized_id(raw));

        let title = raw.text("title").unwrap_or_default();
        let description = raw.text("description").unwrap_or_default();
        let raw_type = raw.text("type").unwrap_or_default();

        let raw_date = raw.text("date");
        let (timestamp, date_source) = parse_date(raw_date.as_deref(), self.now_ms);
        if date_source != DateSource::Strict {
            log_date_fallback(
                &id,
                raw_date.as_deref().unwrap_or(""),
                match date_source {
                    DateSource::Heuristic => "heuristic",
                    _ => "now",
                },
            );
        }

        let point = raw.coordinates;
        let lat = usable_coord(raw.number("lat")).or_else(|| usable_coord(point.map(|p| p[1])));
        let lon = usable_coord(raw.number("lon")).or_else(|| usable_coord(point.map(|p| p[0])));
        let coords_ok = lat.is_some() && lon.is_some();

        let intensity = raw.number("intensity").unwrap_or(DEFAULT_INTENSITY);
        let actor_code = raw
            .text("actor_code")
            .map(|a| a.to_uppercase())
            .unwrap_or_else(|| DEFAULT_ACTOR.to_string());
        let classification = raw
            .text("classification")
            .map(|c| c.to_uppercase())
            .unwrap_or_default();

        let search_blob = build_search_blob(raw, &title, self.synonyms);
        let category = classify_category(&raw_type);
        let side = derive_side(&title, &description);

        let event = Event {
            id,
            timestamp,
            date_source,
            lat: lat.unwrap_or(0.0),
            lon: lon.unwrap_or(0.0),
            category,
            intensity,
            severity: severity_for(intensity),
            side,
            actor_code,
            classification,
            tie_total: raw.number("tie_total").unwrap_or(0.0),
            vec_t: raw.number("vec_t").unwrap_or(0.0),
            vec_k: raw.number("vec_k").unwrap_or(0.0),
            vec_e: raw.number("vec_e").unwrap_or(0.0),
            search_blob,
            title,
            description,
            raw_type,
        };
        Normalized { event, has_source_id, coords_ok }
    }
}
