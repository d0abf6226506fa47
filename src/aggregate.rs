//! Counts and slices that charts, the feed and the gallery draw from.
//!
//! Events without a category are left out of the category breakdown but
//! still count everywhere else.

use chrono::{TimeZone, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::classify::{Category, Severity, Side};
use crate::normalize::Event;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub by_category: BTreeMap<&'static str, usize>,
    pub uncategorized: usize,
    pub by_severity: BTreeMap<&'static str, usize>,
    pub by_side: BTreeMap<&'static str, usize>,
    pub by_actor: BTreeMap<String, usize>,
    /// `YYYY-MM-DD` (UTC) -> count.
    pub by_day: BTreeMap<String, usize>,
    pub mean_intensity: f64,
    pub max_tie_total: f64,
}

pub fn summarize<'a, I>(events: I) -> Summary
where
    I: IntoIterator<Item = &'a Event>,
{
    let mut s = Summary::default();
    let mut intensity_sum = 0.0;
    for e in events {
        s.total += 1;
        match e.category {
            Some(c) => *s.by_category.entry(c.label()).or_default() += 1,
            None => s.uncategorized += 1,
        }
        *s.by_severity.entry(e.severity.as_str()).or_default() += 1;
        *s.by_side.entry(e.side.as_str()).or_default() += 1;
        *s.by_actor.entry(e.actor_code.clone()).or_default() += 1;
        if let Some(day) = day_key(e.timestamp) {
            *s.by_day.entry(day).or_default() += 1;
        }
        intensity_sum += e.intensity;
        s.max_tie_total = s.max_tie_total.max(e.tie_total);
    }
    if s.total > 0 {
        s.mean_intensity = intensity_sum / s.total as f64;
    }
    s
}

pub fn day_key(ts_ms: i64) -> Option<String> {
    Utc.timestamp_millis_opt(ts_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d").to_string())
}

/// Count for one category; zero when absent.
pub fn category_count(summary: &Summary, category: Category) -> usize {
    summary.by_category.get(category.label()).copied().unwrap_or(0)
}

pub fn severity_count(summary: &Summary, severity: Severity) -> usize {
    summary.by_severity.get(severity.as_str()).copied().unwrap_or(0)
}

pub fn side_count(summary: &Summary, side: Side) -> usize {
    summary.by_side.get(side.as_str()).copied().unwrap_or(0)
}

/// First `n` of an already ordered slice (newest first for index output).
pub fn top_n<'a>(events: &[&'a Event], n: usize) -> Vec<&'a Event> {
    events.iter().take(n).copied().collect()
}

/// Events sorted by TIE total, highest first; ties keep recency order.
pub fn highest_tie<'a>(events: &[&'a Event], n: usize) -> Vec<&'a Event> {
    let mut ranked: Vec<&Event> = events.to_vec();
    ranked.sort_by(|a, b| b.tie_total.total_cmp(&a.tie_total));
    ranked.truncate(n);
    ranked
}

/// Caps the views apply to the visible subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewLimits {
    pub feed: usize,
    pub gallery: usize,
    /// Markers per clustering batch; 0 is treated as 1.
    pub map_batch: usize,
}

/// What the feed, gallery, charts and map draw from one visible subset.
#[derive(Debug, Clone, Serialize)]
pub struct Overview<'a> {
    pub summary: Summary,
    pub feed: Vec<&'a Event>,
    pub gallery: Vec<&'a Event>,
    /// Capped at the gallery limit.
    pub highest_tie: Vec<&'a Event>,
    pub map_batches: usize,
}

pub fn overview<'a>(events: &[&'a Event], limits: ViewLimits) -> Overview<'a> {
    Overview {
        summary: summarize(events.iter().copied()),
        feed: top_n(events, limits.feed),
        gallery: top_n(events, limits.gallery),
        highest_tie: highest_tie(events, limits.gallery),
        map_batches: events.chunks(limits.map_batch.max(1)).len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::EventIndex;
    use crate::raw::RawRecord;
    use crate::synonyms::SynonymTable;
    use serde_json::{json, Value};

    fn raw(v: Value) -> RawRecord {
        match v {
            Value::Object(map) => RawRecord::new(map),
            _ => RawRecord::default(),
        }
    }

    fn index() -> EventIndex {
        EventIndex::build(
            &[
                raw(json!({"id": "a", "type": "drone", "intensity": 0.9, "date": "2024-03-15",
                    "title": "Russian drone", "lat": 1.0, "lon": 1.0, "tie_total": 40})),
                raw(json!({"id": "b", "type": "drone", "intensity": 0.5, "date": "2024-03-15",
                    "lat": 1.0, "lon": 1.0, "tie_total": 110, "actor_code": "ukr"})),
                raw(json!({"id": "c", "type": "weather", "intensity": 0.1, "date": "2024-03-14",
                    "lat": 1.0, "lon": 1.0})),
            ],
            SynonymTable::default(),
            0,
        )
    }

    #[test]
    fn null_category_is_excluded_from_category_counts() {
        let idx = index();
        let s = summarize(idx.all());
        assert_eq!(s.total, 3);
        assert_eq!(category_count(&s, Category::DroneStrike), 2);
        assert_eq!(s.by_category.values().sum::<usize>(), 2);
        assert_eq!(s.uncategorized, 1);
    }

    #[test]
    fn buckets_by_severity_side_actor_and_day() {
        let idx = index();
        let s = summarize(idx.all());
        assert_eq!(severity_count(&s, Severity::Critical), 1);
        assert_eq!(severity_count(&s, Severity::Medium), 1);
        assert_eq!(severity_count(&s, Severity::Low), 1);
        assert_eq!(side_count(&s, Side::Ru), 1);
        assert_eq!(side_count(&s, Side::Unknown), 2);
        assert_eq!(s.by_actor.get("UKR"), Some(&1));
        assert_eq!(s.by_actor.get("UNK"), Some(&2));
        assert_eq!(s.by_day.get("2024-03-15"), Some(&2));
        assert_eq!(s.by_day.get("2024-03-14"), Some(&1));
        assert_eq!(s.max_tie_total, 110.0);
        assert!((s.mean_intensity - 0.5).abs() < 1e-9);
    }

    #[test]
    fn empty_input_summarizes_to_zero() {
        let s = summarize(std::iter::empty());
        assert_eq!(s.total, 0);
        assert_eq!(s.mean_intensity, 0.0);
    }

    #[test]
    fn slices_keep_order() {
        let idx = index();
        let all: Vec<&Event> = idx.all().iter().collect();
        let top = top_n(&all, 2);
        assert_eq!(top.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
        let tie = highest_tie(&all, 2);
        assert_eq!(tie.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(), vec!["b", "a"]);
    }

    #[test]
    fn overview_applies_view_limits() {
        let idx = index();
        let all: Vec<&Event> = idx.all().iter().collect();
        let o = overview(&all, ViewLimits { feed: 3, gallery: 1, map_batch: 2 });
        assert_eq!(o.summary.total, 3);
        assert_eq!(o.feed.len(), 3);
        assert_eq!(o.gallery.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(o.highest_tie.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(o.map_batches, 2);

        let o = overview(&all, ViewLimits { feed: 0, gallery: 0, map_batch: 0 });
        assert!(o.feed.is_empty());
        assert_eq!(o.map_batches, 3);
    }
}
