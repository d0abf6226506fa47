//! The canonical event collection every view reads from.
//!
//! An [`EventIndex`] is immutable once built. Refreshing data means building
//! a new one off to the side and publishing it through an [`IndexHandle`],
//! which swaps the shared reference in one step so readers only ever see a
//! complete index.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::logging::{log_build_summary, log_index_published, log_record_dropped, ProfileScope};
use crate::normalize::{DateSource, Event, Normalizer};
use crate::raw::RawRecord;
use crate::synonyms::SynonymTable;

/// Diagnostics from one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub seen: usize,
    pub indexed: usize,
    pub dropped_coords: usize,
    pub date_heuristic: usize,
    pub date_now: usize,
    pub ids_synthesized: usize,
    pub ids_renamed: usize,
    pub uncategorized: usize,
}

#[derive(Debug, Clone, Default)]
pub struct EventIndex {
    events: Vec<Event>,
    by_id: HashMap<String, usize>,
    synonyms: Arc<SynonymTable>,
    report: BuildReport,
}

impl EventIndex {
    /// Normalize, classify, drop junk coordinates, sort newest first.
    ///
    /// `now_ms` is the clock used for records whose date cannot be parsed;
    /// it is captured once so a build is deterministic. The synonym table
    /// stays with the index so search expansion matches the search blobs.
    pub fn build(
        raws: &[RawRecord],
        synonyms: impl Into<Arc<SynonymTable>>,
        now_ms: i64,
    ) -> Self {
        let synonyms = synonyms.into();
        let _scope = ProfileScope::with_context(
            "index_build",
            &[("records", serde_json::json!(raws.len()))],
        );
        let normalizer = Normalizer::new(&synonyms, now_ms);
        let mut report = BuildReport { seen: raws.len(), ..BuildReport::default() };
        let mut events = Vec::with_capacity(raws.len());
        let mut taken: HashSet<String> = HashSet::with_capacity(raws.len());

        for raw in raws {
            let normalized = normalizer.normalize(raw);
            let mut event = normalized.event;
            if !normalized.coords_ok {
                report.dropped_coords += 1;
                log_record_dropped(&event.id, "junk_coordinates");
                continue;
            }
            if !normalized.has_source_id {
                report.ids_synthesized += 1;
            }
            match event.date_source {
                DateSource::Strict => {}
                DateSource::Heuristic => report.date_heuristic += 1,
                DateSource::Now => report.date_now += 1,
            }
            if event.category.is_none() {
                report.uncategorized += 1;
            }
            if taken.contains(&event.id) {
                report.ids_renamed += 1;
                event.id = unique_id(&event.id, &taken);
            }
            taken.insert(event.id.clone());
            events.push(event);
        }

        // Stable: equal timestamps keep payload order.
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        let by_id = events
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();
        report.indexed = events.len();
        log_build_summary(report.seen, report.indexed, report.dropped_coords, report.date_now);

        Self { events, by_id, synonyms, report }
    }

    /// Newest first.
    pub fn all(&self) -> &[Event] {
        &self.events
    }

    pub fn by_id(&self, id: &str) -> Option<&Event> {
        self.by_id.get(id).map(|&i| &self.events[i])
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Timestamp of the most recent event; anchors recency windows.
    pub fn max_timestamp(&self) -> Option<i64> {
        self.events.first().map(|e| e.timestamp)
    }

    pub fn min_timestamp(&self) -> Option<i64> {
        self.events.last().map(|e| e.timestamp)
    }

    pub fn synonyms(&self) -> &SynonymTable {
        &self.synonyms
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }
}

fn unique_id(base: &str, taken: &HashSet<String>) -> String {
    (2..)
        .map(|n| format!("{}~{}", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Shared, atomically swappable reference to the current index.
#[derive(Debug, Clone, Default)]
pub struct IndexHandle {
    inner: Arc<RwLock<Published>>,
}

#[derive(Debug, Default)]
struct Published {
    index: Arc<EventIndex>,
    generation: u64,
}

impl IndexHandle {
    pub fn new(index: EventIndex) -> Self {
        let handle = Self::default();
        handle.publish(index);
        handle
    }

    /// Replace the current index. Returns the new generation number.
    pub fn publish(&self, index: EventIndex) -> u64 {
        let index = Arc::new(index);
        let events = index.len();
        let generation = match self.inner.write() {
            Ok(mut guard) => {
                guard.index = index;
                guard.generation += 1;
                guard.generation
            }
            Err(poisoned) => {
                let mut guard = poisoned.into_inner();
                guard.index = index;
                guard.generation += 1;
                guard.generation
            }
        };
        log_index_published(generation, events);
        generation
    }

    /// The index current at call time. Later publishes do not affect it.
    pub fn snapshot(&self) -> Arc<EventIndex> {
        match self.inner.read() {
            Ok(guard) => Arc::clone(&guard.index),
            Err(poisoned) => Arc::clone(&poisoned.into_inner().index),
        }
    }

    pub fn generation(&self) -> u64 {
        self.current().0
    }

    /// Generation and index read under one lock.
    pub fn current(&self) -> (u64, Arc<EventIndex>) {
        match self.inner.read() {
            Ok(guard) => (guard.generation, Arc::clone(&guard.index)),
            Err(poisoned) => {
                let guard = poisoned.into_inner();
                (guard.generation, Arc::clone(&guard.index))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{Category, Severity};
    use serde_json::{json, Value};

    const NOW: i64 = 1_720_000_000_000;

    fn raw(v: Value) -> RawRecord {
        match v {
            Value::Object(map) => RawRecord::new(map),
            _ => RawRecord::default(),
        }
    }

    fn build(raws: &[RawRecord]) -> EventIndex {
        EventIndex::build(raws, SynonymTable::default(), NOW)
    }

    #[test]
    fn drops_junk_coordinates() {
        let idx = build(&[
            raw(json!({"id": "a", "lat": 48.5, "lon": 35.0})),
            raw(json!({"id": "b", "lat": 0, "lon": 0})),
            raw(json!({"id": "c", "lat": 48.5})),
            raw(json!({"id": "d", "lat": "NaN", "lon": 35.0})),
        ]);
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.report().dropped_coords, 3);
        assert!(idx.by_id("b").is_none());
    }

    #[test]
    fn sorted_newest_first_and_stable() {
        let idx = build(&[
            raw(json!({"id": "old", "date": "01/03/2024", "lat": 1.0, "lon": 1.0})),
            raw(json!({"id": "new", "date": "10/03/2024", "lat": 1.0, "lon": 1.0})),
            raw(json!({"id": "tie1", "date": "05/03/2024", "lat": 1.0, "lon": 1.0})),
            raw(json!({"id": "tie2", "date": "05/03/2024", "lat": 1.0, "lon": 1.0})),
        ]);
        let ids: Vec<&str> = idx.all().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "tie1", "tie2", "old"]);
        assert_eq!(idx.max_timestamp(), Some(idx.all()[0].timestamp));
        assert_eq!(idx.min_timestamp(), Some(idx.all()[3].timestamp));
    }

    #[test]
    fn duplicate_ids_are_made_unique() {
        let idx = build(&[
            raw(json!({"id": "x", "lat": 1.0, "lon": 1.0})),
            raw(json!({"id": "x", "lat": 2.0, "lon": 2.0})),
            raw(json!({"id": "x", "lat": 3.0, "lon": 3.0})),
        ]);
        assert!(idx.by_id("x").is_some());
        assert!(idx.by_id("x~2").is_some());
        assert!(idx.by_id("x~3").is_some());
        assert_eq!(idx.report().ids_renamed, 2);
    }

    #[test]
    fn end_to_end_two_records() {
        let idx = build(&[
            raw(json!({
                "type": "Kamikaze drone strike",
                "intensity": 0.85,
                "date": "15/03/2024",
                "lat": 48.5,
                "lon": 35.0
            })),
            raw(json!({
                "type": "civilian infrastructure fire",
                "intensity": 0.3,
                "date": "16/03/2024",
                "lat": 0,
                "lon": 0
            })),
        ]);
        assert_eq!(idx.len(), 1);
        let ev = &idx.all()[0];
        assert_eq!(ev.category, Some(Category::DroneStrike));
        assert_eq!(ev.category_label(), Some("Drone Strike"));
        assert_eq!(ev.severity, Severity::Critical);
        assert_eq!(idx.report().ids_synthesized, 1);
    }

    #[test]
    fn uncategorized_events_stay_indexed() {
        let idx = build(&[raw(json!({"type": "weather", "lat": 1.0, "lon": 1.0}))]);
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.all()[0].category, None);
        assert_eq!(idx.report().uncategorized, 1);
    }

    #[test]
    fn handle_swaps_whole_index() {
        let handle = IndexHandle::new(build(&[raw(json!({"id": "a", "lat": 1.0, "lon": 1.0}))]));
        let before = handle.snapshot();
        let generation = handle.publish(build(&[
            raw(json!({"id": "b", "lat": 1.0, "lon": 1.0})),
            raw(json!({"id": "c", "lat": 1.0, "lon": 1.0})),
        ]));
        assert_eq!(generation, 2);
        assert_eq!(before.len(), 1);
        assert_eq!(handle.snapshot().len(), 2);
        assert!(handle.snapshot().by_id("a").is_none());
    }
}
