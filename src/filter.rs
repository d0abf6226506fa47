//! The single visibility predicate shared by every view.
//!
//! [`apply`] is a pure function of an index and a [`FilterSpec`]. It never
//! reorders, never mutates and never fails: a spec that nothing satisfies
//! simply yields an empty result.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::classify::{is_strategically_persistent, Severity, Side, RU_LEXICON, UA_LEXICON};
use crate::index::EventIndex;
use crate::normalize::{parse_calendar_date, parse_heuristic_date, parse_strict_date, Event};
use crate::synonyms::SynonymTable;

pub const HOUR_MS: i64 = 3_600_000;
const DAY_MS: i64 = 24 * HOUR_MS;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Inclusive lower bound, epoch ms.
    pub start_ts: Option<i64>,
    /// Inclusive upper bound, epoch ms.
    pub end_ts: Option<i64>,
    /// Exact category label.
    pub category: Option<String>,
    /// Exact actor code.
    pub actor: Option<String>,
    /// Lowercase free text.
    pub query: Option<String>,
    /// Empty accepts every severity.
    pub severities: BTreeSet<Severity>,
    /// 0 disables the recency window.
    pub recency_hours: u32,
    pub persistence: bool,
}

impl FilterSpec {
    pub fn is_empty(&self) -> bool {
        self.active_predicates().is_empty()
    }

    /// Names of the predicates this spec switches on, in evaluation order.
    pub fn active_predicates(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.start_ts.is_some() || self.end_ts.is_some() {
            out.push("date");
        }
        if self.category.is_some() {
            out.push("category");
        }
        if self.actor.is_some() {
            out.push("actor");
        }
        if self.query.as_deref().is_some_and(|q| !q.trim().is_empty()) {
            out.push("search");
        }
        if !self.severities.is_empty() {
            out.push("severity");
        }
        if self.recency_hours > 0 {
            out.push("recency");
        }
        out
    }
}

// =============================================================================
// Search
// =============================================================================

/// Query after synonym expansion and smart-actor detection.
///
/// Both halves work on the same normalization: trimmed, lowercased text.
/// Literal terms are matched as substrings of the search blob; the actor
/// hint fires when any whitespace/punctuation token of the query starts
/// with a side's lexicon stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub terms: Vec<String>,
    pub actor_hint: Option<Side>,
}

impl SearchQuery {
    pub fn compile(query: &str, synonyms: &SynonymTable) -> Option<Self> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return None;
        }
        Some(Self { terms: synonyms.expand(&q), actor_hint: actor_hint(&q) })
    }

    pub fn matches(&self, event: &Event) -> bool {
        if self.terms.iter().any(|t| event.search_blob.contains(t.as_str())) {
            return true;
        }
        match self.actor_hint {
            Some(side) => {
                event.side == side || side.actor_codes().contains(&event.actor_code.as_str())
            }
            None => false,
        }
    }
}

fn actor_hint(query: &str) -> Option<Side> {
    let tokens: Vec<&str> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    let hits = |lexicon: &[&str]| {
        lexicon
            .iter()
            .filter(|stem| !stem.contains(' '))
            .any(|stem| tokens.iter().any(|t| t.starts_with(*stem)))
    };
    match (hits(RU_LEXICON), hits(UA_LEXICON)) {
        (true, false) => Some(Side::Ru),
        (false, true) => Some(Side::Ua),
        _ => None,
    }
}

// =============================================================================
// Apply
// =============================================================================

/// Everything `apply` needs precomputed once per call.
struct Compiled<'s> {
    spec: &'s FilterSpec,
    search: Option<SearchQuery>,
    cutoff: Option<i64>,
}

impl<'s> Compiled<'s> {
    fn new(index: &EventIndex, spec: &'s FilterSpec) -> Self {
        let search = spec
            .query
            .as_deref()
            .and_then(|q| SearchQuery::compile(q, index.synonyms()));
        let cutoff = (spec.recency_hours > 0)
            .then(|| index.max_timestamp())
            .flatten()
            .map(|max| max - i64::from(spec.recency_hours) * HOUR_MS);
        Self { spec, search, cutoff }
    }

    fn accepts(&self, e: &Event) -> bool {
        let spec = self.spec;
        if spec.start_ts.is_some_and(|start| e.timestamp < start) {
            return false;
        }
        if spec.end_ts.is_some_and(|end| e.timestamp > end) {
            return false;
        }
        if let Some(category) = &spec.category {
            if e.category_label() != Some(category.as_str()) {
                return false;
            }
        }
        if let Some(actor) = &spec.actor {
            if &e.actor_code != actor {
                return false;
            }
        }
        if let Some(search) = &self.search {
            if !search.matches(e) {
                return false;
            }
        }
        if !spec.severities.is_empty() && !spec.severities.contains(&e.severity) {
            return false;
        }
        if let Some(cutoff) = self.cutoff {
            if e.timestamp < cutoff
                && !(spec.persistence && is_strategically_persistent(e.tie_total, &e.classification))
            {
                return false;
            }
        }
        true
    }
}

/// Visible subset of `index` under `spec`, in index order (newest first).
pub fn apply<'a>(index: &'a EventIndex, spec: &FilterSpec) -> Vec<&'a Event> {
    let compiled = Compiled::new(index, spec);
    index.all().iter().filter(|e| compiled.accepts(e)).collect()
}

// =============================================================================
// UI boundary
// =============================================================================

/// Loosely typed filter controls as a UI hands them over.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterInput {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub category: Option<String>,
    pub actor: Option<String>,
    pub search_text: Option<String>,
    pub severities: Vec<String>,
    pub recency_hours: u32,
    pub persistence: bool,
}

fn non_blank(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|t| !t.is_empty())
}

fn boundary_ts(raw: &str) -> Option<i64> {
    parse_strict_date(raw).or_else(|| parse_heuristic_date(raw))
}

impl FilterInput {
    /// Normalize into a [`FilterSpec`]. Blank strings and unparsable dates
    /// are treated as unset; unknown severity names are ignored. An end bound
    /// without a time of day, in any accepted layout, covers that whole day.
    pub fn into_spec(self) -> FilterSpec {
        let start_ts = non_blank(&self.start_date).and_then(boundary_ts);
        let end_ts = non_blank(&self.end_date).and_then(|raw| {
            let ts = boundary_ts(raw)?;
            Some(if parse_calendar_date(raw).is_some() { ts + DAY_MS - 1 } else { ts })
        });
        FilterSpec {
            start_ts,
            end_ts,
            category: non_blank(&self.category).map(str::to_string),
            actor: non_blank(&self.actor).map(|a| a.to_uppercase()),
            query: non_blank(&self.search_text).map(|q| q.to_lowercase()),
            severities: self.severities.iter().filter_map(|s| Severity::parse(s)).collect(),
            recency_hours: self.recency_hours,
            persistence: self.persistence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::RawRecord;
    use serde_json::{json, Value};

    const NOW: i64 = 1_720_000_000_000;

    fn raw(v: Value) -> RawRecord {
        match v {
            Value::Object(map) => RawRecord::new(map),
            _ => RawRecord::default(),
        }
    }

    fn sample() -> EventIndex {
        EventIndex::build(
            &[
                raw(json!({"id": "drone", "type": "drone strike", "title": "Russian drone hits Kharkiv",
                    "intensity": 0.9, "date": "2024-03-15", "lat": 50.0, "lon": 36.2, "actor_code": "rus"})),
                raw(json!({"id": "art", "type": "artillery", "title": "Shelling near Kyiv",
                    "intensity": 0.5, "date": "2024-03-14", "lat": 50.4, "lon": 30.5, "actor_code": "ukr"})),
                raw(json!({"id": "protest", "type": "protest", "title": "Rally in Lviv",
                    "intensity": 0.1, "date": "2024-03-10", "lat": 49.8, "lon": 24.0})),
            ],
            SynonymTable::default(),
            NOW,
        )
    }

    fn ids(events: &[&Event]) -> Vec<String> {
        events.iter().map(|e| e.id.clone()).collect()
    }

    #[test]
    fn empty_spec_is_identity() {
        let idx = sample();
        let out = apply(&idx, &FilterSpec::default());
        assert_eq!(out.len(), idx.len());
        assert!(out.iter().zip(idx.all()).all(|(a, b)| std::ptr::eq(*a, b)));
    }

    #[test]
    fn category_and_actor_are_exact() {
        let idx = sample();
        let spec = FilterSpec { category: Some("Drone Strike".into()), ..Default::default() };
        assert_eq!(ids(&apply(&idx, &spec)), vec!["drone"]);
        let spec = FilterSpec { category: Some("drone strike".into()), ..Default::default() };
        assert!(apply(&idx, &spec).is_empty());
        let spec = FilterSpec { actor: Some("UKR".into()), ..Default::default() };
        assert_eq!(ids(&apply(&idx, &spec)), vec!["art"]);
        let spec = FilterSpec { actor: Some("UNK".into()), ..Default::default() };
        assert_eq!(ids(&apply(&idx, &spec)), vec!["protest"]);
    }

    #[test]
    fn reversed_date_range_passes_nothing() {
        let idx = sample();
        let spec = FilterSpec {
            start_ts: Some(NOW),
            end_ts: Some(0),
            ..Default::default()
        };
        assert!(apply(&idx, &spec).is_empty());
    }

    #[test]
    fn synonym_expansion_is_symmetric() {
        let idx = sample();
        let kiev = FilterSpec { query: Some("kiev".into()), ..Default::default() };
        let kyiv = FilterSpec { query: Some("kyiv".into()), ..Default::default() };
        assert_eq!(ids(&apply(&idx, &kiev)), vec!["art"]);
        assert_eq!(ids(&apply(&idx, &kiev)), ids(&apply(&idx, &kyiv)));
        let kharkov = FilterSpec { query: Some("kharkov".into()), ..Default::default() };
        assert_eq!(ids(&apply(&idx, &kharkov)), vec!["drone"]);
    }

    #[test]
    fn smart_actor_matches_without_literal_text() {
        let idx = sample();
        // "art" says nothing about Ukraine in its text but carries actor UKR.
        let spec = FilterSpec { query: Some("ukrainian".into()), ..Default::default() };
        assert_eq!(ids(&apply(&idx, &spec)), vec!["art"]);
        let spec = FilterSpec { query: Some("russia".into()), ..Default::default() };
        assert_eq!(ids(&apply(&idx, &spec)), vec!["drone"]);
    }

    #[test]
    fn actor_hint_needs_one_side() {
        assert_eq!(actor_hint("russian losses"), Some(Side::Ru));
        assert_eq!(actor_hint("zsu counterattack"), Some(Side::Ua));
        assert_eq!(actor_hint("russia ukraine"), None);
        assert_eq!(actor_hint("bridge"), None);
    }

    #[test]
    fn severity_set_filters() {
        let idx = sample();
        let spec = FilterSpec {
            severities: [Severity::Critical, Severity::Medium].into_iter().collect(),
            ..Default::default()
        };
        assert_eq!(ids(&apply(&idx, &spec)), vec!["drone", "art"]);
    }

    #[test]
    fn recency_window_anchors_to_newest_event() {
        let idx = sample();
        let spec = FilterSpec { recency_hours: 24, ..Default::default() };
        assert_eq!(ids(&apply(&idx, &spec)), vec!["drone", "art"]);
        let spec = FilterSpec { recency_hours: 1, ..Default::default() };
        assert_eq!(ids(&apply(&idx, &spec)), vec!["drone"]);
    }

    #[test]
    fn input_boundary_normalizes_controls() {
        let spec = FilterInput {
            start_date: Some("2024-03-14".into()),
            end_date: Some("14/03/2024".into()),
            category: Some("  ".into()),
            actor: Some("ukr".into()),
            search_text: Some("  Kyiv ".into()),
            severities: vec!["HIGH".into(), "bogus".into()],
            recency_hours: 0,
            persistence: true,
        }
        .into_spec();
        let start = spec.start_ts.unwrap();
        assert_eq!(spec.end_ts, Some(start + DAY_MS - 1));
        assert_eq!(spec.category, None);
        assert_eq!(spec.actor.as_deref(), Some("UKR"));
        assert_eq!(spec.query.as_deref(), Some("kyiv"));
        assert_eq!(spec.severities.len(), 1);
        assert_eq!(
            ids(&apply(&sample(), &FilterSpec { severities: BTreeSet::new(), ..spec })),
            vec!["art"]
        );
    }

    #[test]
    fn date_only_end_bound_covers_the_day_in_every_layout() {
        let strict = FilterInput { end_date: Some("15/03/2024".into()), ..Default::default() };
        let slashed = FilterInput { end_date: Some("2024/03/15".into()), ..Default::default() };
        let named = FilterInput { end_date: Some("March 15, 2024".into()), ..Default::default() };
        let end = strict.into_spec().end_ts;
        assert_eq!(parse_strict_date("2024-03-15").map(|d| d + DAY_MS - 1), end);
        assert_eq!(slashed.into_spec().end_ts, end);
        assert_eq!(named.into_spec().end_ts, end);

        // An explicit time of day is kept as given.
        let timed = FilterInput { end_date: Some("2024-03-15T06:00:00Z".into()), ..Default::default() };
        assert_eq!(timed.into_spec().end_ts, parse_strict_date("2024-03-15").map(|d| d + 6 * HOUR_MS));
    }

    #[test]
    fn blank_query_is_not_an_active_predicate() {
        let spec = FilterSpec { query: Some("   ".into()), ..Default::default() };
        assert!(spec.active_predicates().is_empty());
        assert!(spec.is_empty());
        assert_eq!(apply(&sample(), &spec).len(), sample().len());
        let spec = FilterSpec { query: Some(" kyiv ".into()), ..Default::default() };
        assert_eq!(spec.active_predicates(), vec!["search"]);
    }

    #[test]
    fn input_deserializes_from_camel_case() {
        let input: FilterInput =
            serde_json::from_value(json!({"searchText": "kiev", "recencyHours": 24})).unwrap();
        assert_eq!(input.search_text.as_deref(), Some("kiev"));
        assert_eq!(input.recency_hours, 24);
        assert!(!input.persistence);
    }
}
