use std::collections::HashSet;

use crate::filter::{apply, FilterSpec};
use crate::index::EventIndex;
use crate::normalize::Event;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    pub msg: String,
}

impl InvariantViolation {
    fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.msg)
    }
}

impl std::error::Error for InvariantViolation {}

pub fn assert_event_invariants(e: &Event) -> Result<(), InvariantViolation> {
    if !e.lat.is_finite() || !e.lon.is_finite() || e.lat == 0.0 || e.lon == 0.0 {
        return Err(InvariantViolation::new(format!("junk coordinates on {}", e.id)));
    }
    if !e.intensity.is_finite() || !e.tie_total.is_finite() {
        return Err(InvariantViolation::new(format!("non-finite numeric on {}", e.id)));
    }
    if e.search_blob != e.search_blob.to_lowercase() {
        return Err(InvariantViolation::new(format!("search blob not lowercase on {}", e.id)));
    }
    if e.actor_code.is_empty() || e.actor_code != e.actor_code.to_uppercase() {
        return Err(InvariantViolation::new(format!("actor code not normalized on {}", e.id)));
    }
    Ok(())
}

pub fn assert_index_invariants(index: &EventIndex) -> Result<(), InvariantViolation> {
    let mut ids = HashSet::with_capacity(index.len());
    for pair in index.all().windows(2) {
        if pair[0].timestamp < pair[1].timestamp {
            return Err(InvariantViolation::new(format!(
                "not newest-first at {} -> {}",
                pair[0].id, pair[1].id
            )));
        }
    }
    for e in index.all() {
        assert_event_invariants(e)?;
        if !ids.insert(e.id.as_str()) {
            return Err(InvariantViolation::new(format!("duplicate id {}", e.id)));
        }
        if index.by_id(&e.id).map(|found| std::ptr::eq(found, e)) != Some(true) {
            return Err(InvariantViolation::new(format!("by_id mismatch for {}", e.id)));
        }
    }
    Ok(())
}

/// An empty spec returns the whole index in order.
pub fn assert_identity_law(index: &EventIndex) -> Result<(), InvariantViolation> {
    let out = apply(index, &FilterSpec::default());
    let same = out.len() == index.len()
        && out.iter().zip(index.all()).all(|(a, b)| std::ptr::eq(*a, b));
    if same {
        Ok(())
    } else {
        Err(InvariantViolation::new("empty spec did not return the full index"))
    }
}

/// `narrow` must select a subset of what `wide` selects, and both must be
/// ordered subsequences of the index.
pub fn assert_subset(
    index: &EventIndex,
    narrow: &FilterSpec,
    wide: &FilterSpec,
) -> Result<(), InvariantViolation> {
    let narrow_out = apply(index, narrow);
    let wide_out = apply(index, wide);
    let wide_ids: HashSet<&str> = wide_out.iter().map(|e| e.id.as_str()).collect();
    if let Some(extra) = narrow_out.iter().find(|e| !wide_ids.contains(e.id.as_str())) {
        return Err(InvariantViolation::new(format!(
            "{} passes the narrow spec but not the wide one",
            extra.id
        )));
    }
    for out in [&narrow_out, &wide_out] {
        if out.windows(2).any(|w| w[0].timestamp < w[1].timestamp) {
            return Err(InvariantViolation::new("filter output reordered"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Severity;
    use crate::raw::RawRecord;
    use crate::synonyms::SynonymTable;
    use serde_json::{json, Value};

    fn index() -> EventIndex {
        let raws: Vec<RawRecord> = [
            json!({"id": "a", "title": "Strike on Kyiv", "intensity": 0.9, "date": "2024-03-15", "lat": 1.0, "lon": 1.0}),
            json!({"id": "b", "intensity": 0.5, "date": "2024-03-12", "lat": 2.0, "lon": 2.0}),
        ]
        .into_iter()
        .filter_map(|v| match v {
            Value::Object(map) => Some(RawRecord::new(map)),
            _ => None,
        })
        .collect();
        EventIndex::build(&raws, SynonymTable::default(), 0)
    }

    #[test]
    fn built_index_satisfies_invariants() {
        let idx = index();
        assert_index_invariants(&idx).unwrap();
        assert_identity_law(&idx).unwrap();
    }

    #[test]
    fn subset_check_flags_widening() {
        let idx = index();
        let wide = FilterSpec::default();
        let narrow = FilterSpec {
            severities: [Severity::Critical].into_iter().collect(),
            ..FilterSpec::default()
        };
        assert!(assert_subset(&idx, &narrow, &wide).is_ok());
        assert!(assert_subset(&idx, &wide, &narrow).is_err());
    }

    #[test]
    fn event_check_rejects_zero_coordinates() {
        let mut e = index().all()[0].clone();
        e.lat = 0.0;
        assert!(assert_event_invariants(&e).is_err());
    }
}
