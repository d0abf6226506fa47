//! Fan-out of the visible subset to registered views.
//!
//! A dispatch only reaches consumers when the visible subset actually
//! changed, judged by a digest of the visible ids in order and the index
//! generation they came from.

use sha2::{Digest, Sha256};

use crate::logging::log_dispatch;
use crate::normalize::Event;

/// A view that redraws from the visible subset (map, charts, feed, ledger).
pub trait Consumer {
    fn name(&self) -> &str;

    /// Maximum number of events this view shows; `None` for all of them.
    fn limit(&self) -> Option<usize> {
        None
    }

    fn on_visible(&mut self, events: &[&Event]);
}

pub fn fingerprint(generation: u64, events: &[&Event]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(generation.to_le_bytes());
    for e in events {
        hasher.update(e.id.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

#[derive(Default)]
pub struct Dispatcher {
    consumers: Vec<Box<dyn Consumer>>,
    last: Option<String>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, consumer: Box<dyn Consumer>) {
        self.consumers.push(consumer);
        // A late registrant must receive the next dispatch.
        self.last = None;
    }

    pub fn len(&self) -> usize {
        self.consumers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumers.is_empty()
    }

    /// Notify every consumer if the subset changed. Returns whether it did.
    pub fn dispatch(&mut self, generation: u64, events: &[&Event]) -> bool {
        let fp = fingerprint(generation, events);
        if self.last.as_deref() == Some(fp.as_str()) {
            return false;
        }
        for consumer in self.consumers.iter_mut() {
            let slice = match consumer.limit() {
                Some(n) if n < events.len() => &events[..n],
                _ => events,
            };
            log_dispatch(consumer.name(), slice.len(), &fp);
            consumer.on_visible(slice);
        }
        self.last = Some(fp);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::EventIndex;
    use crate::raw::RawRecord;
    use crate::synonyms::SynonymTable;
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    struct Recorder {
        name: &'static str,
        limit: Option<usize>,
        seen: Arc<Mutex<Vec<usize>>>,
    }

    impl Consumer for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn limit(&self) -> Option<usize> {
            self.limit
        }

        fn on_visible(&mut self, events: &[&Event]) {
            self.seen.lock().unwrap().push(events.len());
        }
    }

    fn index() -> EventIndex {
        let raws: Vec<RawRecord> = (0..5)
            .map(|i| match json!({"id": format!("e{}", i), "lat": 1.0, "lon": 1.0}) {
                Value::Object(map) => RawRecord::new(map),
                _ => RawRecord::default(),
            })
            .collect();
        EventIndex::build(&raws, SynonymTable::default(), 0)
    }

    #[test]
    fn notifies_only_on_change_and_respects_limits() {
        let idx = index();
        let all: Vec<&Event> = idx.all().iter().collect();
        let feed = Arc::new(Mutex::new(Vec::new()));
        let map = Arc::new(Mutex::new(Vec::new()));
        let mut d = Dispatcher::new();
        d.register(Box::new(Recorder { name: "feed", limit: Some(2), seen: feed.clone() }));
        d.register(Box::new(Recorder { name: "map", limit: None, seen: map.clone() }));

        assert!(d.dispatch(1, &all));
        assert!(!d.dispatch(1, &all));
        assert!(d.dispatch(1, &all[..3]));
        assert!(d.dispatch(2, &all[..3]));

        assert_eq!(*feed.lock().unwrap(), vec![2, 2, 2]);
        assert_eq!(*map.lock().unwrap(), vec![5, 3, 3]);
    }

    #[test]
    fn fingerprint_depends_on_order() {
        let idx = index();
        let a: Vec<&Event> = idx.all().iter().collect();
        let mut b = a.clone();
        b.reverse();
        assert_ne!(fingerprint(1, &a), fingerprint(1, &b));
        assert_eq!(fingerprint(1, &a), fingerprint(1, &a));
    }
}
