//! The single owner of the published index, the active filter and the
//! consumer registry.
//!
//! Views never hold their own copy of the data: they register a
//! [`Consumer`] and receive the visible subset whenever a reload or a
//! filter change alters it.

use std::sync::Arc;

use crate::dispatch::{Consumer, Dispatcher};
use crate::filter::{apply, FilterSpec};
use crate::index::{BuildReport, EventIndex, IndexHandle};
use crate::logging::{log_filter_applied, ts_epoch_ms, ProfileScope};
use crate::normalize::Event;
use crate::raw::RawRecord;
use crate::synonyms::SynonymTable;

pub struct Session {
    handle: IndexHandle,
    synonyms: Arc<SynonymTable>,
    spec: FilterSpec,
    dispatcher: Dispatcher,
    clock: fn() -> i64,
}

impl Session {
    pub fn new(synonyms: SynonymTable) -> Self {
        let synonyms = Arc::new(synonyms);
        Self {
            handle: IndexHandle::new(EventIndex::build(&[], Arc::clone(&synonyms), 0)),
            synonyms,
            spec: FilterSpec::default(),
            dispatcher: Dispatcher::new(),
            clock: ts_epoch_ms,
        }
    }

    /// Replace the wall clock used as the unparsable-date fallback.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Read-only handle for components that query the index directly.
    pub fn handle(&self) -> IndexHandle {
        self.handle.clone()
    }

    pub fn index(&self) -> Arc<EventIndex> {
        self.handle.snapshot()
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    pub fn register(&mut self, consumer: Box<dyn Consumer>) {
        self.dispatcher.register(consumer);
    }

    /// Build a fresh index off to the side, publish it, then re-run the
    /// current filter against it.
    pub fn reload(&mut self, raws: &[RawRecord]) -> BuildReport {
        let index = EventIndex::build(raws, Arc::clone(&self.synonyms), (self.clock)());
        let report = index.report().clone();
        self.handle.publish(index);
        self.refresh();
        report
    }

    /// Install a new filter and dispatch the result. Returns the visible count.
    pub fn set_filter(&mut self, spec: FilterSpec) -> usize {
        self.spec = spec;
        self.refresh()
    }

    /// Re-evaluate the current filter and notify consumers on change.
    pub fn refresh(&mut self) -> usize {
        let _scope = ProfileScope::new("filter_refresh");
        let (generation, index) = self.handle.current();
        let visible = apply(&index, &self.spec);
        log_filter_applied(&self.spec.active_predicates(), visible.len(), index.len());
        self.dispatcher.dispatch(generation, &visible);
        visible.len()
    }

    /// Owned copy of the currently visible events.
    pub fn visible(&self) -> Vec<Event> {
        let index = self.handle.snapshot();
        apply(&index, &self.spec).into_iter().cloned().collect()
    }
}
