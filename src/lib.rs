//! Event normalization, classification and filtering.
//!
//! ```text
//! raw records ─► Normalizer ─► EventIndex ─► FilterEngine ─► Dispatcher ─► views
//!  (raw.rs)    (normalize.rs)  (index.rs)    (filter.rs)    (dispatch.rs)
//! ```
//!
//! [`session::Session`] owns the published index, the active filter and the
//! registered views.

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod dispatch;
pub mod filter;
pub mod index;
pub mod logging;
pub mod normalize;
pub mod raw;
pub mod session;
pub mod synonyms;
pub mod synth;
pub mod text;
pub mod verify;

pub use classify::{classify_category, derive_side, severity_for, Category, Severity, Side};
pub use filter::{apply, FilterInput, FilterSpec};
pub use index::{BuildReport, EventIndex, IndexHandle};
pub use normalize::Event;
pub use raw::RawRecord;
pub use synonyms::SynonymTable;
