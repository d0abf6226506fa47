use anyhow::Result;
use std::path::PathBuf;

use crate::aggregate::ViewLimits;
use crate::logging::log_config_loaded;
use crate::synonyms::SynonymTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub data_path: PathBuf,
    pub synonyms_path: Option<PathBuf>,
    /// Intel feed length.
    pub feed_limit: usize,
    /// Media gallery length.
    pub gallery_limit: usize,
    /// Markers handed to the map per clustering batch.
    pub map_batch: usize,
    pub recency_hours: u32,
    pub persistence: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/events.geojson"),
            synonyms_path: None,
            feed_limit: 100,
            gallery_limit: 50,
            map_batch: 500,
            recency_hours: 0,
            persistence: false,
        }
    }
}

fn env_flag(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            data_path: std::env::var("SITREP_DATA").map(PathBuf::from).unwrap_or(d.data_path),
            synonyms_path: std::env::var("SITREP_SYNONYMS").ok().filter(|v| !v.trim().is_empty()).map(PathBuf::from),
            feed_limit: std::env::var("FEED_LIMIT").ok().and_then(|v| v.parse().ok()).unwrap_or(d.feed_limit),
            gallery_limit: std::env::var("GALLERY_LIMIT").ok().and_then(|v| v.parse().ok()).unwrap_or(d.gallery_limit),
            map_batch: std::env::var("MAP_BATCH").ok().and_then(|v| v.parse().ok()).unwrap_or(d.map_batch),
            recency_hours: std::env::var("RECENCY_HOURS").ok().and_then(|v| v.parse().ok()).unwrap_or(d.recency_hours),
            persistence: env_flag("PERSISTENCE").unwrap_or(d.persistence),
        }
    }

    pub fn view_limits(&self) -> ViewLimits {
        ViewLimits {
            feed: self.feed_limit,
            gallery: self.gallery_limit,
            map_batch: self.map_batch,
        }
    }

    /// Synonym table from `synonyms_path`, or the built-in table.
    pub fn synonyms(&self) -> Result<SynonymTable> {
        let (table, source) = match &self.synonyms_path {
            Some(path) => (SynonymTable::load(path)?, path.display().to_string()),
            None => (SynonymTable::default(), "builtin".to_string()),
        };
        log_config_loaded(&source, table.len());
        Ok(table)
    }
}
