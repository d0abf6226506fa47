//! Bidirectional place-name alias table.
//!
//! Pairs are stored as `alias -> canonical` (historical or transliterated
//! name to current name) but every lookup runs in both directions, so a
//! search for either spelling reaches records that only carry the other.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::text::{contains_at_word_start, replace_at_word_start};

const DEFAULT_PAIRS: &[(&str, &str)] = &[
    ("kiev", "kyiv"),
    ("kharkov", "kharkiv"),
    ("odessa", "odesa"),
    ("nikolaev", "mykolaiv"),
    ("nikolayev", "mykolaiv"),
    ("artemovsk", "bakhmut"),
    ("artyomovsk", "bakhmut"),
    ("dnepropetrovsk", "dnipro"),
    ("zaporozhye", "zaporizhzhia"),
    ("lugansk", "luhansk"),
    ("chernigov", "chernihiv"),
    ("kirovograd", "kropyvnytskyi"),
    ("krasnoarmeysk", "pokrovsk"),
    ("dzerzhinsk", "toretsk"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynonymTable {
    pairs: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SynonymFile {
    Map(BTreeMap<String, String>),
    Pairs(Vec<(String, String)>),
}

impl SynonymTable {
    pub fn new<I, A, C>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, C)>,
        A: AsRef<str>,
        C: AsRef<str>,
    {
        let pairs = pairs
            .into_iter()
            .map(|(a, c)| (a.as_ref().trim().to_lowercase(), c.as_ref().trim().to_lowercase()))
            .filter(|(a, c)| !a.is_empty() && !c.is_empty() && a != c)
            .collect();
        Self { pairs }
    }

    pub fn empty() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Accepts either `{"alias": "canonical", ...}` or `[["alias", "canonical"], ...]`.
    pub fn from_json(body: &str) -> Result<Self> {
        let parsed: SynonymFile =
            serde_json::from_str(body).context("synonym table is not a map or pair list")?;
        Ok(match parsed {
            SynonymFile::Map(map) => Self::new(map),
            SynonymFile::Pairs(pairs) => Self::new(pairs),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let body = std::fs::read_to_string(path)
            .with_context(|| format!("reading synonym table {}", path.display()))?;
        Self::from_json(&body).with_context(|| format!("parsing synonym table {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(a, c)| (a.as_str(), c.as_str()))
    }

    /// Candidate search terms for `query`: the query itself followed by every
    /// rewrite that swaps a known name for its counterpart.
    pub fn expand(&self, query: &str) -> Vec<String> {
        let mut terms = vec![query.to_string()];
        for (alias, canonical) in &self.pairs {
            for (from, to) in [(alias, canonical), (canonical, alias)] {
                if let Some(rewritten) = replace_at_word_start(query, from, to) {
                    if !terms.contains(&rewritten) {
                        terms.push(rewritten);
                    }
                }
            }
        }
        terms
    }

    /// Counterpart names for every known name found in `text` (lowercase).
    pub fn counterparts_in(&self, text: &str) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for (alias, canonical) in &self.pairs {
            if contains_at_word_start(text, canonical) && !out.contains(&alias.as_str()) {
                out.push(alias);
            }
            if contains_at_word_start(text, alias) && !out.contains(&canonical.as_str()) {
                out.push(canonical);
            }
        }
        out
    }
}

impl Default for SynonymTable {
    fn default() -> Self {
        Self::new(DEFAULT_PAIRS.iter().copied())
    }
}
