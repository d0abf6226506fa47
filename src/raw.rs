//! Raw upstream records and GeoJSON payload loading.
//!
//! A payload is a GeoJSON `FeatureCollection`; each feature becomes one
//! [`RawRecord`] holding its untouched `properties` plus the geometry point
//! when there is one. A bare JSON array of property objects is accepted too.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::logging::log_payload_loaded;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub properties: Map<String, Value>,
    /// GeoJSON point order: `[lon, lat]`.
    pub coordinates: Option<[f64; 2]>,
}

impl RawRecord {
    pub fn new(properties: Map<String, Value>) -> Self {
        Self { properties, coordinates: None }
    }

    pub fn with_point(mut self, lon: f64, lat: f64) -> Self {
        self.coordinates = Some([lon, lat]);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Trimmed, non-empty string form of a scalar property.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => {
                let t = s.trim();
                (!t.is_empty()).then(|| t.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Finite number from a numeric or numeric-string property.
    pub fn number(&self, key: &str) -> Option<f64> {
        let v = match self.get(key)? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        v.is_finite().then_some(v)
    }

    fn from_feature(feature: &Value) -> Option<Self> {
        let properties = match feature.get("properties") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };
        let coordinates = feature
            .get("geometry")
            .filter(|g| g.get("type").and_then(Value::as_str) == Some("Point"))
            .and_then(|g| g.get("coordinates"))
            .and_then(Value::as_array)
            .and_then(|c| match (c.first()?.as_f64(), c.get(1)?.as_f64()) {
                (Some(lon), Some(lat)) => Some([lon, lat]),
                _ => None,
            });
        if properties.is_empty() && coordinates.is_none() {
            return None;
        }
        Some(Self { properties, coordinates })
    }
}

/// Summary of a parsed payload.
#[derive(Debug, Clone, Serialize)]
pub struct PayloadInfo {
    pub sha256: String,
    pub features: usize,
    pub skipped: usize,
}

pub fn payload_sha256(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    hex::encode(hasher.finalize())
}

pub fn parse_payload(body: &str) -> Result<(Vec<RawRecord>, PayloadInfo)> {
    let root: Value = serde_json::from_str(body).context("payload is not valid JSON")?;
    let items: &[Value] = match &root {
        Value::Object(obj) => match obj.get("features") {
            Some(Value::Array(features)) => features,
            _ => bail!("payload object has no `features` array"),
        },
        Value::Array(items) => items,
        _ => bail!("payload must be a FeatureCollection or an array"),
    };

    let mut records = Vec::with_capacity(items.len());
    let mut skipped = 0;
    for item in items {
        let parsed = if item.get("properties").is_some() || item.get("geometry").is_some() {
            RawRecord::from_feature(item)
        } else {
            item.as_object().map(|props| RawRecord::new(props.clone()))
        };
        match parsed {
            Some(r) => records.push(r),
            None => skipped += 1,
        }
    }

    let info = PayloadInfo {
        sha256: payload_sha256(body.as_bytes()),
        features: records.len(),
        skipped,
    };
    Ok((records, info))
}

pub fn load_path(path: &Path) -> Result<(Vec<RawRecord>, PayloadInfo)> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("reading payload {}", path.display()))?;
    let (records, info) =
        parse_payload(&body).with_context(|| format!("parsing payload {}", path.display()))?;
    log_payload_loaded(&path.display().to_string(), info.features, &info.sha256);
    Ok((records, info))
}
