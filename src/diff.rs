//! The diff engine: canonical record normalization and ordered set-difference
//! over two NDJSON scan snapshots.
use std::collections::BTreeMap;
use std::io::BufRead;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ScoutResult;

/// Canonicalized projection of a scan record, used as the comparison basis.
/// Fields are omitted when absent so equality ignores null-vs-missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordView {
    pub status: String,
    pub ips: Vec<String>,
    pub cnames: Vec<String>,
    pub canonical_target: Option<String>,
    pub dns_record_types: Vec<String>,
    pub ttl_min: Option<i64>,
    pub ttl_max: Option<i64>,
    pub error: Option<String>,
}

impl RecordView {
    pub fn from_obj(obj: &Map<String, Value>) -> Self {
        let status = obj
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let ips = string_array(obj.get("ips"));
        let cnames = string_array(obj.get("cnames"));
        let canonical_target = obj
            .get("canonical_target")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty());
        let dns_record_types = string_array(obj.get("dns_record_types"))
            .into_iter()
            .map(|s| s.trim().to_ascii_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        let ttl_min = obj.get("ttl_min").and_then(Value::as_i64);
        let ttl_max = obj.get("ttl_max").and_then(Value::as_i64);
        let error = obj
            .get("error")
            .and_then(Value::as_str)
            .map(|s| s.to_string());
        RecordView {
            status,
            ips,
            cnames,
            canonical_target,
            dns_record_types,
            ttl_min,
            ttl_max,
            error,
        }
    }

    /// Serialize in the order the original emits: `status`, `ips`, then
    /// the remaining optional fields only when non-empty/present.
    pub fn stable_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("status".to_string(), Value::String(self.status.clone()));
        map.insert(
            "ips".to_string(),
            Value::Array(self.ips.iter().cloned().map(Value::String).collect()),
        );
        if !self.cnames.is_empty() {
            map.insert(
                "cnames".to_string(),
                Value::Array(self.cnames.iter().cloned().map(Value::String).collect()),
            );
        }
        if let Some(target) = &self.canonical_target {
            map.insert("canonical_target".to_string(), Value::String(target.clone()));
        }
        if !self.dns_record_types.is_empty() {
            map.insert(
                "dns_record_types".to_string(),
                Value::Array(self.dns_record_types.iter().cloned().map(Value::String).collect()),
            );
        }
        if let Some(ttl_min) = self.ttl_min {
            map.insert("ttl_min".to_string(), Value::Number(ttl_min.into()));
        }
        if let Some(ttl_max) = self.ttl_max {
            map.insert("ttl_max".to_string(), Value::Number(ttl_max.into()));
        }
        if let Some(error) = &self.error {
            map.insert("error".to_string(), Value::String(error.clone()));
        }
        Value::Object(map)
    }
}

fn string_array(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct DiffSummary {
    pub old_total: usize,
    pub new_total: usize,
    pub added: usize,
    pub removed: usize,
    pub changed: usize,
    pub unchanged: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DiffEvent {
    Added {
        subdomain: String,
        new: Value,
    },
    Removed {
        subdomain: String,
        old: Value,
    },
    Changed {
        subdomain: String,
        old: Value,
        new: Value,
    },
}

/// Load an NDJSON snapshot: blank lines skipped, invalid lines skipped or
/// erroring per `skip_invalid`, optionally filtered to `status=resolved`
/// records, keyed by lowercased/trimmed `subdomain` with later lines
/// overwriting earlier ones for the same key.
pub fn load_jsonl<R: BufRead>(
    reader: R,
    src: &str,
    resolved_only: bool,
    skip_invalid: bool,
) -> ScoutResult<BTreeMap<String, RecordView>> {
    let mut records = BTreeMap::new();

    for (idx, line) in reader.lines().enumerate() {
        let lineno = idx + 1;
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let parsed: Result<Value, _> = serde_json::from_str(trimmed);
        let obj = match parsed {
            Ok(Value::Object(obj)) => obj,
            Ok(_) => {
                if skip_invalid {
                    continue;
                }
                return Err(crate::error::ScoutError::validation(format!(
                    "{src}:{lineno}: expected JSON object per line"
                )));
            }
            Err(e) => {
                if skip_invalid {
                    continue;
                }
                return Err(crate::error::ScoutError::validation(format!(
                    "{src}:{lineno}: invalid JSON: {e}"
                )));
            }
        };

        let subdomain = match obj.get("subdomain").and_then(Value::as_str) {
            Some(s) if !s.trim().is_empty() => s.trim().to_ascii_lowercase(),
            _ => {
                if skip_invalid {
                    continue;
                }
                return Err(crate::error::ScoutError::validation(format!(
                    "{src}:{lineno}: missing/invalid 'subdomain'"
                )));
            }
        };

        let view = RecordView::from_obj(&obj);
        if resolved_only && view.status != "resolved" {
            continue;
        }
        records.insert(subdomain, view);
    }

    Ok(records)
}

/// Compute the ordered set-difference between two snapshots, keyed by the
/// sorted union of both key sets.
pub fn compute_diff(
    old: &BTreeMap<String, RecordView>,
    new: &BTreeMap<String, RecordView>,
) -> (DiffSummary, Vec<DiffEvent>) {
    let mut summary = DiffSummary {
        old_total: old.len(),
        new_total: new.len(),
        ..DiffSummary::default()
    };
    let mut events = Vec::new();

    let mut all_keys: Vec<&String> = old.keys().chain(new.keys()).collect();
    all_keys.sort();
    all_keys.dedup();

    for key in all_keys {
        match (old.get(key), new.get(key)) {
            (None, Some(n)) => {
                summary.added += 1;
                events.push(DiffEvent::Added {
                    subdomain: key.clone(),
                    new: n.stable_value(),
                });
            }
            (Some(o), None) => {
                summary.removed += 1;
                events.push(DiffEvent::Removed {
                    subdomain: key.clone(),
                    old: o.stable_value(),
                });
            }
            (Some(o), Some(n)) => {
                if o == n {
                    summary.unchanged += 1;
                } else {
                    summary.changed += 1;
                    events.push(DiffEvent::Changed {
                        subdomain: key.clone(),
                        old: o.stable_value(),
                        new: n.stable_value(),
                    });
                }
            }
            (None, None) => unreachable!("key came from one of the two maps"),
        }
    }

    (summary, events)
}
