//! Override merge with field-level conflict tracking.
//!
//! An override entry is a sparse patch keyed by `id`: every field it names
//! replaces the record's field, everything else is kept. Entries that match no
//! record are ignored; they never create records.
use crate::config::CustomConfiguration;
use crate::record::{merge_unique_tags, ConflictField, DataProductRecord, MergeConflict, Source};
use anyhow::{anyhow, Context, Result};
use serde_json::{Map, Value};

/// Fields an override can never replace.
const PROTECTED_FIELDS: [&str; 3] = ["id", "serviceName", "source"];

/// Fields without a default; a `null` override for them is skipped.
const REQUIRED_FIELDS: [&str; 4] = ["title", "version", "type", "visibility"];

/// Array fields with set semantics; reordering them is not a conflict.
const SET_LIKE_FIELDS: [&str; 7] = [
    "tags",
    "entityTypes",
    "industry",
    "lineOfBusiness",
    "countries",
    "correlationIds",
    "successors",
];

#[derive(Debug, Default)]
pub struct MergeOutcome {
    pub records: Vec<DataProductRecord>,
    pub conflicts: Vec<MergeConflict>,
    pub merged_count: usize,
    pub ignored_ids: Vec<String>,
}

/// Merge every override entry into the matching record.
pub fn merge_configuration(
    records: Vec<DataProductRecord>,
    config: &CustomConfiguration,
) -> MergeOutcome {
    let mut outcome = MergeOutcome {
        records,
        ..MergeOutcome::default()
    };

    for entry in &config.data_products {
        let Some(id) = entry.get("id").and_then(Value::as_str) else {
            tracing::warn!("ignoring custom data product without an id");
            continue;
        };
        let Some(idx) = outcome.records.iter().position(|record| record.id == id) else {
            tracing::info!(
                record_id = id,
                "ignoring custom data product; no matching service found"
            );
            outcome.ignored_ids.push(id.to_string());
            continue;
        };
        match apply_override(&outcome.records[idx], entry) {
            Ok((merged, conflict)) => {
                outcome.records[idx] = merged;
                outcome.conflicts.extend(conflict);
                outcome.merged_count += 1;
            }
            Err(err) => {
                tracing::warn!(
                    record_id = id,
                    error = %format!("{err:#}"),
                    "custom data product rejected; keeping pipeline record"
                );
            }
        }
    }

    outcome
}

/// Apply one override entry to one record.
///
/// Returns the merged record (with `source` advanced to custom) and the
/// conflict report, if any field with a prior value changed.
pub fn apply_override(
    record: &DataProductRecord,
    entry: &Map<String, Value>,
) -> Result<(DataProductRecord, Option<MergeConflict>)> {
    let Value::Object(mut fields) = serde_json::to_value(record).context("serialize record")?
    else {
        return Err(anyhow!("record {} did not serialize to an object", record.id));
    };

    let changed = detect_conflicts(&fields, entry);
    for (key, value) in entry {
        if PROTECTED_FIELDS.contains(&key.as_str()) {
            continue;
        }
        if !applicable(key, value) {
            tracing::debug!(
                record_id = %record.id,
                field = %key,
                "ignoring null custom value for required field"
            );
            continue;
        }
        if value.is_null() {
            fields.remove(key);
        } else {
            fields.insert(key.clone(), value.clone());
        }
    }

    let mut merged: DataProductRecord = serde_json::from_value(Value::Object(fields))
        .with_context(|| format!("apply custom fields to {}", record.id))?;
    merged.source = record.source.advance(Source::Custom);
    let tags = std::mem::take(&mut merged.tags);
    merge_unique_tags(&mut merged.tags, tags);
    log_unknown_fields(&merged, entry)?;

    let conflict = (!changed.is_empty()).then(|| MergeConflict {
        record_id: record.id.clone(),
        fields: changed,
    });
    Ok((merged, conflict))
}

/// Protected fields are never written; `null` clears a field unless the
/// field has no default.
fn applicable(key: &str, value: &Value) -> bool {
    if PROTECTED_FIELDS.contains(&key) {
        return false;
    }
    !(value.is_null() && REQUIRED_FIELDS.contains(&key))
}

/// Override keys that did not land on any record field are dropped.
fn log_unknown_fields(merged: &DataProductRecord, entry: &Map<String, Value>) -> Result<()> {
    let Value::Object(known) = serde_json::to_value(merged).context("serialize merged record")?
    else {
        return Ok(());
    };
    for (key, value) in entry {
        if !value.is_null() && !known.contains_key(key) {
            tracing::debug!(
                record_id = %merged.id,
                field = %key,
                "ignoring unknown custom field"
            );
        }
    }
    Ok(())
}

/// Fields whose prior (non-null) value differs from the override's value.
pub fn detect_conflicts(
    previous: &Map<String, Value>,
    entry: &Map<String, Value>,
) -> Vec<ConflictField> {
    entry
        .iter()
        .filter(|(key, custom)| applicable(key, custom))
        .filter_map(|(key, custom)| {
            let prior = previous.get(key).filter(|value| !value.is_null())?;
            if structurally_equal(key, prior, custom) {
                return None;
            }
            Some(ConflictField {
                field: key.clone(),
                previous_value: prior.clone(),
                custom_value: custom.clone(),
            })
        })
        .collect()
}

/// Equality used for conflict detection.
///
/// Objects compare key-wise; set-like array fields compare as multisets;
/// every other array is ordered.
pub fn structurally_equal(field: &str, left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Array(left), Value::Array(right)) if SET_LIKE_FIELDS.contains(&field) => {
            same_multiset(left, right)
        }
        _ => left == right,
    }
}

fn same_multiset(left: &[Value], right: &[Value]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    let mut remaining: Vec<&Value> = right.iter().collect();
    for item in left {
        match remaining.iter().position(|candidate| *candidate == item) {
            Some(idx) => {
                remaining.swap_remove(idx);
            }
            None => return false,
        }
    }
    true
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;
