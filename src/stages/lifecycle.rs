use super::{enrich_each, Stage, StageContext};
use crate::annotations;
use crate::record::{ChangelogEntry, DataProductRecord, LifecycleStatus, ReleaseStatus};
use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LifecycleAnnotation {
    release_status: Option<String>,
    lifecycle_status: Option<String>,
    deprecation_date: Option<String>,
    sunset_date: Option<String>,
    last_update: Option<String>,
    successors: Option<Value>,
    changelog_entries: Option<Value>,
}

/// Maps `@ORD.lifecycle` (plus the `@ORD.deprecated` / `@ORD.successor`
/// shorthands) onto release and lifecycle fields.
pub struct LifecycleStage;

impl Stage for LifecycleStage {
    fn name(&self) -> &'static str {
        "lifecycle"
    }

    fn process(
        &self,
        records: Vec<DataProductRecord>,
        ctx: &StageContext<'_>,
    ) -> Result<Vec<DataProductRecord>> {
        ctx.model.definitions()?;
        tracing::info!(stage = self.name(), count = records.len(), "applying lifecycle fields");
        Ok(enrich_each(self.name(), records, |record| enrich(record, ctx)))
    }
}

fn enrich(record: &DataProductRecord, ctx: &StageContext<'_>) -> Result<DataProductRecord> {
    let Some(service) = ctx.service(record) else {
        return Ok(record.clone());
    };
    let mut enriched = record.clone();

    if let Some(lifecycle) =
        annotations::parse::<LifecycleAnnotation>(service, annotations::LIFECYCLE)?
    {
        if let Some(status) = lifecycle.release_status.as_deref().and_then(ReleaseStatus::parse) {
            enriched.release_status = Some(status.as_str().to_string());
        }
        if let Some(status) = lifecycle
            .lifecycle_status
            .as_deref()
            .and_then(LifecycleStatus::parse)
        {
            enriched.lifecycle_status = Some(status.as_str().to_string());
        }
        if let Some(date) = lifecycle.deprecation_date.as_deref().and_then(canonical_timestamp) {
            enriched.deprecation_date = Some(date);
        }
        if let Some(date) = lifecycle.sunset_date.as_deref().and_then(canonical_timestamp) {
            enriched.sunset_date = Some(date);
        }
        if let Some(date) = lifecycle.last_update.as_deref().and_then(canonical_timestamp) {
            enriched.last_update = Some(date);
        }
        if let Some(Value::Array(successors)) = &lifecycle.successors {
            enriched.successors = Some(
                successors
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
            );
        }
        if let Some(Value::Array(entries)) = &lifecycle.changelog_entries {
            enriched.changelog_entries = Some(entries.iter().filter_map(changelog_entry).collect());
        }
    }

    if let Some(deprecated) = annotations::get(service, annotations::DEPRECATED) {
        if enriched.release_status.is_none() {
            enriched.release_status = Some(ReleaseStatus::Deprecated.as_str().to_string());
            if let Some(date) = deprecated.as_str().and_then(canonical_timestamp) {
                enriched.deprecation_date = Some(date);
            }
        }
    }

    if enriched.successors.is_none() {
        if let Some(successor) = annotations::get(service, annotations::SUCCESSOR) {
            enriched.successors = Some(annotations::strings_one_or_many(successor));
        }
    }

    Ok(enriched)
}

/// Changelog entries need both `date` and `version`; others are discarded.
fn changelog_entry(value: &Value) -> Option<ChangelogEntry> {
    let fields = value.as_object()?;
    let date = fields.get("date").and_then(annotations::string)?;
    let version = fields.get("version").and_then(annotations::string)?;
    let release_status = fields
        .get("releaseStatus")
        .and_then(Value::as_str)
        .and_then(ReleaseStatus::parse)
        .unwrap_or(ReleaseStatus::Active);
    Some(ChangelogEntry {
        date,
        description: fields
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        release_status: release_status.as_str().to_string(),
        version,
        url: fields.get("url").and_then(annotations::string),
    })
}

/// Parse a date or timestamp and re-serialize it as a UTC RFC 3339 timestamp
/// with millisecond precision; unparsable input yields `None`.
pub(crate) fn canonical_timestamp(text: &str) -> Option<String> {
    let text = text.trim();
    let parsed = if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        timestamp.with_timezone(&Utc)
    } else if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        Utc.from_utc_datetime(&naive)
    } else {
        let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()?;
        Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?)
    };
    Some(parsed.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::canonical_timestamp;

    #[test]
    fn canonical_timestamp_normalizes_supported_shapes() {
        assert_eq!(
            canonical_timestamp("2025-06-30").as_deref(),
            Some("2025-06-30T00:00:00.000Z")
        );
        assert_eq!(
            canonical_timestamp("2025-06-30T10:15:00+02:00").as_deref(),
            Some("2025-06-30T08:15:00.000Z")
        );
        assert_eq!(
            canonical_timestamp("2025-06-30T10:15:00").as_deref(),
            Some("2025-06-30T10:15:00.000Z")
        );
        assert!(canonical_timestamp("next tuesday").is_none());
        assert!(canonical_timestamp("2025-13-40").is_none());
    }
}
