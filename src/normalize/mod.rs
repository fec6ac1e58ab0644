use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::models::GeoPartition;
use crate::warehouse::Row;

/// Timestamp formats observed across the upstream APIs, most specific first.
const EVENT_TIME_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Parse an event timestamp as emitted by the weather or warning APIs.
pub fn parse_event_time(value: &str) -> Result<NaiveDateTime> {
    for format in EVENT_TIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(parsed);
        }
    }
    Err(IngestError::ApiFormat(format!(
        "unparsable event timestamp '{}'",
        value
    )))
}

/// The largest parsed timestamp in `field` across `rows`, for watermark
/// candidates. `None` when no rows carry the field; an unparsable value is an
/// error rather than a silently skipped row.
pub fn max_event_time(rows: &[Row], field: &str) -> Result<Option<NaiveDateTime>> {
    let mut max = None;
    for row in rows {
        if let Some(Value::String(raw)) = row.get(field) {
            let parsed = parse_event_time(raw)?;
            max = Some(match max {
                Some(current) if current >= parsed => current,
                _ => parsed,
            });
        }
    }
    Ok(max)
}

/// Reshape a columnar hourly response (`{field: [values indexed by step]}`)
/// into one row per time step, tagged with partition identity and the
/// ingestion timestamp. Field arrays of inconsistent length are rejected.
/// Row order follows the input step order; ordering is not re-enforced here.
pub fn hourly_rows(
    payload: &Value,
    partition: &GeoPartition,
    loaded_at: DateTime<Utc>,
) -> Result<Vec<Row>> {
    let hourly = payload
        .get("hourly")
        .and_then(Value::as_object)
        .ok_or_else(|| IngestError::ApiFormat("payload lacks an 'hourly' object".to_string()))?;

    let steps = hourly
        .get("time")
        .and_then(Value::as_array)
        .ok_or_else(|| IngestError::ApiFormat("'hourly' lacks a 'time' array".to_string()))?
        .len();

    for (field, values) in hourly {
        let len = values.as_array().map(Vec::len).ok_or_else(|| {
            IngestError::ApiFormat(format!("hourly field '{}' is not an array", field))
        })?;
        if len != steps {
            return Err(IngestError::ApiFormat(format!(
                "hourly field '{}' has {} values, expected {}",
                field, len, steps
            )));
        }
    }

    let loaded_at = loaded_at.to_rfc3339();
    let mut rows = Vec::with_capacity(steps);
    for i in 0..steps {
        let mut row = Row::new();
        for (field, values) in hourly {
            row.insert(field.clone(), values[i].clone());
        }
        row.insert("region_id".to_string(), Value::String(partition.id.clone()));
        row.insert(
            "region_name".to_string(),
            Value::String(partition.display_name().to_string()),
        );
        row.insert("loaded_at".to_string(), Value::String(loaded_at.clone()));
        rows.push(row);
    }

    debug!(
        partition = %partition.id,
        rows = rows.len(),
        "normalized hourly payload"
    );

    Ok(rows)
}

/// Reshape an avalanche warning list into rows. Upstream fields pass through
/// unchanged except `DangerLevel`, which is coerced to an integer (the API
/// serves it both as a number and as a numeric string), plus the ingestion
/// timestamp.
pub fn warning_rows(
    items: &[Value],
    partition: &GeoPartition,
    loaded_at: DateTime<Utc>,
) -> Result<Vec<Row>> {
    let loaded_at = loaded_at.to_rfc3339();
    let mut rows = Vec::with_capacity(items.len());

    for item in items {
        let warning = item.as_object().ok_or_else(|| {
            IngestError::ApiFormat(format!(
                "warning entry for region {} is not an object",
                partition.id
            ))
        })?;

        let mut row: Row = warning.clone();

        if let Some(level) = row.get("DangerLevel").cloned() {
            row.insert("DangerLevel".to_string(), coerce_danger_level(&level)?);
        }
        row.insert("loaded_at".to_string(), Value::String(loaded_at.clone()));

        rows.push(row);
    }

    Ok(rows)
}

fn coerce_danger_level(value: &Value) -> Result<Value> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
        Value::String(s) => {
            let parsed: i64 = s.trim().parse().map_err(|_| {
                IngestError::ApiFormat(format!("unparsable danger level '{}'", s))
            })?;
            Ok(Value::Number(parsed.into()))
        }
        Value::Null => Ok(Value::Null),
        other => Err(IngestError::ApiFormat(format!(
            "unexpected danger level {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BoundingBox, GeoPartition};
    use serde_json::json;

    fn lyngen() -> GeoPartition {
        GeoPartition::new(
            "3010",
            Some("Lyngen".to_string()),
            BoundingBox::new(69.9, 19.5, 69.4, 21.0),
        )
    }

    #[test]
    fn test_hourly_rows_one_per_time_step() {
        let payload = json!({
            "latitude": 69.65,
            "hourly": {
                "time": ["2026-01-10T00:00", "2026-01-10T01:00", "2026-01-10T02:00"],
                "temperature_2m": [-4.3, -4.7, -5.1],
                "precipitation": [0.0, 0.2, null],
            }
        });

        let rows = hourly_rows(&payload, &lyngen(), Utc::now()).unwrap();
        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert_eq!(row["region_id"], json!("3010"));
            assert_eq!(row["region_name"], json!("Lyngen"));
            assert!(row.contains_key("loaded_at"));
        }
        assert_eq!(rows[1]["temperature_2m"], json!(-4.7));
        assert_eq!(rows[2]["precipitation"], json!(null));
    }

    #[test]
    fn test_hourly_rows_rejects_ragged_arrays() {
        let payload = json!({
            "hourly": {
                "time": ["2026-01-10T00:00", "2026-01-10T01:00"],
                "temperature_2m": [-4.3],
            }
        });

        let err = hourly_rows(&payload, &lyngen(), Utc::now()).unwrap_err();
        assert!(matches!(err, IngestError::ApiFormat(_)));
    }

    #[test]
    fn test_hourly_rows_rejects_missing_container() {
        let payload = json!({"daily": {}});
        let err = hourly_rows(&payload, &lyngen(), Utc::now()).unwrap_err();
        assert!(matches!(err, IngestError::ApiFormat(_)));
    }

    #[test]
    fn test_warning_rows_coerce_danger_level() {
        let items = vec![
            json!({
                "RegId": 3010,
                "ValidFrom": "2026-01-12T00:00:00",
                "ValidTo": "2026-01-12T23:59:59",
                "DangerLevel": "3",
                "PublishTime": "2026-01-11T16:00:00",
            }),
            json!({
                "RegId": 3010,
                "ValidFrom": "2026-01-13T00:00:00",
                "ValidTo": "2026-01-13T23:59:59",
                "DangerLevel": 2,
                "PublishTime": "2026-01-12T16:00:00",
            }),
        ];

        let rows = warning_rows(&items, &lyngen(), Utc::now()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["DangerLevel"], json!(3));
        assert_eq!(rows[1]["DangerLevel"], json!(2));
    }

    #[test]
    fn test_warning_rows_reject_non_object_entries() {
        let items = vec![json!("not a warning")];
        assert!(warning_rows(&items, &lyngen(), Utc::now()).is_err());
    }

    #[test]
    fn test_parse_event_time_formats() {
        assert!(parse_event_time("2026-01-10T00:00").is_ok());
        assert!(parse_event_time("2026-01-10T16:00:00").is_ok());
        assert!(parse_event_time("2026-01-10T16:00:00.123").is_ok());
        assert!(parse_event_time("10.01.2026").is_err());
    }

    #[test]
    fn test_max_event_time() {
        let rows = vec![
            row_with_time("2026-01-10T02:00"),
            row_with_time("2026-01-10T05:00"),
            row_with_time("2026-01-10T04:00"),
        ];
        let max = max_event_time(&rows, "time").unwrap().unwrap();
        assert_eq!(max, parse_event_time("2026-01-10T05:00").unwrap());

        assert_eq!(max_event_time(&[], "time").unwrap(), None);
    }

    fn row_with_time(time: &str) -> Row {
        let mut row = Row::new();
        row.insert("time".to_string(), json!(time));
        row
    }
}
