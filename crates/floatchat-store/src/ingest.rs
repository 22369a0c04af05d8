//! Profile loading.
//!
//! Stands in for the upstream NetCDF ETL: rows arrive already flattened
//! (one record per pressure level) as a JSON array or JSON lines.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::result::Scalar;
use crate::StoreError;

/// One flattened measurement. Every field is optional on input; incomplete
/// records are dropped before insertion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    #[serde(default, deserialize_with = "de_float_id")]
    pub float_id: Option<String>,
    #[serde(rename = "PRES", default)]
    pub pres: Option<f64>,
    #[serde(rename = "TEMP", default)]
    pub temp: Option<f64>,
    #[serde(rename = "PSAL", default)]
    pub psal: Option<f64>,
    #[serde(rename = "LATITUDE", default)]
    pub latitude: Option<f64>,
    #[serde(rename = "LONGITUDE", default)]
    pub longitude: Option<f64>,
    #[serde(rename = "TIME", default)]
    pub time: Option<String>,
    #[serde(default)]
    pub profile_id: Option<i64>,
}

/// A record with every column present.
#[derive(Debug, Clone, PartialEq)]
pub struct CompleteProfile {
    pub float_id: String,
    pub pres: f64,
    pub temp: f64,
    pub psal: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub time: NaiveDateTime,
    pub profile_id: i64,
}

impl ProfileRecord {
    /// `None` when any column is missing, `NaN`, or the time is unparseable.
    pub fn complete(&self) -> Option<CompleteProfile> {
        let finite = |v: Option<f64>| v.filter(|x| x.is_finite());
        let float_id = self.float_id.as_deref().map(str::trim)?;
        if float_id.is_empty() {
            return None;
        }
        Some(CompleteProfile {
            float_id: float_id.to_string(),
            pres: finite(self.pres)?,
            temp: finite(self.temp)?,
            psal: finite(self.psal)?,
            latitude: finite(self.latitude)?,
            longitude: finite(self.longitude)?,
            time: Scalar::parse_timestamp(self.time.as_deref()?)?,
            profile_id: self.profile_id?,
        })
    }
}

// Platform numbers show up as strings or bare integers depending on the exporter.
fn de_float_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Parse a JSON array of records, or one record per line.
pub fn parse_profile_records(text: &str) -> Result<Vec<ProfileRecord>, StoreError> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).map_err(|e| StoreError::Ingest(e.to_string()));
    }

    trimmed
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .map_err(|e| StoreError::Ingest(format!("line {}: {e}", i + 1)))
        })
        .collect()
}

/// Outcome of a load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub read: usize,
    pub inserted: usize,
    pub dropped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROW: &str = r#"{"float_id":"2902746","PRES":5.0,"TEMP":28.1,"PSAL":35.5,"LATITUDE":12.3,"LONGITUDE":88.1,"TIME":"2024-01-03 04:12:00","profile_id":0}"#;

    #[test]
    fn test_parse_json_lines() {
        let text = format!("{ROW}\n\n{ROW}\n");
        let records = parse_profile_records(&text).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].psal, Some(35.5));
    }

    #[test]
    fn test_parse_json_array_with_numeric_float_id() {
        let text = r#"[{"float_id":2902746,"PRES":5.0}]"#;
        let records = parse_profile_records(text).unwrap();
        assert_eq!(records[0].float_id.as_deref(), Some("2902746"));
        assert!(records[0].complete().is_none());
    }

    #[test]
    fn test_parse_reports_line_number() {
        let text = format!("{ROW}\nnot json\n");
        let err = parse_profile_records(&text).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_complete_requires_every_column() {
        let record: ProfileRecord = serde_json::from_str(ROW).unwrap();
        let full = record.complete().unwrap();
        assert_eq!(full.float_id, "2902746");
        assert_eq!(full.time.to_string(), "2024-01-03 04:12:00");

        let mut missing = record.clone();
        missing.temp = None;
        assert!(missing.complete().is_none());

        let mut nan = record;
        nan.psal = Some(f64::NAN);
        assert!(nan.complete().is_none());
    }
}
