use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Row identifier as returned by the data store (serial or uuid primary keys)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportId {
    Number(i64),
    Text(String),
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportId::Number(n) => write!(f, "{}", n),
            ReportId::Text(s) => f.write_str(s),
        }
    }
}

/// A row of the `reports` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Nullable text columns render as empty rather than failing the whole collection
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Accepts `timestamptz` (RFC 3339) and plain `timestamp` columns; the latter is taken as UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("invalid created_at timestamp: {}", raw))
    })
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_deserialize_postgrest_row() {
        let json = r#"{
            "id": 7,
            "title": "Ventas",
            "content": "Resumen trimestral",
            "created_at": "2024-01-02T10:11:12.345678+00:00",
            "author": "ignored"
        }"#;
        let report: Report = serde_json::from_str(json).unwrap();
        assert_eq!(report.id, ReportId::Number(7));
        assert_eq!(report.title, "Ventas");
        assert_eq!(
            report.created_at.timestamp(),
            Utc.with_ymd_and_hms(2024, 1, 2, 10, 11, 12).unwrap().timestamp()
        );
    }

    #[test]
    fn test_uuid_identifier() {
        let json = r#"{"id":"5f0c","title":"A","content":"x","created_at":"2024-01-01T00:00:00Z"}"#;
        let report: Report = serde_json::from_str(json).unwrap();
        assert_eq!(report.id.to_string(), "5f0c");
    }

    #[test]
    fn test_null_text_columns_do_not_fail_collection() {
        let json = r#"[
            {"id":1,"title":"A","content":null,"created_at":"2024-01-02T00:00:00Z"},
            {"id":2,"title":null,"content":"y","created_at":"2024-01-01T00:00:00Z"},
            {"id":3,"created_at":"2023-12-31T00:00:00Z"}
        ]"#;
        let reports: Option<Vec<Report>> = serde_json::from_str(json).unwrap();
        let reports = reports.unwrap();

        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].title, "A");
        assert_eq!(reports[0].content, "");
        assert_eq!(reports[1].title, "");
        assert_eq!(reports[1].content, "y");
        assert_eq!(reports[2].content, "");
    }

    #[test]
    fn test_timestamp_without_zone_is_utc() {
        let parsed = parse_timestamp("2024-03-04T05:06:07").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 4, 5, 6, 7).unwrap());

        let parsed = parse_timestamp("2024-03-04 05:06:07.5").unwrap();
        assert_eq!(parsed.timestamp(), 1_709_528_767);
    }

    #[test]
    fn test_invalid_timestamp_rejected() {
        let json = r#"{"id":1,"title":"A","content":"x","created_at":"yesterday"}"#;
        let err = serde_json::from_str::<Report>(json).unwrap_err();
        assert!(err.to_string().contains("yesterday"));
    }
}
