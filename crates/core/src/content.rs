//! Per-record content mappings.
//!
//! Each record fetched for a job carries its own content as serialized JSON.
//! The decoded object, plus the job id and generation timestamp, is the
//! substitution source for one rendering pass.

use crate::error::{Error, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Content key overlaid with the job identifier.
pub const JOB_ID_KEY: &str = "jobid";

/// Content key overlaid with the generation timestamp.
pub const JOB_DATE_KEY: &str = "jobdate";

/// Format of the generation timestamp.
pub const JOB_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A record as returned by the data service: column name to value.
pub type Record = Map<String, Value>;

/// Job-level values injected into every record's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobMetadata {
    pub id: String,
    pub generated_at: String,
}

impl JobMetadata {
    pub fn new(id: impl Into<String>, generated_at: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            generated_at: generated_at.into(),
        }
    }

    /// Metadata stamped with the current local time.
    pub fn now(id: impl Into<String>) -> Self {
        Self::new(id, Local::now().format(JOB_DATE_FORMAT).to_string())
    }
}

/// Substitution source: content key to value, in insertion order.
///
/// A value is either a scalar or a list of records (objects) that fills a
/// table placeholder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Content {
    values: Map<String, Value>,
}

impl Content {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode serialized JSON. Anything but an object is rejected.
    pub fn decode(raw: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(values)) => Ok(Self { values }),
            Ok(other) => Err(Error::ContentDecode(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            ))),
            Err(e) => Err(Error::ContentDecode(e.to_string())),
        }
    }

    /// Resolve the content embedded in a record's `field` column.
    ///
    /// A missing or null column gives empty content. A column that fails to
    /// decode is logged and also gives empty content, so every placeholder
    /// but the job values renders as `n/a`.
    pub fn from_record(record: &Record, field: &str) -> Self {
        match record.get(field) {
            None | Some(Value::Null) => Self::new(),
            Some(Value::Object(values)) => Self {
                values: values.clone(),
            },
            Some(Value::String(raw)) => Self::decode(raw).unwrap_or_else(|e| {
                log::warn!("Ignoring content of record: {}", e);
                Self::new()
            }),
            Some(other) => {
                log::warn!(
                    "Ignoring content of record: column '{}' holds {}",
                    field,
                    json_kind(other)
                );
                Self::new()
            }
        }
    }

    /// Insert or override the job id and generation timestamp.
    pub fn with_job(mut self, job: &JobMetadata) -> Self {
        self.insert(JOB_ID_KEY, job.id.clone());
        self.insert(JOB_DATE_KEY, job.generated_at.clone());
        self
    }

    /// Insert a value. An existing key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The list bound to `key`, if it is a non-empty array.
    pub fn rows(&self, key: &str) -> Option<&[Value]> {
        match self.values.get(key) {
            Some(Value::Array(rows)) if !rows.is_empty() => Some(rows),
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for Content {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

/// Resolve one content mapping per record, in record order.
pub fn resolve(records: &[Record], field: &str, job: &JobMetadata) -> Vec<Content> {
    records
        .iter()
        .map(|record| Content::from_record(record, field).with_job(job))
        .collect()
}

/// String form of a value as it appears in the rendered document.
///
/// Strings are written verbatim, null as nothing, everything else in its
/// compact JSON form. Booleans keep their JSON spelling, `true` and `false`.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("record must be an object"),
        }
    }

    fn job() -> JobMetadata {
        JobMetadata::new("42", "2024-03-01 09:30:00")
    }

    #[test]
    fn test_from_record_decodes_embedded_json() {
        let rec = record(json!({
            "jeschro_content": r#"{"client": "Acme", "total": 12.5}"#,
            "other": 1
        }));
        let content = Content::from_record(&rec, "jeschro_content");
        assert_eq!(content.get("client"), Some(&json!("Acme")));
        assert_eq!(content.get("total"), Some(&json!(12.5)));
        assert_eq!(content.len(), 2);
    }

    #[test]
    fn test_from_record_accepts_object_column() {
        let rec = record(json!({"content": {"client": "Acme"}}));
        let content = Content::from_record(&rec, "content");
        assert_eq!(content.get("client"), Some(&json!("Acme")));
    }

    #[test]
    fn test_malformed_content_is_swallowed() {
        let rec = record(json!({"content": "{not json"}));
        let content = Content::from_record(&rec, "content").with_job(&job());
        let keys: Vec<_> = content.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["jobid", "jobdate"]);
    }

    #[test]
    fn test_non_object_content_is_swallowed() {
        let rec = record(json!({"content": "[1, 2]"}));
        assert!(Content::from_record(&rec, "content").is_empty());
        assert!(matches!(Content::decode("[1, 2]"), Err(Error::ContentDecode(_))));
    }

    #[test]
    fn test_missing_column_gives_empty_content() {
        let rec = record(json!({"other": "x"}));
        assert!(Content::from_record(&rec, "content").is_empty());
    }

    #[test]
    fn test_with_job_overrides_in_place() {
        let rec = record(json!({"content": r#"{"jobid": "old", "client": "Acme"}"#}));
        let content = Content::from_record(&rec, "content").with_job(&job());
        let entries: Vec<_> = content
            .iter()
            .map(|(k, v)| (k.as_str(), stringify(v)))
            .collect();
        assert_eq!(
            entries,
            vec![
                ("jobid", "42".to_string()),
                ("client", "Acme".to_string()),
                ("jobdate", "2024-03-01 09:30:00".to_string()),
            ]
        );
    }

    #[test]
    fn test_rows_requires_non_empty_array() {
        let mut content = Content::new();
        content.insert("items", json!([{"a": 1}]));
        content.insert("empty", json!([]));
        content.insert("scalar", "x");
        assert_eq!(content.rows("items").map(<[Value]>::len), Some(1));
        assert!(content.rows("empty").is_none());
        assert!(content.rows("scalar").is_none());
        assert!(content.rows("missing").is_none());
    }

    #[test]
    fn test_stringify() {
        assert_eq!(stringify(&json!("text")), "text");
        assert_eq!(stringify(&json!(3)), "3");
        assert_eq!(stringify(&json!(2.5)), "2.5");
        assert_eq!(stringify(&json!(true)), "true");
        assert_eq!(stringify(&Value::Null), "");
        assert_eq!(stringify(&json!([1, "a"])), r#"[1,"a"]"#);
    }

    #[test]
    fn test_resolve_keeps_record_order() {
        let records = vec![
            record(json!({"content": r#"{"n": 1}"#})),
            record(json!({"content": "oops"})),
        ];
        let contents = resolve(&records, "content", &job());
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0].get("n"), Some(&json!(1)));
        assert_eq!(contents[1].len(), 2);
        assert_eq!(contents[1].get("jobid"), Some(&json!("42")));
    }

    #[test]
    fn test_job_metadata_now_format() {
        let job = JobMetadata::now("7");
        assert_eq!(job.generated_at.len(), "2024-03-01 09:30:00".len());
        assert!(chrono::NaiveDateTime::parse_from_str(&job.generated_at, JOB_DATE_FORMAT).is_ok());
    }
}
