use super::SoundMetadata;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field-equality filter over sound records
///
/// A record matches when every key of the query equals the same field of
/// the record's JSON form. The empty query matches every record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SoundQuery(Map<String, Value>);

impl SoundQuery {
    /// Query matching all records
    pub fn all() -> Self {
        Self::default()
    }

    /// Add an equality constraint
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check a record against this query
    pub fn matches(&self, record: &SoundMetadata) -> bool {
        if self.0.is_empty() {
            return true;
        }

        match serde_json::to_value(record) {
            Ok(Value::Object(fields)) => self
                .0
                .iter()
                .all(|(key, expected)| fields.get(key) == Some(expected)),
            _ => false,
        }
    }
}
