//! Event schema shared by the queue fields and the store projection.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub const FIELD_SERVICE: &str = "service";
pub const FIELD_LEVEL: &str = "level";
pub const FIELD_MESSAGE: &str = "message";
pub const FIELD_TIMESTAMP: &str = "timestamp";

/// Field-name to value mapping stored per queue entry
pub type EventFields = BTreeMap<String, String>;

/// A client-submitted log event. Missing or null fields read as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub service: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub level: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub message: String,
}

fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

impl LogEvent {
    /// Structural parse of a request body. Only a JSON object is accepted;
    /// arrays are rejected even though serde could read them positionally.
    pub fn from_json_slice(raw: &[u8]) -> serde_json::Result<Self> {
        match serde_json::from_slice::<serde_json::Value>(raw)? {
            object @ serde_json::Value::Object(_) => serde_json::from_value(object),
            other => Err(<serde_json::Error as serde::de::Error>::custom(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Queue fields for this event, stamped with the admission time.
    pub fn to_fields(&self, admitted_at: i64) -> EventFields {
        let mut fields = EventFields::new();
        fields.insert(FIELD_SERVICE.to_string(), self.service.clone());
        fields.insert(FIELD_LEVEL.to_string(), self.level.clone());
        fields.insert(FIELD_MESSAGE.to_string(), self.message.clone());
        fields.insert(FIELD_TIMESTAMP.to_string(), admitted_at.to_string());
        fields
    }

    pub fn from_fields(fields: &EventFields) -> Self {
        let get = |name: &str| fields.get(name).cloned().unwrap_or_default();
        Self {
            service: get(FIELD_SERVICE),
            level: get(FIELD_LEVEL),
            message: get(FIELD_MESSAGE),
        }
    }

    pub fn admitted_at(fields: &EventFields) -> Option<i64> {
        fields.get(FIELD_TIMESTAMP)?.parse().ok()
    }
}
