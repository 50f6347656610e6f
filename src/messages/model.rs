//! Message data model and request payloads.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// A single board post.
///
/// Serializes to `{id, body, username, created_at, updated_at}` with every
/// field always present; missing text is rendered as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: i64,
    pub body: Option<String>,
    pub username: Option<String>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// Fixed-width RFC 3339 in UTC with microseconds, e.g. `2024-05-01T12:30:00.000000Z`.
///
/// Used both on the wire and in the database, where text order must match
/// chronological order.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn serialize_timestamp<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(dt))
}

/// Decode a request payload, accepting only a JSON object.
///
/// Derived struct deserializers also take sequences (`["hi", "bob"]`), which
/// the API does not.
pub fn from_json_object<T: DeserializeOwned>(value: Value) -> Result<T, serde_json::Error> {
    if !value.is_object() {
        return Err(serde::de::Error::custom(format!(
            "expected a JSON object, got {}",
            json_kind(&value)
        )));
    }
    serde_json::from_value(value)
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

/// Payload for `POST /messages`.
///
/// Absent keys are stored as NULL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateMessage {
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// Payload for `PATCH /messages/{id}`.
///
/// An absent or null `body` leaves the stored body unchanged. Any other key,
/// `username` included, is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMessage {
    #[serde(default)]
    pub body: Option<String>,
}
