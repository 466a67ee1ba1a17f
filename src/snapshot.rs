//! `SnapshotValue`, `StateSnapshot` and `StatePatch`.
//!
//! `SnapshotValue` is the JSON-like sum type every observed field value is
//! projected into before it crosses the sync boundary. Encoding is native
//! JSON; decoding additionally accepts the legacy `{"type", "value"}` tagged
//! shape for compatibility with older recorded payloads.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as Json;

/// JSON-like value produced by `SyncEngine::extractSnapshot`. Object keys are
/// kept in a `BTreeMap` so canonicalization (state hashing) and snapshot
/// comparison never depend on field insertion order.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotValue {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Array(Vec<SnapshotValue>),
    Object(BTreeMap<String, SnapshotValue>),
}

impl SnapshotValue {
    pub fn object(fields: impl IntoIterator<Item = (String, SnapshotValue)>) -> Self {
        SnapshotValue::Object(fields.into_iter().collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SnapshotValue::Null)
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, SnapshotValue>> {
        match self {
            SnapshotValue::Object(map) => Some(map),
            _ => None,
        }
    }
}

impl From<SnapshotValue> for Json {
    fn from(value: SnapshotValue) -> Self {
        match value {
            SnapshotValue::Null => Json::Null,
            SnapshotValue::Bool(b) => Json::Bool(b),
            SnapshotValue::Int(i) => Json::Number(i.into()),
            SnapshotValue::Double(d) => serde_json::Number::from_f64(d)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            SnapshotValue::String(s) => Json::String(s),
            SnapshotValue::Array(items) => {
                Json::Array(items.into_iter().map(Json::from).collect())
            }
            SnapshotValue::Object(fields) => Json::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Json::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Legacy tagged representation accepted on decode only: `{"type": "...", "value": ...}`.
fn from_legacy_tagged(json: &Json) -> Option<SnapshotValue> {
    let obj = json.as_object()?;
    if obj.len() != 2 {
        return None;
    }
    let ty = obj.get("type")?.as_str()?;
    let value = obj.get("value")?;
    match ty {
        "null" => Some(SnapshotValue::Null),
        "bool" => value.as_bool().map(SnapshotValue::Bool),
        "int" => value.as_i64().map(SnapshotValue::Int),
        "double" => value.as_f64().map(SnapshotValue::Double),
        "string" => value.as_str().map(|s| SnapshotValue::String(s.to_string())),
        "array" => value
            .as_array()
            .map(|items| items.iter().map(from_json_value).collect())
            .map(SnapshotValue::Array),
        "object" => value.as_object().map(|map| {
            SnapshotValue::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), from_json_value(v)))
                    .collect(),
            )
        }),
        _ => None,
    }
}

fn from_json_value(json: &Json) -> SnapshotValue {
    if let Some(legacy) = from_legacy_tagged(json) {
        return legacy;
    }
    match json {
        Json::Null => SnapshotValue::Null,
        Json::Bool(b) => SnapshotValue::Bool(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                SnapshotValue::Int(i)
            } else {
                SnapshotValue::Double(n.as_f64().unwrap_or_default())
            }
        }
        Json::String(s) => SnapshotValue::String(s.clone()),
        Json::Array(items) => SnapshotValue::Array(items.iter().map(from_json_value).collect()),
        Json::Object(map) => SnapshotValue::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), from_json_value(v)))
                .collect(),
        ),
    }
}

impl From<Json> for SnapshotValue {
    fn from(json: Json) -> Self {
        from_json_value(&json)
    }
}

impl Serialize for SnapshotValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Json::from(self.clone()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SnapshotValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = Json::deserialize(deserializer).map_err(D::Error::custom)?;
        Ok(SnapshotValue::from(json))
    }
}

impl fmt::Display for SnapshotValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Json::from(self.clone()))
    }
}

/// A field name, mapping key, or sequence index rendered as a JSON Pointer
/// segment. `/` and `~` in the segment are escaped per RFC 6901.
pub fn escape_pointer_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Joins already-escaped path segments into a JSON Pointer string.
pub fn join_pointer(segments: &[String]) -> String {
    let mut out = String::new();
    for segment in segments {
        out.push('/');
        out.push_str(segment);
    }
    out
}

/// `object` `SnapshotValue` keyed by field name, produced for a single
/// observer by `SyncEngine::extractSnapshot`.
pub type StateSnapshot = BTreeMap<String, SnapshotValue>;

/// A single mutation against an observer's cached snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOp {
    Set(SnapshotValue),
    Delete,
    Add(SnapshotValue),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatePatch {
    pub path: String,
    pub op: PatchOp,
}

impl StatePatch {
    pub fn set(path: impl Into<String>, value: SnapshotValue) -> Self {
        Self { path: path.into(), op: PatchOp::Set(value) }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self { path: path.into(), op: PatchOp::Delete }
    }

    pub fn add(path: impl Into<String>, value: SnapshotValue) -> Self {
        Self { path: path.into(), op: PatchOp::Add(value) }
    }
}

/// Result of `SyncEngine::generateDiff` for one observer.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncUpdate {
    FirstSync(Vec<StatePatch>),
    Diff(Vec<StatePatch>),
    NoChange,
}

impl SyncUpdate {
    pub fn patches(&self) -> &[StatePatch] {
        match self {
            SyncUpdate::FirstSync(patches) | SyncUpdate::Diff(patches) => patches,
            SyncUpdate::NoChange => &[],
        }
    }

    pub fn is_no_change(&self) -> bool {
        matches!(self, SyncUpdate::NoChange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_value_json_round_trip() {
        let value = SnapshotValue::object([
            ("a".to_string(), SnapshotValue::Int(1)),
            (
                "b".to_string(),
                SnapshotValue::Array(vec![SnapshotValue::String("x".into()), SnapshotValue::Null]),
            ),
        ]);
        let encoded = serde_json::to_string(&value).unwrap();
        let decoded: SnapshotValue = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value, decoded);
    }

    #[test]
    fn legacy_tagged_shape_decodes() {
        let json = serde_json::json!({"type": "int", "value": 42});
        let decoded: SnapshotValue = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, SnapshotValue::Int(42));
    }

    #[test]
    fn escapes_slash_and_tilde() {
        assert_eq!(escape_pointer_segment("a/b~c"), "a~1b~0c");
    }
}
