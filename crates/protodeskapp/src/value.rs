//! # Values
//!
//! [`Value`] is the closed set of things a grid cell can hold. Remote objects
//! are dynamically typed, so every field value coming back from the service is
//! decoded into one of these variants and every value going out is encoded from
//! one.
//!
//! ## Wire Form
//!
//! Values travel as JSON. Plain JSON covers null, booleans, numbers, strings,
//! arrays and records; the remaining variants use single-key tagged records:
//!
//! | Variant   | Wire form                                              |
//! |-----------|--------------------------------------------------------|
//! | `Date`    | `{"$date": "2024-01-02T03:04:05.000Z"}`                |
//! | `Decimal` | `{"$decimal": "1.50"}`                                 |
//! | `Pointer` | `{"$pointer": {"className": "User", "_id": "a1"}}`     |
//! | `File`    | `{"$file": {"_id": "f1", "filename": "a.png", "url": "…"}}` |
//!
//! The same form is used by the clipboard JSON encoding and by the JSON
//! database file behind [`crate::service::fs::FileService`].
//!
//! Relations have no variant of their own: a relation field holds an
//! `Array` of `Pointer`s.

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Number};
use std::cmp::Ordering;
use std::str::FromStr;

/// An ordered record of field values.
pub type Record = IndexMap<String, Value>;

/// Identity of a remote object: its class and id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub class_name: String,
    pub id: String,
}

impl ObjectRef {
    pub fn new(class_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            id: id.into(),
        }
    }
}

/// A stored file: the object id of the file record, its name and download URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub id: String,
    pub filename: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Decimal(Decimal),
    String(String),
    Date(DateTime<Utc>),
    Array(Vec<Value>),
    Object(Record),
    Pointer(ObjectRef),
    File(FileRef),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            Value::Decimal(v) => v.to_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Record> {
        match self {
            Value::Object(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_pointer(&self) -> Option<&ObjectRef> {
        match self {
            Value::Pointer(r) => Some(r),
            _ => None,
        }
    }

    /// The id of the object this value refers to, for pointers and files.
    pub fn object_id(&self) -> Option<&str> {
        match self {
            Value::Pointer(r) => Some(&r.id),
            Value::File(f) => Some(&f.id),
            _ => None,
        }
    }

    /// Name of the value's runtime type, as shown in the config table.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Pointer(_) => "pointer",
            Value::File(_) => "file",
        }
    }

    /// Encode to the JSON wire form.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(v) => serde_json::Value::Bool(*v),
            Value::Number(v) => Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Decimal(v) => json!({ "$decimal": v.to_string() }),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Date(d) => json!({ "$date": format_date(d) }),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Object(record) => serde_json::Value::Object(
                record
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<String, serde_json::Value>>(),
            ),
            Value::Pointer(r) => json!({
                "$pointer": { "className": r.class_name, "_id": r.id }
            }),
            Value::File(f) => {
                let mut inner = Map::new();
                inner.insert("_id".into(), f.id.clone().into());
                inner.insert("filename".into(), f.filename.clone().into());
                if let Some(url) = &f.url {
                    inner.insert("url".into(), url.clone().into());
                }
                json!({ "$file": inner })
            }
        }
    }

    /// Decode from the JSON wire form.
    ///
    /// Decoding never fails: a tagged record whose payload is malformed is kept
    /// as a plain record.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(v) => Value::Bool(*v),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::Array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => {
                if map.len() == 1 {
                    if let Some(tagged) = decode_tagged(map) {
                        return tagged;
                    }
                }
                Value::Object(
                    map.iter()
                        .map(|(k, v)| (k.clone(), Value::from_json(v)))
                        .collect(),
                )
            }
        }
    }

    /// Compact single-line wire serialization.
    pub fn serialize_inline(&self) -> String {
        self.to_json().to_string()
    }

    /// Total ordering used for sorting rows.
    ///
    /// Values of different types order by type rank; numbers and decimals
    /// compare numerically with each other.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Decimal(a), Value::Decimal(b)) => a.cmp(b),
            (a, b) if a.rank() == 2 && b.rank() == 2 => {
                let x = a.as_f64().unwrap_or(f64::NAN);
                let y = b.as_f64().unwrap_or(f64::NAN);
                x.total_cmp(&y)
            }
            (Value::Pointer(a), Value::Pointer(b)) => a.id.cmp(&b.id),
            (Value::File(a), Value::File(b)) => a.filename.cmp(&b.filename),
            (Value::Array(a), Value::Array(b)) => a.len().cmp(&b.len()),
            (Value::Object(a), Value::Object(b)) => a.len().cmp(&b.len()),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) | Value::Decimal(_) => 2,
            Value::String(_) => 3,
            Value::Date(_) => 4,
            Value::Pointer(_) => 5,
            Value::File(_) => 6,
            Value::Array(_) => 7,
            Value::Object(_) => 8,
        }
    }
}

fn decode_tagged(map: &Map<String, serde_json::Value>) -> Option<Value> {
    let (tag, payload) = map.iter().next()?;
    match tag.as_str() {
        "$date" => parse_date(payload.as_str()?).map(Value::Date),
        "$decimal" => Decimal::from_str(payload.as_str()?).ok().map(Value::Decimal),
        "$pointer" => {
            let class_name = payload.get("className")?.as_str()?;
            let id = payload.get("_id")?.as_str()?;
            Some(Value::Pointer(ObjectRef::new(class_name, id)))
        }
        "$file" => Some(Value::File(FileRef {
            id: payload.get("_id")?.as_str()?.to_string(),
            filename: payload.get("filename")?.as_str()?.to_string(),
            url: payload
                .get("url")
                .and_then(|u| u.as_str())
                .map(str::to_string),
        })),
        _ => None,
    }
}

/// Canonical date string: RFC 3339, millisecond precision, `Z` suffix.
pub fn format_date(d: &DateTime<Utc>) -> String {
    d.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(d.with_timezone(&Utc));
    }
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
}

/// Canonical number string.
///
/// Integral values print without a fractional part; non-finite values print
/// as `NaN`, `Infinity` and `-Infinity`.
pub fn format_number(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        let sign = if v > 0.0 { "" } else { "-" };
        format!("{}Infinity", sign)
    } else {
        v.to_string()
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Ok(Value::from_json(&json))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Date(v)
    }
}

impl From<ObjectRef> for Value {
    fn from(v: ObjectRef) -> Self {
        Value::Pointer(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn tagged_wire_forms_decode() {
        let json = json!({
            "when": { "$date": "2024-01-02T03:04:05.000Z" },
            "price": { "$decimal": "1.50" },
            "owner": { "$pointer": { "className": "User", "_id": "u1" } },
        });
        let Value::Object(record) = Value::from_json(&json) else {
            panic!("Expected record");
        };
        assert_eq!(
            record["when"],
            Value::Date(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
        );
        assert_eq!(record["price"], Value::Decimal(Decimal::new(150, 2)));
        assert_eq!(record["owner"], Value::Pointer(ObjectRef::new("User", "u1")));
    }

    #[test]
    fn malformed_tag_stays_a_record() {
        let json = json!({ "$date": "not a date" });
        assert!(matches!(Value::from_json(&json), Value::Object(_)));
    }

    #[test]
    fn wire_form_survives_serde() {
        let value = Value::Array(vec![
            Value::Null,
            Value::Bool(true),
            Value::Number(2.5),
            Value::Decimal(Decimal::new(1999, 2)),
            Value::File(FileRef {
                id: "f1".into(),
                filename: "a.png".into(),
                url: Some("memory://files/f1/a.png".into()),
            }),
        ]);
        let text = serde_json::to_string(&value).unwrap();
        let back: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn numbers_and_decimals_sort_together() {
        let a = Value::Number(1.5);
        let b = Value::Decimal(Decimal::new(2, 0));
        assert_eq!(a.total_cmp(&b), Ordering::Less);
        assert_eq!(Value::Null.total_cmp(&a), Ordering::Less);
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(7.0), "7");
        assert_eq!(format_number(1.25), "1.25");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
    }

    #[test]
    fn bare_date_parses_as_utc_midnight() {
        assert_eq!(
            parse_date("2024-03-01"),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_date("yesterday"), None);
    }
}
