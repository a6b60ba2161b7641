//! Helpers for the schemaless customer resource. Documents stay as raw BSON;
//! these functions translate between query strings, JSON bodies and BSON.

use chrono::{NaiveDate, TimeZone, Utc};
use mongodb::bson::{self, Bson, DateTime, Document};
use serde_json::{Map, Value};

pub const BIRTHDATE_FORMAT: &str = "%Y-%m-%d";

/// Builds an exact-match filter from query-string pairs.
/// `true`/`false` become booleans and integers become numbers; everything
/// else is matched as a string.
pub fn filter_from_query(params: &[(String, String)]) -> Document {
    let mut filter = Document::new();
    for (key, raw) in params {
        filter.insert(key.clone(), coerce_query_value(raw));
    }
    filter
}

fn coerce_query_value(raw: &str) -> Bson {
    match raw {
        "true" => Bson::Boolean(true),
        "false" => Bson::Boolean(false),
        _ => match raw.parse::<i64>() {
            Ok(n) => Bson::Int64(n),
            Err(_) => Bson::String(raw.to_string()),
        },
    }
}

/// Parses a `YYYY-MM-DD` date into a BSON datetime at UTC midnight.
pub fn parse_day(raw: &str) -> Option<DateTime> {
    let date = NaiveDate::parse_from_str(raw, BIRTHDATE_FORMAT).ok()?;
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Some(DateTime::from_millis(
        Utc.from_utc_datetime(&midnight).timestamp_millis(),
    ))
}

/// Converts a JSON object into a BSON document.
pub fn json_to_document(map: Map<String, Value>) -> Result<Document, bson::ser::Error> {
    match bson::to_bson(&Value::Object(map))? {
        Bson::Document(doc) => Ok(doc),
        _ => Ok(Document::new()),
    }
}

/// Bodies that already use update operators pass through; a plain field map
/// is treated as `$set`.
pub fn into_update(body: Document) -> Document {
    if body.keys().any(|k| k.starts_with('$')) {
        body
    } else {
        let mut update = Document::new();
        update.insert("$set", body);
        update
    }
}

/// Renders a stored document as JSON with identifiers as hex strings and
/// datetimes as RFC 3339 strings.
pub fn document_to_json(doc: Document) -> Value {
    Value::Object(
        doc.into_iter()
            .map(|(k, v)| (k, bson_to_json(v)))
            .collect(),
    )
}

fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => match dt.try_to_rfc3339_string() {
            Ok(s) => Value::String(s),
            Err(_) => Bson::DateTime(dt).into_relaxed_extjson(),
        },
        Bson::Document(doc) => document_to_json(doc),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        other => other.into_relaxed_extjson(),
    }
}

/// Looks up a dotted path, descending through embedded documents.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_document()?.get(part)?;
    }
    Some(current)
}

/// Equality as the store applies it to a single-value filter: numbers compare
/// by value across widths and arrays match on any element.
pub fn loosely_equal(stored: &Bson, wanted: &Bson) -> bool {
    if let Bson::Array(items) = stored {
        if !matches!(wanted, Bson::Array(_)) {
            return items.iter().any(|item| loosely_equal(item, wanted));
        }
    }
    match (as_number(stored), as_number(wanted)) {
        (Some(a), Some(b)) => a == b,
        _ => stored == wanted,
    }
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}
