//! JSON form of snapshots
//!
//! Markers are encoded as single-key objects (`{"$documentId": "stores/s1"}`
//! and friends) so that a snapshot survives a trip through a JSON column.
//! `serde_json` maps are ordered by key, which makes the encoding canonical
//! and suitable for digests.

use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};

use super::{DocPath, GeoPoint, Mapping, Snapshot};
use crate::errors::{DocTrackError, Result};

pub const DOCUMENT_ID_KEY: &str = "$documentId";
pub const DOCUMENT_REFERENCE_KEY: &str = "$documentReference";
pub const COLLECTION_REFERENCE_KEY: &str = "$collectionReference";
pub const GEO_POINT_KEY: &str = "$geoPoint";

/// Encode a snapshot as JSON
///
/// Non-finite floats have no JSON form and encode as `null`.
pub fn to_json(snapshot: &Snapshot) -> Value {
    match snapshot {
        Snapshot::Null => Value::Null,
        Snapshot::Bool(b) => Value::Bool(*b),
        Snapshot::Int(i) => Value::Number(Number::from(*i)),
        Snapshot::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
        Snapshot::Text(s) => Value::String(s.clone()),
        Snapshot::DocumentId(p) => marker(DOCUMENT_ID_KEY, Value::String(p.to_string())),
        Snapshot::DocumentReference(p) => {
            marker(DOCUMENT_REFERENCE_KEY, Value::String(p.to_string()))
        }
        Snapshot::CollectionReference(p) => {
            marker(COLLECTION_REFERENCE_KEY, Value::String(p.to_string()))
        }
        Snapshot::GeoPoint(g) => {
            let mut point = Map::new();
            point.insert("latitude".to_string(), float(g.latitude));
            point.insert("longitude".to_string(), float(g.longitude));
            marker(GEO_POINT_KEY, Value::Object(point))
        }
        Snapshot::Mapping(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), to_json(v)))
                .collect(),
        ),
        Snapshot::Sequence(items) => Value::Array(items.iter().map(to_json).collect()),
    }
}

/// Decode JSON produced by [`to_json`]
///
/// # Errors
///
/// Returns `Serialization` for a malformed marker and `InvalidPath` for a
/// marker whose path does not parse.
pub fn from_json(value: &Value) -> Result<Snapshot> {
    Ok(match value {
        Value::Null => Snapshot::Null,
        Value::Bool(b) => Snapshot::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Snapshot::Int(i),
            None => Snapshot::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => Snapshot::Text(s.clone()),
        Value::Array(items) => {
            Snapshot::Sequence(items.iter().map(from_json).collect::<Result<_>>()?)
        }
        Value::Object(fields) => {
            if let Some(decoded) = decode_marker(fields)? {
                return Ok(decoded);
            }
            Snapshot::Mapping(
                fields
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), from_json(v)?)))
                    .collect::<Result<Mapping>>()?,
            )
        }
    })
}

/// SHA-256 over the canonical JSON encoding, hex-encoded
pub fn digest(snapshot: &Snapshot) -> String {
    let canonical = to_json(snapshot).to_string();
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

fn marker(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

fn float(f: f64) -> Value {
    Number::from_f64(f).map_or(Value::Null, Value::Number)
}

fn decode_marker(fields: &Map<String, Value>) -> Result<Option<Snapshot>> {
    if fields.len() != 1 {
        return Ok(None);
    }
    let Some((key, value)) = fields.iter().next() else {
        return Ok(None);
    };
    let snapshot = match key.as_str() {
        DOCUMENT_ID_KEY => Snapshot::DocumentId(DocPath::document(marker_text(key, value)?)?),
        DOCUMENT_REFERENCE_KEY => {
            Snapshot::DocumentReference(DocPath::document(marker_text(key, value)?)?)
        }
        COLLECTION_REFERENCE_KEY => {
            Snapshot::CollectionReference(DocPath::parse(marker_text(key, value)?)?)
        }
        GEO_POINT_KEY => {
            let coordinate = |name: &str| {
                value
                    .get(name)
                    .and_then(Value::as_f64)
                    .ok_or_else(|| DocTrackError::Serialization {
                        message: format!("{} marker is missing {}", GEO_POINT_KEY, name),
                    })
            };
            Snapshot::GeoPoint(GeoPoint::new(
                coordinate("latitude")?,
                coordinate("longitude")?,
            ))
        }
        _ => return Ok(None),
    };
    Ok(Some(snapshot))
}

fn marker_text<'a>(key: &str, value: &'a Value) -> Result<&'a str> {
    value.as_str().ok_or_else(|| DocTrackError::Serialization {
        message: format!("{} marker must hold a string path", key),
    })
}
