//! Bridge between serde types, [`Value`] and CBOR bytes.
//!
//! Typed values go through `ciborium`'s dynamic value so any `Serialize`
//! type becomes a [`Document`] without a hand-written mapping.

use crate::error::{CodecError, CodecResult};
use crate::value::{Document, Value};
use ciborium::value::Value as CborValue;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Serializes any serde value into a [`Value`].
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> CodecResult<Value> {
    let cbor = CborValue::serialized(value)
        .map_err(|e| CodecError::serialization_failed(e.to_string()))?;
    from_cbor_value(cbor)
}

/// Deserializes a [`Value`] into a typed value.
pub fn from_value<T: DeserializeOwned>(value: &Value) -> CodecResult<T> {
    into_cbor_value(value)
        .deserialized()
        .map_err(|e| CodecError::deserialization_failed(e.to_string()))
}

/// Serializes a struct-like value into a [`Document`].
///
/// Fails with [`CodecError::NotADocument`] if the value does not serialize
/// to a map.
pub fn to_document<T: Serialize + ?Sized>(value: &T) -> CodecResult<Document> {
    match to_value(value)? {
        Value::Document(doc) => Ok(doc),
        other => Err(CodecError::NotADocument {
            found: other.kind(),
        }),
    }
}

/// Deserializes a [`Document`] into a typed value.
pub fn from_document<T: DeserializeOwned>(document: &Document) -> CodecResult<T> {
    into_cbor_value(&Value::Document(document.clone()))
        .deserialized()
        .map_err(|e| CodecError::deserialization_failed(e.to_string()))
}

/// Encodes a value as CBOR bytes.
pub fn encode_value(value: &Value) -> CodecResult<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::into_writer(&into_cbor_value(value), &mut bytes)
        .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    Ok(bytes)
}

/// Decodes CBOR bytes into a value.
pub fn decode_value(bytes: &[u8]) -> CodecResult<Value> {
    let cbor: CborValue =
        ciborium::from_reader(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))?;
    from_cbor_value(cbor)
}

/// Encodes a document as CBOR bytes.
pub fn encode_document(document: &Document) -> CodecResult<Vec<u8>> {
    encode_value(&Value::Document(document.clone()))
}

/// Decodes CBOR bytes that must hold a document.
pub fn decode_document(bytes: &[u8]) -> CodecResult<Document> {
    match decode_value(bytes)? {
        Value::Document(doc) => Ok(doc),
        other => Err(CodecError::NotADocument {
            found: other.kind(),
        }),
    }
}

fn from_cbor_value(cbor: CborValue) -> CodecResult<Value> {
    Ok(match cbor {
        CborValue::Null => Value::Null,
        CborValue::Bool(b) => Value::Bool(b),
        CborValue::Integer(i) => {
            Value::Integer(i64::try_from(i).map_err(|_| CodecError::IntegerOverflow)?)
        }
        CborValue::Float(f) => Value::Float(f),
        CborValue::Text(s) => Value::Text(s),
        CborValue::Bytes(b) => Value::Bytes(b),
        // Tags carry no meaning for documents; keep the payload.
        CborValue::Tag(_, inner) => from_cbor_value(*inner)?,
        CborValue::Array(items) => Value::Array(
            items
                .into_iter()
                .map(from_cbor_value)
                .collect::<CodecResult<Vec<_>>>()?,
        ),
        CborValue::Map(entries) => {
            let mut doc = Document::new();
            for (key, value) in entries {
                let CborValue::Text(key) = key else {
                    return Err(CodecError::NonTextKey);
                };
                doc.insert(key, from_cbor_value(value)?);
            }
            Value::Document(doc)
        }
        other => return Err(CodecError::unsupported_type(format!("{other:?}"))),
    })
}

fn into_cbor_value(value: &Value) -> CborValue {
    match value {
        Value::Null => CborValue::Null,
        Value::Bool(b) => CborValue::Bool(*b),
        Value::Integer(i) => CborValue::Integer((*i).into()),
        Value::Float(f) => CborValue::Float(*f),
        Value::Text(s) => CborValue::Text(s.clone()),
        Value::Bytes(b) => CborValue::Bytes(b.clone()),
        Value::Array(items) => CborValue::Array(items.iter().map(into_cbor_value).collect()),
        Value::Document(doc) => CborValue::Map(
            doc.iter()
                .map(|(k, v)| (CborValue::Text(k.to_string()), into_cbor_value(v)))
                .collect(),
        ),
    }
}
