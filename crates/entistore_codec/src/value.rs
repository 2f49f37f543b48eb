//! Dynamic document value type.

use std::cmp::Ordering;
use std::fmt;

/// A dynamic document value.
///
/// This is the shape every stored entity takes once serialized, and the
/// shape of literals inside filters. Integers are kept as `i64`; floats are
/// allowed since application documents routinely carry them.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// Text string (UTF-8).
    Text(String),
    /// Byte string.
    Bytes(Vec<u8>),
    /// Array of values.
    Array(Vec<Value>),
    /// Nested document.
    Document(Document),
}

impl Value {
    /// Returns a short name for the kind of value, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::Document(_) => "document",
        }
    }

    /// Returns the boolean if this is a `Bool`.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer if this is an `Integer`.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns a numeric view of integers and floats.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the text if this is a `Text`.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the nested document if this is a `Document`.
    #[must_use]
    pub const fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(d) => Some(d),
            _ => None,
        }
    }

    /// Returns true for `Null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Compares two values the way a filter does.
    ///
    /// Numbers compare across integer/float. Text compares bytewise, or
    /// case-insensitively when `fold_case` is set. Values of unrelated kinds
    /// are not comparable and yield `None`, so range filters never match them.
    #[must_use]
    pub fn compare(&self, other: &Self, fold_case: bool) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
                self.as_f64()?.partial_cmp(&other.as_f64()?)
            }
            (Value::Text(a), Value::Text(b)) => {
                if fold_case {
                    Some(a.to_lowercase().cmp(&b.to_lowercase()))
                } else {
                    Some(a.cmp(b))
                }
            }
            (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
            (Value::Array(a), Value::Array(b)) => {
                for (av, bv) in a.iter().zip(b.iter()) {
                    match av.compare(bv, fold_case)? {
                        Ordering::Equal => continue,
                        ord => return Some(ord),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            (Value::Document(a), Value::Document(b)) => {
                (a.len() == b.len()
                    && a.iter().all(|(k, v)| {
                        b.get(k)
                            .and_then(|w| v.compare(w, fold_case))
                            .is_some_and(Ordering::is_eq)
                    }))
                .then_some(Ordering::Equal)
            }
            _ => None,
        }
    }

    /// Equality as used by filters (numeric widening, optional case folding).
    #[must_use]
    pub fn matches(&self, other: &Self, fold_case: bool) -> bool {
        self.compare(other, fold_case) == Some(Ordering::Equal)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Document(d) => write!(f, "{d}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Document> for Value {
    fn from(d: Document) -> Self {
        Value::Document(d)
    }
}

/// An ordered set of named fields.
///
/// Field order is preserved as written; keys are unique.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    fields: Vec<(String, Value)>,
}

impl Document {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Document::insert`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts or replaces a top-level field, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.fields.push((key, value));
                None
            }
        }
    }

    /// Returns a top-level field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Resolves a dotted path (`address.city`) through nested documents.
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.get(parts.next()?)?;
        for part in parts {
            current = current.as_document()?.get(part)?;
        }
        Some(current)
    }

    /// Sets a dotted path, creating intermediate documents as needed.
    ///
    /// An intermediate field that exists but is not a document is replaced.
    pub fn set_path(&mut self, path: &str, value: Value) {
        match path.split_once('.') {
            None => {
                self.insert(path, value);
            }
            Some((head, rest)) => {
                let needs_document = !matches!(self.get(head), Some(Value::Document(_)));
                if needs_document {
                    self.insert(head, Document::new());
                }
                if let Some((_, Value::Document(child))) =
                    self.fields.iter_mut().find(|(k, _)| k == head)
                {
                    child.set_path(rest, value);
                }
            }
        }
    }

    /// Removes a dotted path, returning the removed value.
    pub fn remove_path(&mut self, path: &str) -> Option<Value> {
        match path.split_once('.') {
            None => {
                let pos = self.fields.iter().position(|(k, _)| k == path)?;
                Some(self.fields.remove(pos).1)
            }
            Some((head, rest)) => match self.fields.iter_mut().find(|(k, _)| k == head) {
                Some((_, Value::Document(child))) => child.remove_path(rest),
                _ => None,
            },
        }
    }

    /// Returns true if the top-level field exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of top-level fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates fields in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates field names in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}: {v}")?;
        }
        f.write_str("}")
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut doc = Document::new();
        for (k, v) in iter {
            doc.insert(k, v);
        }
        doc
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_existing_key() {
        let mut doc = Document::new().with("a", 1).with("b", 2);
        let previous = doc.insert("a", 10);
        assert_eq!(previous, Some(Value::Integer(1)));
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.get("a"), Some(&Value::Integer(10)));
    }

    #[test]
    fn field_order_is_preserved() {
        let doc = Document::new().with("z", 1).with("a", 2).with("m", 3);
        let keys: Vec<&str> = doc.keys().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn dotted_paths() {
        let mut doc = Document::new();
        doc.set_path("address.city", Value::from("Dar es Salaam"));
        doc.set_path("address.zip", Value::from(11101));

        assert_eq!(
            doc.get_path("address.city"),
            Some(&Value::Text("Dar es Salaam".into()))
        );
        assert!(doc.get_path("address.street").is_none());
        assert!(doc.get_path("missing.city").is_none());

        assert_eq!(doc.remove_path("address.zip"), Some(Value::Integer(11101)));
        assert!(doc.get_path("address.zip").is_none());
    }

    #[test]
    fn set_path_overwrites_scalar_parent() {
        let mut doc = Document::new().with("meta", 5);
        doc.set_path("meta.tag", Value::from("x"));
        assert_eq!(doc.get_path("meta.tag"), Some(&Value::Text("x".into())));
    }

    #[test]
    fn numeric_comparison_widens() {
        assert_eq!(
            Value::Integer(2).compare(&Value::Float(2.5), false),
            Some(Ordering::Less)
        );
        assert!(Value::Integer(3).matches(&Value::Float(3.0), false));
    }

    #[test]
    fn text_comparison_with_case_folding() {
        let a = Value::from("Alice");
        let b = Value::from("alice");
        assert!(!a.matches(&b, false));
        assert!(a.matches(&b, true));
    }

    #[test]
    fn unrelated_kinds_are_incomparable() {
        assert_eq!(Value::from("1").compare(&Value::Integer(1), false), None);
        assert_eq!(Value::Null.compare(&Value::Integer(0), false), None);
    }

    #[test]
    fn display_is_readable() {
        let doc = Document::new().with("name", "Ana").with("tags", vec![Value::from(1)]);
        assert_eq!(doc.to_string(), r#"{name: "Ana", tags: [1]}"#);
    }
}
