//! Native query language of the document store.
//!
//! These are the shapes a store driver understands: filters, update
//! operators, collations and index definitions. Higher layers translate
//! into them; nothing here knows about typed entities.

use crate::error::{ClientError, ClientResult};
use entistore_codec::{Document, Value};
use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

/// Name of the identity field every document carries.
pub const ID_FIELD: &str = "_id";

/// Name of the index every collection is created with.
pub const ID_INDEX_NAME: &str = "_id_";

/// Comparison operator of a field filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
}

impl Comparison {
    /// Operator token as used in rendered filters.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Comparison::Eq => "$eq",
            Comparison::Ne => "$ne",
            Comparison::Gt => "$gt",
            Comparison::Gte => "$gte",
            Comparison::Lt => "$lt",
            Comparison::Lte => "$lte",
        }
    }

    /// The operator with its operands swapped (`5 < x` is `x > 5`).
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Comparison::Gt => Comparison::Lt,
            Comparison::Gte => Comparison::Lte,
            Comparison::Lt => Comparison::Gt,
            Comparison::Lte => Comparison::Gte,
            other => other,
        }
    }

    fn holds(self, ordering: Option<Ordering>) -> bool {
        match (self, ordering) {
            (Comparison::Ne, ord) => ord != Some(Ordering::Equal),
            (_, None) => false,
            (Comparison::Eq, Some(ord)) => ord.is_eq(),
            (Comparison::Gt, Some(ord)) => ord.is_gt(),
            (Comparison::Gte, Some(ord)) => ord.is_ge(),
            (Comparison::Lt, Some(ord)) => ord.is_lt(),
            (Comparison::Lte, Some(ord)) => ord.is_le(),
        }
    }
}

/// A document filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document.
    All,
    /// Compares the value at a dotted path with a literal.
    Field {
        /// Dotted field path.
        path: String,
        /// Comparison operator.
        op: Comparison,
        /// Literal operand.
        value: Value,
    },
    /// `path % divisor == remainder` on integer fields.
    Mod {
        /// Dotted field path.
        path: String,
        /// Divisor (never zero once validated).
        divisor: i64,
        /// Expected remainder.
        remainder: i64,
    },
    /// All sub-filters match.
    And(Vec<Filter>),
    /// At least one sub-filter matches.
    Or(Vec<Filter>),
    /// The sub-filter does not match.
    Not(Box<Filter>),
}

impl Filter {
    /// Filter matching no document.
    #[must_use]
    pub fn none() -> Self {
        Filter::Not(Box::new(Filter::All))
    }

    /// Field comparison filter.
    #[must_use]
    pub fn field(path: impl Into<String>, op: Comparison, value: impl Into<Value>) -> Self {
        Filter::Field {
            path: path.into(),
            op,
            value: value.into(),
        }
    }

    /// `path == value`.
    #[must_use]
    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(path, Comparison::Eq, value)
    }

    /// Matches the document with the given identity.
    #[must_use]
    pub fn id(value: impl Into<Value>) -> Self {
        Self::eq(ID_FIELD, value)
    }

    /// Tests a document against this filter.
    ///
    /// A missing field behaves as `null`. When the field holds an array and
    /// the operand does not, the filter matches if any element matches.
    #[must_use]
    pub fn matches(&self, document: &Document, fold_case: bool) -> bool {
        match self {
            Filter::All => true,
            Filter::Field { path, op, value } => {
                let field = document.get_path(path).unwrap_or(&Value::Null);
                match (field, value) {
                    (Value::Array(items), operand) if !matches!(operand, Value::Array(_)) => {
                        if *op == Comparison::Ne {
                            !items.iter().any(|item| item.matches(operand, fold_case))
                        } else {
                            items
                                .iter()
                                .any(|item| op.holds(item.compare(operand, fold_case)))
                        }
                    }
                    (field, operand) => op.holds(field.compare(operand, fold_case)),
                }
            }
            Filter::Mod {
                path,
                divisor,
                remainder,
            } => {
                #[allow(clippy::cast_possible_truncation)]
                let number = match document.get_path(path) {
                    Some(Value::Integer(i)) => Some(*i),
                    Some(Value::Float(f)) if f.is_finite() => Some(f.trunc() as i64),
                    _ => None,
                };
                match number {
                    Some(n) if *divisor != 0 => n.wrapping_rem(*divisor) == *remainder,
                    _ => false,
                }
            }
            Filter::And(filters) => filters.iter().all(|f| f.matches(document, fold_case)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(document, fold_case)),
            Filter::Not(inner) => !inner.matches(document, fold_case),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, op: &str, filters: &[Filter]) -> fmt::Result {
            write!(f, "{{{op}: [")?;
            for (i, filter) in filters.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{filter}")?;
            }
            f.write_str("]}")
        }

        match self {
            Filter::All => f.write_str("{}"),
            Filter::Field { path, op, value } => {
                write!(f, "{{{path}: {{{}: {value}}}}}", op.token())
            }
            Filter::Mod {
                path,
                divisor,
                remainder,
            } => write!(f, "{{{path}: {{$mod: [{divisor}, {remainder}]}}}}"),
            Filter::And(filters) => list(f, "$and", filters),
            Filter::Or(filters) => list(f, "$or", filters),
            Filter::Not(inner) => write!(f, "{{$nor: [{inner}]}}"),
        }
    }
}

/// A single update operator.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    /// Sets a field, creating intermediate documents.
    Set(String, Value),
    /// Removes a field.
    Unset(String),
    /// Adds a number to a numeric field (missing counts as zero).
    Inc(String, Value),
}

/// A partial update applied to every matching document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Update {
    ops: Vec<UpdateOp>,
}

impl Update {
    /// Creates an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a `$set`.
    #[must_use]
    pub fn set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Set(path.into(), value.into()));
        self
    }

    /// Adds an `$unset`.
    #[must_use]
    pub fn unset(mut self, path: impl Into<String>) -> Self {
        self.ops.push(UpdateOp::Unset(path.into()));
        self
    }

    /// Adds an `$inc`.
    #[must_use]
    pub fn inc(mut self, path: impl Into<String>, amount: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Inc(path.into(), amount.into()));
        self
    }

    /// Returns the operators in application order.
    #[must_use]
    pub fn ops(&self) -> &[UpdateOp] {
        &self.ops
    }

    /// Returns true if there are no operators.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Applies every operator to a document.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUpdate` if an operator targets `_id` or `$inc` meets a
    /// non-numeric value.
    pub fn apply(&self, document: &mut Document) -> ClientResult<()> {
        for op in &self.ops {
            let path = match op {
                UpdateOp::Set(path, _) | UpdateOp::Unset(path) | UpdateOp::Inc(path, _) => path,
            };
            if path == ID_FIELD || path.starts_with("_id.") {
                return Err(ClientError::invalid_update("the _id field cannot be updated"));
            }

            match op {
                UpdateOp::Set(path, value) => document.set_path(path, value.clone()),
                UpdateOp::Unset(path) => {
                    document.remove_path(path);
                }
                UpdateOp::Inc(path, amount) => {
                    let current = document.get_path(path).cloned().unwrap_or(Value::Integer(0));
                    let sum = match (&current, amount) {
                        (Value::Integer(a), Value::Integer(b)) => Value::Integer(
                            a.checked_add(*b)
                                .ok_or_else(|| ClientError::invalid_update("$inc overflow"))?,
                        ),
                        (a, b) => match (a.as_f64(), b.as_f64()) {
                            (Some(a), Some(b)) => Value::Float(a + b),
                            _ => {
                                return Err(ClientError::invalid_update(format!(
                                    "cannot $inc {} by {}",
                                    current.kind(),
                                    amount.kind()
                                )))
                            }
                        },
                    };
                    document.set_path(path, sum);
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match op {
                UpdateOp::Set(path, value) => write!(f, "$set: {{{path}: {value}}}")?,
                UpdateOp::Unset(path) => write!(f, "$unset: {{{path}: 1}}")?,
                UpdateOp::Inc(path, value) => write!(f, "$inc: {{{path}: {value}}}")?,
            }
        }
        f.write_str("}")
    }
}

/// Outcome of an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateResult {
    /// Documents matched by the filter.
    pub matched: u64,
    /// Documents actually changed.
    pub modified: u64,
}

/// Locale-aware string comparison rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collation {
    /// ICU locale, e.g. `en`.
    pub locale: String,
    /// Comparison strength (1 = base letters, 2 = accents, 3 = case).
    pub strength: u8,
}

impl Collation {
    /// Creates a collation with tertiary (case-sensitive) strength.
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            strength: 3,
        }
    }

    /// Sets the comparison strength.
    #[must_use]
    pub const fn strength(mut self, strength: u8) -> Self {
        self.strength = strength;
        self
    }

    /// Case-insensitive collation for a locale.
    pub fn case_insensitive(locale: impl Into<String>) -> Self {
        Self::new(locale).strength(2)
    }

    /// Whether text comparisons ignore case.
    #[must_use]
    pub const fn folds_case(&self) -> bool {
        matches!(self.strength, 1 | 2)
    }
}

/// Per-call options shared by read and write operations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryOptions {
    /// Collation override.
    pub collation: Option<Collation>,
}

impl QueryOptions {
    /// Options with an optional collation.
    #[must_use]
    pub fn with_collation(collation: Option<&Collation>) -> Self {
        Self {
            collation: collation.cloned(),
        }
    }

    /// Whether text comparisons ignore case.
    #[must_use]
    pub fn folds_case(&self) -> bool {
        self.collation.as_ref().is_some_and(Collation::folds_case)
    }
}

/// Definition of a secondary index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexModel {
    /// Index name.
    pub name: String,
    /// Ordered key fields (ascending).
    pub keys: Vec<String>,
    /// TTL: documents expire this long after the (single) key's timestamp.
    pub expire_after: Option<Duration>,
    /// Whether the index enforces uniqueness.
    pub unique: bool,
}

impl IndexModel {
    /// Creates an ascending index over the given fields.
    pub fn new(name: impl Into<String>, keys: Vec<String>) -> Self {
        Self {
            name: name.into(),
            keys,
            expire_after: None,
            unique: false,
        }
    }

    /// Makes this a TTL index.
    #[must_use]
    pub const fn expire_after(mut self, ttl: Duration) -> Self {
        self.expire_after = Some(ttl);
        self
    }

    /// Makes this a unique index.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// The index every collection starts with.
    #[must_use]
    pub fn primary() -> Self {
        Self::new(ID_INDEX_NAME, vec![ID_FIELD.to_string()]).unique()
    }

    /// Whether this index's keys include every one of `fields`.
    #[must_use]
    pub fn covers(&self, fields: &[String]) -> bool {
        fields.iter().all(|field| self.keys.contains(field))
    }
}

/// Administrative commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Round trip with no side effects.
    Ping,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Ping => f.write_str("ping"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> Document {
        Document::new()
            .with("_id", "o-1")
            .with("customer", "Neema")
            .with("total", 120)
            .with("tags", vec![Value::from("rush"), Value::from("gift")])
            .with("shipping", Document::new().with("city", "Mwanza"))
    }

    #[test]
    fn field_comparisons() {
        let doc = order();
        assert!(Filter::field("total", Comparison::Gt, 100).matches(&doc, false));
        assert!(!Filter::field("total", Comparison::Lt, 100).matches(&doc, false));
        assert!(Filter::field("total", Comparison::Gte, 120.0).matches(&doc, false));
        assert!(Filter::eq("shipping.city", "Mwanza").matches(&doc, false));
        assert!(Filter::field("customer", Comparison::Ne, "Juma").matches(&doc, false));
    }

    #[test]
    fn missing_field_is_null() {
        let doc = order();
        assert!(Filter::eq("discount", Value::Null).matches(&doc, false));
        assert!(!Filter::field("discount", Comparison::Gt, 0).matches(&doc, false));
    }

    #[test]
    fn array_fields_match_any_element() {
        let doc = order();
        assert!(Filter::eq("tags", "gift").matches(&doc, false));
        assert!(!Filter::field("tags", Comparison::Ne, "gift").matches(&doc, false));
        assert!(Filter::field("tags", Comparison::Ne, "bulk").matches(&doc, false));
    }

    #[test]
    fn collation_folds_case() {
        let doc = order();
        let filter = Filter::eq("customer", "NEEMA");
        assert!(!filter.matches(&doc, false));
        assert!(filter.matches(&doc, true));
    }

    #[test]
    fn modulo_filter() {
        let doc = Document::new().with("n", 7);
        let odd = Filter::Mod {
            path: "n".into(),
            divisor: 2,
            remainder: 1,
        };
        assert!(odd.matches(&doc, false));
        let by_zero = Filter::Mod {
            path: "n".into(),
            divisor: 0,
            remainder: 0,
        };
        assert!(!by_zero.matches(&doc, false));
    }

    #[test]
    fn boolean_combinations() {
        let doc = order();
        let cheap = Filter::field("total", Comparison::Lt, 50);
        let local = Filter::eq("shipping.city", "Mwanza");
        assert!(Filter::Or(vec![cheap.clone(), local.clone()]).matches(&doc, false));
        assert!(!Filter::And(vec![cheap.clone(), local]).matches(&doc, false));
        assert!(Filter::Not(Box::new(cheap)).matches(&doc, false));
        assert!(!Filter::none().matches(&doc, false));
    }

    #[test]
    fn filter_display() {
        let filter = Filter::And(vec![
            Filter::field("total", Comparison::Gt, 100),
            Filter::eq("customer", "Neema"),
        ]);
        assert_eq!(
            filter.to_string(),
            r#"{$and: [{total: {$gt: 100}}, {customer: {$eq: "Neema"}}]}"#
        );
    }

    #[test]
    fn update_operators() {
        let mut doc = order();
        Update::new()
            .set("status", "shipped")
            .set("shipping.carrier", "DHL")
            .inc("total", 5)
            .inc("views", 1)
            .unset("tags")
            .apply(&mut doc)
            .unwrap();

        assert_eq!(doc.get("status"), Some(&Value::from("shipped")));
        assert_eq!(doc.get_path("shipping.carrier"), Some(&Value::from("DHL")));
        assert_eq!(doc.get("total"), Some(&Value::Integer(125)));
        assert_eq!(doc.get("views"), Some(&Value::Integer(1)));
        assert!(doc.get("tags").is_none());
    }

    #[test]
    fn update_rejects_id_and_bad_inc() {
        let mut doc = order();
        assert!(Update::new().set("_id", "x").apply(&mut doc).is_err());
        assert!(Update::new().inc("customer", 1).apply(&mut doc).is_err());
    }

    #[test]
    fn index_coverage() {
        let index = IndexModel::new("by_customer", vec!["customer".into(), "total".into()]);
        assert!(index.covers(&["customer".into()]));
        assert!(index.covers(&["total".into(), "customer".into()]));
        assert!(!index.covers(&["customer".into(), "status".into()]));
    }

    #[test]
    fn collation_strength() {
        assert!(Collation::case_insensitive("en").folds_case());
        assert!(!Collation::new("en").folds_case());
        assert!(!QueryOptions::default().folds_case());
    }
}
