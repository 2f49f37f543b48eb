//! Typed predicates over entities.
//!
//! A [`Predicate<T>`] is a boolean expression tree with a single parameter
//! standing for the entity being tested. Predicates can be:
//! - evaluated in process ([`Predicate::matches`])
//! - translated to a store filter ([`Predicate::to_filter`])
//! - combined with [`or_else`] / [`and_also`] into one tree under a single
//!   parameter
//!
//! ```
//! use entistore_core::predicate::Predicate;
//!
//! let even: Predicate<i64> = Predicate::new(|x| x.value().modulo(2).eq_to(0));
//! let large: Predicate<i64> = Predicate::new(|x| x.value().gt(5));
//!
//! let either = even.or_else(&large).unwrap();
//! let kept: Vec<i64> = (2..=8).filter(|n| either.matches(n).unwrap()).collect();
//! assert_eq!(kept, vec![2, 4, 6, 7, 8]);
//! ```

mod combine;
mod expr;
mod translate;

pub use combine::{and_also, or_else};
pub use expr::{ArithOp, CmpOp, Expr, ParamId};

use entistore_client::{Filter, ID_FIELD};
use entistore_codec::CodecError;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;
use thiserror::Error;

/// Result type for predicate operations.
pub type PredicateResult<T> = Result<T, PredicateError>;

/// Errors raised while evaluating or translating a predicate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredicateError {
    /// The expression has no equivalent in the store's filter language.
    #[error("expression cannot be translated to a filter: {expr}")]
    Untranslatable {
        /// Display form of the offending sub-expression.
        expr: String,
    },

    /// The expression references a parameter other than the predicate's own.
    #[error("expression references unbound parameter {param}")]
    UnboundParameter {
        /// The foreign parameter.
        param: ParamId,
    },

    /// The tested value could not be serialized.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl PredicateError {
    pub(crate) fn untranslatable(expr: &Expr) -> Self {
        Self::Untranslatable {
            expr: expr.to_string(),
        }
    }
}

/// The parameter of a predicate under construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Var(ParamId);

impl Var {
    /// The parameter itself (the whole entity).
    #[must_use]
    pub fn value(self) -> Expr {
        Expr::Param(self.0)
    }

    /// A stored field of the entity.
    #[must_use]
    pub fn field(self, name: impl Into<String>) -> Expr {
        self.value().field(name)
    }

    /// The entity's `_id`.
    #[must_use]
    pub fn id(self) -> Expr {
        self.field(ID_FIELD)
    }

    /// The parameter id.
    #[must_use]
    pub const fn param(self) -> ParamId {
        self.0
    }
}

impl From<Var> for Expr {
    fn from(var: Var) -> Self {
        var.value()
    }
}

/// A boolean expression over one entity of type `T`.
pub struct Predicate<T> {
    param: ParamId,
    body: Expr,
    _entity: PhantomData<fn(&T) -> bool>,
}

impl<T> Predicate<T> {
    /// Builds a predicate from a closure over a fresh parameter.
    pub fn new<F>(build: F) -> Self
    where
        F: FnOnce(Var) -> Expr,
    {
        let param = ParamId::fresh();
        Self::from_parts(param, build(Var(param)))
    }

    /// Assembles a predicate from a parameter and a body.
    ///
    /// The body should only reference `param`; other references are reported
    /// when the predicate is used.
    #[must_use]
    pub fn from_parts(param: ParamId, body: Expr) -> Self {
        Self {
            param,
            body,
            _entity: PhantomData,
        }
    }

    /// The predicate that holds for every entity.
    #[must_use]
    pub fn always() -> Self {
        Self::new(|_| Expr::from(true))
    }

    /// The predicate's parameter.
    #[must_use]
    pub const fn param(&self) -> ParamId {
        self.param
    }

    /// The predicate's body.
    #[must_use]
    pub const fn body(&self) -> &Expr {
        &self.body
    }

    /// `self || other`, or `None` if either body references a parameter
    /// that cannot be resolved.
    #[must_use]
    pub fn or_else(&self, other: &Self) -> Option<Self> {
        or_else(self, other)
    }

    /// `self && other`, or `None` if either body references a parameter
    /// that cannot be resolved.
    #[must_use]
    pub fn and_also(&self, other: &Self) -> Option<Self> {
        and_also(self, other)
    }

    /// Translates the predicate to a store filter.
    ///
    /// # Errors
    ///
    /// Returns `UnboundParameter` for foreign parameter references and
    /// `Untranslatable` for shapes the filter language cannot express.
    pub fn to_filter(&self) -> PredicateResult<Filter> {
        translate::translate(self.param, &self.body)
    }
}

impl<T: Serialize> Predicate<T> {
    /// Evaluates the predicate against an entity in process.
    ///
    /// # Errors
    ///
    /// Returns `Codec` if the entity cannot be serialized and
    /// `UnboundParameter` for foreign parameter references.
    pub fn matches(&self, entity: &T) -> PredicateResult<bool> {
        let value = entistore_codec::to_value(entity)?;
        self.body.test(self.param, &value)
    }
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        Self::from_parts(self.param, self.body.clone())
    }
}

impl<T> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("param", &self.param)
            .field("body", &self.body)
            .finish()
    }
}

impl<T> fmt::Display for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {}", self.param, self.body)
    }
}
