//! Boolean expression tree over one entity parameter.

use super::{PredicateError, PredicateResult};
use entistore_client::Comparison;
use entistore_codec::Value;
use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};

/// Identity of a predicate parameter.
///
/// Every predicate built with `Predicate::new` gets a process-unique id, so
/// two independently written predicates never share a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParamId(u32);

impl ParamId {
    /// Allocates a new, process-unique parameter id.
    #[must_use]
    pub fn fresh() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(1);
        Self(NEXT.fetch_add(1, AtomicOrdering::Relaxed))
    }

    /// The numeric id.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    #[cfg(test)]
    pub(crate) const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
}

impl CmpOp {
    /// Source-like symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Gt => ">",
            CmpOp::Gte => ">=",
            CmpOp::Lt => "<",
            CmpOp::Lte => "<=",
        }
    }

    /// The equivalent filter comparison.
    #[must_use]
    pub const fn comparison(self) -> Comparison {
        match self {
            CmpOp::Eq => Comparison::Eq,
            CmpOp::Ne => Comparison::Ne,
            CmpOp::Gt => Comparison::Gt,
            CmpOp::Gte => Comparison::Gte,
            CmpOp::Lt => Comparison::Lt,
            CmpOp::Lte => Comparison::Lte,
        }
    }

    fn holds(self, ordering: Option<Ordering>) -> bool {
        match (self, ordering) {
            (CmpOp::Ne, ord) => ord != Some(Ordering::Equal),
            (_, None) => false,
            (CmpOp::Eq, Some(ord)) => ord.is_eq(),
            (CmpOp::Gt, Some(ord)) => ord.is_gt(),
            (CmpOp::Gte, Some(ord)) => ord.is_ge(),
            (CmpOp::Lt, Some(ord)) => ord.is_lt(),
            (CmpOp::Lte, Some(ord)) => ord.is_le(),
        }
    }
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `%`
    Rem,
}

impl ArithOp {
    /// Source-like symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Rem => "%",
        }
    }

    fn apply(self, left: &Value, right: &Value) -> Value {
        if let (Value::Integer(a), Value::Integer(b)) = (left, right) {
            let result = match self {
                ArithOp::Add => a.checked_add(*b),
                ArithOp::Sub => a.checked_sub(*b),
                ArithOp::Mul => a.checked_mul(*b),
                ArithOp::Rem => a.checked_rem(*b),
            };
            return result.map_or(Value::Null, Value::Integer);
        }
        match (left.as_f64(), right.as_f64(), self) {
            (Some(a), Some(b), ArithOp::Add) => Value::Float(a + b),
            (Some(a), Some(b), ArithOp::Sub) => Value::Float(a - b),
            (Some(a), Some(b), ArithOp::Mul) => Value::Float(a * b),
            (Some(a), Some(b), ArithOp::Rem) if b != 0.0 => Value::Float(a % b),
            _ => Value::Null,
        }
    }
}

/// A node of a predicate body.
///
/// Build trees with the combinator methods rather than by hand:
///
/// ```
/// use entistore_core::predicate::{Expr, Predicate};
///
/// let cheap: Predicate<()> = Predicate::new(|x| x.field("total").lt(100));
/// assert!(matches!(cheap.body(), Expr::Compare(..)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Reference to a predicate parameter.
    Param(ParamId),
    /// Member access on a document-valued expression.
    Field(Box<Expr>, String),
    /// Constant.
    Literal(Value),
    /// Comparison of two expressions.
    Compare(CmpOp, Box<Expr>, Box<Expr>),
    /// Arithmetic on two expressions.
    Arith(ArithOp, Box<Expr>, Box<Expr>),
    /// Short-circuit conjunction.
    And(Box<Expr>, Box<Expr>),
    /// Short-circuit disjunction.
    Or(Box<Expr>, Box<Expr>),
    /// Negation.
    Not(Box<Expr>),
}

impl Expr {
    /// A constant.
    pub fn lit(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    /// Member access: `self.name`.
    #[must_use]
    pub fn field(self, name: impl Into<String>) -> Self {
        Expr::Field(Box::new(self), name.into())
    }

    fn compare(self, op: CmpOp, other: impl Into<Expr>) -> Self {
        Expr::Compare(op, Box::new(self), Box::new(other.into()))
    }

    fn arith(self, op: ArithOp, other: impl Into<Expr>) -> Self {
        Expr::Arith(op, Box::new(self), Box::new(other.into()))
    }

    /// `self == other`
    #[must_use]
    pub fn eq_to(self, other: impl Into<Expr>) -> Self {
        self.compare(CmpOp::Eq, other)
    }

    /// `self != other`
    #[must_use]
    pub fn ne_to(self, other: impl Into<Expr>) -> Self {
        self.compare(CmpOp::Ne, other)
    }

    /// `self > other`
    #[must_use]
    pub fn gt(self, other: impl Into<Expr>) -> Self {
        self.compare(CmpOp::Gt, other)
    }

    /// `self >= other`
    #[must_use]
    pub fn gte(self, other: impl Into<Expr>) -> Self {
        self.compare(CmpOp::Gte, other)
    }

    /// `self < other`
    #[must_use]
    pub fn lt(self, other: impl Into<Expr>) -> Self {
        self.compare(CmpOp::Lt, other)
    }

    /// `self <= other`
    #[must_use]
    pub fn lte(self, other: impl Into<Expr>) -> Self {
        self.compare(CmpOp::Lte, other)
    }

    /// `self + other`
    #[must_use]
    pub fn plus(self, other: impl Into<Expr>) -> Self {
        self.arith(ArithOp::Add, other)
    }

    /// `self - other`
    #[must_use]
    pub fn minus(self, other: impl Into<Expr>) -> Self {
        self.arith(ArithOp::Sub, other)
    }

    /// `self * other`
    #[must_use]
    pub fn times(self, other: impl Into<Expr>) -> Self {
        self.arith(ArithOp::Mul, other)
    }

    /// `self % other`
    #[must_use]
    pub fn modulo(self, other: impl Into<Expr>) -> Self {
        self.arith(ArithOp::Rem, other)
    }

    /// `self && other`
    #[must_use]
    pub fn and(self, other: impl Into<Expr>) -> Self {
        Expr::And(Box::new(self), Box::new(other.into()))
    }

    /// `self || other`
    #[must_use]
    pub fn or(self, other: impl Into<Expr>) -> Self {
        Expr::Or(Box::new(self), Box::new(other.into()))
    }

    /// `!self`
    #[must_use]
    pub fn negate(self) -> Self {
        Expr::Not(Box::new(self))
    }

    /// Replaces every reference to `from` with a reference to `to`.
    #[must_use]
    pub fn substitute(&self, from: ParamId, to: ParamId) -> Self {
        let sub = |e: &Expr| Box::new(e.substitute(from, to));
        match self {
            Expr::Param(p) if *p == from => Expr::Param(to),
            Expr::Param(_) | Expr::Literal(_) => self.clone(),
            Expr::Field(base, name) => Expr::Field(sub(base), name.clone()),
            Expr::Compare(op, l, r) => Expr::Compare(*op, sub(l), sub(r)),
            Expr::Arith(op, l, r) => Expr::Arith(*op, sub(l), sub(r)),
            Expr::And(l, r) => Expr::And(sub(l), sub(r)),
            Expr::Or(l, r) => Expr::Or(sub(l), sub(r)),
            Expr::Not(inner) => Expr::Not(sub(inner)),
        }
    }

    /// Returns the first parameter referenced that is not `param`.
    #[must_use]
    pub fn foreign_param(&self, param: ParamId) -> Option<ParamId> {
        match self {
            Expr::Param(p) => (*p != param).then_some(*p),
            Expr::Literal(_) => None,
            Expr::Field(base, _) | Expr::Not(base) => base.foreign_param(param),
            Expr::Compare(_, l, r)
            | Expr::Arith(_, l, r)
            | Expr::And(l, r)
            | Expr::Or(l, r) => l.foreign_param(param).or_else(|| r.foreign_param(param)),
        }
    }

    /// Evaluates the expression with `param` bound to `value`.
    ///
    /// Missing fields evaluate to `null`, failed arithmetic (overflow,
    /// division by zero, non-numbers) to `null`. Comparisons against an
    /// array operand hold if any element satisfies them.
    ///
    /// # Errors
    ///
    /// Returns `UnboundParameter` if the expression references any other
    /// parameter.
    pub fn eval(&self, param: ParamId, value: &Value) -> PredicateResult<Value> {
        Ok(match self {
            Expr::Param(p) if *p == param => value.clone(),
            Expr::Param(p) => return Err(PredicateError::UnboundParameter { param: *p }),
            Expr::Literal(v) => v.clone(),
            Expr::Field(base, name) => match base.eval(param, value)? {
                Value::Document(doc) => doc.get(name).cloned().unwrap_or(Value::Null),
                _ => Value::Null,
            },
            Expr::Compare(op, l, r) => {
                let left = l.eval(param, value)?;
                let right = r.eval(param, value)?;
                Value::Bool(compare_values(*op, &left, &right))
            }
            Expr::Arith(op, l, r) => op.apply(&l.eval(param, value)?, &r.eval(param, value)?),
            Expr::And(l, r) => {
                Value::Bool(l.test(param, value)? && r.test(param, value)?)
            }
            Expr::Or(l, r) => Value::Bool(l.test(param, value)? || r.test(param, value)?),
            Expr::Not(inner) => Value::Bool(!inner.test(param, value)?),
        })
    }

    /// Evaluates the expression as a condition: only `true` holds.
    ///
    /// # Errors
    ///
    /// Returns `UnboundParameter` if the expression references any other
    /// parameter.
    pub fn test(&self, param: ParamId, value: &Value) -> PredicateResult<bool> {
        Ok(matches!(self.eval(param, value)?, Value::Bool(true)))
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Or(..) => 1,
            Expr::And(..) => 2,
            Expr::Compare(..) => 3,
            Expr::Arith(ArithOp::Add | ArithOp::Sub, ..) => 4,
            Expr::Arith(..) => 5,
            Expr::Not(_) => 6,
            Expr::Param(_) | Expr::Field(..) | Expr::Literal(_) => 7,
        }
    }
}

fn compare_values(op: CmpOp, left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Array(items), operand) if !matches!(operand, Value::Array(_)) => {
            if op == CmpOp::Ne {
                !items.iter().any(|item| item.matches(operand, false))
            } else {
                items
                    .iter()
                    .any(|item| op.holds(item.compare(operand, false)))
            }
        }
        (left, right) => op.holds(left.compare(right, false)),
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let child = |f: &mut fmt::Formatter<'_>, e: &Expr, min: u8| -> fmt::Result {
            if e.precedence() < min {
                write!(f, "({e})")
            } else {
                write!(f, "{e}")
            }
        };

        match self {
            Expr::Param(p) => write!(f, "{p}"),
            Expr::Literal(v) => write!(f, "{v}"),
            Expr::Field(base, name) => {
                child(f, base, 7)?;
                write!(f, ".{name}")
            }
            Expr::Compare(op, l, r) => {
                child(f, l, 4)?;
                write!(f, " {} ", op.symbol())?;
                child(f, r, 4)
            }
            Expr::Arith(op, l, r) => {
                let level = self.precedence();
                child(f, l, level)?;
                write!(f, " {} ", op.symbol())?;
                child(f, r, level + 1)
            }
            Expr::And(l, r) => {
                child(f, l, 2)?;
                f.write_str(" && ")?;
                child(f, r, 3)
            }
            Expr::Or(l, r) => {
                child(f, l, 1)?;
                f.write_str(" || ")?;
                child(f, r, 2)
            }
            Expr::Not(inner) => {
                f.write_str("!")?;
                child(f, inner, 6)
            }
        }
    }
}

impl std::ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        self.negate()
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Expr::Literal(value)
    }
}

macro_rules! literal_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Expr {
                fn from(value: $ty) -> Self {
                    Expr::Literal(Value::from(value))
                }
            }
        )*
    };
}

literal_from!(bool, i64, i32, u32, f64, &str, String);
