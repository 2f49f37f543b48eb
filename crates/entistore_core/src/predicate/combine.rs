//! Combining two predicates into one.
//!
//! The right predicate's parameter is rewritten to the left's, then both
//! bodies are joined under the left parameter. The result is an ordinary
//! predicate: it can be evaluated, translated, or combined again.

use super::expr::Expr;
use super::Predicate;

/// `left || right` under a single parameter.
///
/// Returns `None` if either body references a parameter other than its
/// own, since such a reference cannot be rewritten.
#[must_use]
pub fn or_else<T>(left: &Predicate<T>, right: &Predicate<T>) -> Option<Predicate<T>> {
    combine(left, right, Expr::Or)
}

/// `left && right` under a single parameter.
///
/// Returns `None` if either body references a parameter other than its
/// own, since such a reference cannot be rewritten.
#[must_use]
pub fn and_also<T>(left: &Predicate<T>, right: &Predicate<T>) -> Option<Predicate<T>> {
    combine(left, right, Expr::And)
}

fn combine<T>(
    left: &Predicate<T>,
    right: &Predicate<T>,
    join: fn(Box<Expr>, Box<Expr>) -> Expr,
) -> Option<Predicate<T>> {
    if left.body().foreign_param(left.param()).is_some()
        || right.body().foreign_param(right.param()).is_some()
    {
        tracing::trace!(left = %left, right = %right, "predicate parameters cannot be resolved");
        return None;
    }

    let rewritten = right.body().substitute(right.param(), left.param());
    Some(Predicate::from_parts(
        left.param(),
        join(Box::new(left.body().clone()), Box::new(rewritten)),
    ))
}
