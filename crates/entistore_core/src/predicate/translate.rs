//! Translation of predicate bodies to store filters.

use super::expr::{ArithOp, CmpOp, Expr, ParamId};
use super::{PredicateError, PredicateResult};
use entistore_client::Filter;
use entistore_codec::Value;

pub(super) fn translate(param: ParamId, body: &Expr) -> PredicateResult<Filter> {
    if let Some(foreign) = body.foreign_param(param) {
        return Err(PredicateError::UnboundParameter { param: foreign });
    }
    to_filter(param, body)
}

fn to_filter(param: ParamId, expr: &Expr) -> PredicateResult<Filter> {
    match expr {
        Expr::Literal(Value::Bool(true)) => Ok(Filter::All),
        Expr::Literal(Value::Bool(false)) => Ok(Filter::none()),
        Expr::Field(..) => {
            let path = path_of(param, expr).ok_or_else(|| PredicateError::untranslatable(expr))?;
            Ok(Filter::eq(path, true))
        }
        Expr::Compare(op, left, right) => compare(param, *op, left, right)
            .ok_or_else(|| PredicateError::untranslatable(expr)),
        Expr::And(left, right) => Ok(Filter::And(flatten(param, left, right, |f| {
            match f {
                Filter::And(items) => Ok(items),
                other => Err(other),
            }
        })?)),
        Expr::Or(left, right) => Ok(Filter::Or(flatten(param, left, right, |f| match f {
            Filter::Or(items) => Ok(items),
            other => Err(other),
        })?)),
        Expr::Not(inner) => Ok(Filter::Not(Box::new(to_filter(param, inner)?))),
        Expr::Param(_) | Expr::Literal(_) | Expr::Arith(..) => {
            Err(PredicateError::untranslatable(expr))
        }
    }
}

/// Translates both sides and splices nested filters of the same connective.
fn flatten(
    param: ParamId,
    left: &Expr,
    right: &Expr,
    split: fn(Filter) -> Result<Vec<Filter>, Filter>,
) -> PredicateResult<Vec<Filter>> {
    let mut out = Vec::new();
    for side in [left, right] {
        match split(to_filter(param, side)?) {
            Ok(items) => out.extend(items),
            Err(single) => out.push(single),
        }
    }
    Ok(out)
}

/// Dotted path of a field chain rooted at the parameter.
fn path_of(param: ParamId, expr: &Expr) -> Option<String> {
    match expr {
        Expr::Field(base, name) => match base.as_ref() {
            Expr::Param(p) if *p == param => Some(name.clone()),
            other => path_of(param, other).map(|prefix| format!("{prefix}.{name}")),
        },
        _ => None,
    }
}

fn literal(expr: &Expr) -> Option<&Value> {
    match expr {
        Expr::Literal(value) => Some(value),
        _ => None,
    }
}

fn compare(param: ParamId, op: CmpOp, left: &Expr, right: &Expr) -> Option<Filter> {
    if let Some(filter) = modulo(param, op, left, right).or_else(|| modulo(param, op, right, left))
    {
        return Some(filter);
    }

    if let (Some(path), Some(value)) = (path_of(param, left), literal(right)) {
        return Some(Filter::field(path, op.comparison(), value.clone()));
    }
    if let (Some(value), Some(path)) = (literal(left), path_of(param, right)) {
        return Some(Filter::field(path, op.comparison().flipped(), value.clone()));
    }
    None
}

/// `field % divisor == remainder` (or `!=`).
fn modulo(param: ParamId, op: CmpOp, arith: &Expr, other: &Expr) -> Option<Filter> {
    let Expr::Arith(ArithOp::Rem, field, divisor) = arith else {
        return None;
    };
    let path = path_of(param, field)?;
    let divisor = literal(divisor)?.as_integer().filter(|d| *d != 0)?;
    let remainder = literal(other)?.as_integer()?;

    let filter = Filter::Mod {
        path,
        divisor,
        remainder,
    };
    match op {
        CmpOp::Eq => Some(filter),
        CmpOp::Ne => Some(Filter::Not(Box::new(filter))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use crate::predicate::{Expr, ParamId, Predicate, PredicateError};
    use entistore_client::{Comparison, Filter};

    type P = Predicate<()>;

    #[test]
    fn field_against_literal() {
        let p = P::new(|x| x.field("age").gte(18));
        assert_eq!(
            p.to_filter().unwrap(),
            Filter::field("age", Comparison::Gte, 18)
        );
    }

    #[test]
    fn literal_on_the_left_flips_the_operator() {
        let p = P::new(|x| Expr::lit(18).lt(x.field("age")));
        assert_eq!(
            p.to_filter().unwrap(),
            Filter::field("age", Comparison::Gt, 18)
        );
    }

    #[test]
    fn nested_paths_are_dotted() {
        let p = P::new(|x| x.field("address").field("city").eq_to("Dodoma"));
        assert_eq!(p.to_filter().unwrap(), Filter::eq("address.city", "Dodoma"));
    }

    #[test]
    fn boolean_field_shorthand() {
        let p = P::new(|x| x.field("active").and(!x.field("banned")));
        assert_eq!(
            p.to_filter().unwrap(),
            Filter::And(vec![
                Filter::eq("active", true),
                Filter::Not(Box::new(Filter::eq("banned", true))),
            ])
        );
    }

    #[test]
    fn modulo_comparisons() {
        let even = P::new(|x| x.field("n").modulo(2).eq_to(0));
        assert_eq!(
            even.to_filter().unwrap(),
            Filter::Mod {
                path: "n".into(),
                divisor: 2,
                remainder: 0
            }
        );

        let odd = P::new(|x| Expr::lit(0).ne_to(x.field("n").modulo(2)));
        assert!(matches!(odd.to_filter().unwrap(), Filter::Not(_)));

        let by_zero = P::new(|x| x.field("n").modulo(0).eq_to(0));
        assert!(by_zero.to_filter().is_err());
    }

    #[test]
    fn connectives_flatten() {
        let p = P::new(|x| {
            x.field("a")
                .eq_to(1)
                .or(x.field("b").eq_to(2))
                .or(x.field("c").eq_to(3).or(x.field("d").eq_to(4)))
        });
        match p.to_filter().unwrap() {
            Filter::Or(items) => assert_eq!(items.len(), 4),
            other => panic!("expected $or, got {other}"),
        }
    }

    #[test]
    fn boolean_literals() {
        assert_eq!(P::new(|_| Expr::from(false)).to_filter().unwrap(), Filter::none());
    }

    #[test]
    fn untranslatable_shapes() {
        let whole = P::new(|x| x.value().gt(3));
        let err = whole.to_filter().unwrap_err();
        assert!(matches!(err, PredicateError::Untranslatable { .. }));

        let field_vs_field = P::new(|x| x.field("a").eq_to(x.field("b")));
        assert!(field_vs_field.to_filter().is_err());

        let arithmetic = P::new(|x| x.field("a").plus(1).gt(3));
        let err = arithmetic.to_filter().unwrap_err();
        assert!(err.to_string().contains("+ 1 > 3"));
    }

    #[test]
    fn foreign_parameter_is_unbound() {
        let stray = ParamId::fresh();
        let p = P::new(|x| x.field("a").eq_to(Expr::Param(stray).field("b")));
        assert_eq!(
            p.to_filter().unwrap_err(),
            PredicateError::UnboundParameter { param: stray }
        );
    }
}
