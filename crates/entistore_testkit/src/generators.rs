//! Property-based test generators using proptest.
//!
//! Conditions are generated as plain data that knows both how to build a
//! [`Predicate`] and how to answer the same question directly, so a
//! property can compare the two.

use crate::entities::Customer;
use entistore_core::predicate::{Expr, Predicate, Var};
use proptest::prelude::*;

/// A single comparison over an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntCondition {
    /// `x > n`
    Gt(i64),
    /// `x <= n`
    Lte(i64),
    /// `x == n`
    Eq(i64),
    /// `x != n`
    Ne(i64),
    /// `x % divisor == remainder`
    Mod {
        /// Non-zero divisor.
        divisor: i64,
        /// Expected remainder.
        remainder: i64,
    },
}

impl IntCondition {
    /// Applies the condition to an expression.
    pub fn apply(self, subject: Expr) -> Expr {
        match self {
            IntCondition::Gt(n) => subject.gt(n),
            IntCondition::Lte(n) => subject.lte(n),
            IntCondition::Eq(n) => subject.eq_to(n),
            IntCondition::Ne(n) => subject.ne_to(n),
            IntCondition::Mod { divisor, remainder } => {
                subject.modulo(divisor).eq_to(remainder)
            }
        }
    }

    /// The condition as a predicate over integers.
    pub fn predicate(self) -> Predicate<i64> {
        Predicate::new(|x: Var| self.apply(x.value()))
    }

    /// The condition over a customer's tier.
    pub fn tier_predicate(self) -> Predicate<Customer> {
        Predicate::new(|c: Var| self.apply(c.field("tier")))
    }

    /// Evaluates the condition directly.
    pub fn holds(self, n: i64) -> bool {
        match self {
            IntCondition::Gt(m) => n > m,
            IntCondition::Lte(m) => n <= m,
            IntCondition::Eq(m) => n == m,
            IntCondition::Ne(m) => n != m,
            IntCondition::Mod { divisor, remainder } => n % divisor == remainder,
        }
    }
}

/// Strategy for integer conditions with small operands.
pub fn int_condition_strategy() -> impl Strategy<Value = IntCondition> {
    prop_oneof![
        (-20i64..20).prop_map(IntCondition::Gt),
        (-20i64..20).prop_map(IntCondition::Lte),
        (-20i64..20).prop_map(IntCondition::Eq),
        (-20i64..20).prop_map(IntCondition::Ne),
        (1i64..6)
            .prop_flat_map(|divisor| (Just(divisor), 0..divisor))
            .prop_map(|(divisor, remainder)| IntCondition::Mod { divisor, remainder }),
    ]
}

/// Strategy for a small set of integers to filter.
pub fn int_domain_strategy() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(-30i64..30, 0..40)
}

/// Strategy for customer names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-z]{2,9}").expect("invalid regex")
}

/// Strategy for customers with tiers in `0..8`.
pub fn customer_strategy() -> impl Strategy<Value = Customer> {
    (name_strategy(), 0i64..8, any::<bool>()).prop_map(|(name, tier, vip)| {
        let email = format!("{}@example.com", name.to_lowercase());
        let customer = Customer::new(name, email).tier(tier);
        if vip {
            customer.vip()
        } else {
            customer
        }
    })
}

/// Strategy for a batch of customers.
pub fn customers_strategy(max: usize) -> impl Strategy<Value = Vec<Customer>> {
    prop::collection::vec(customer_strategy(), 0..max)
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn condition_predicate_agrees_with_holds(
            condition in int_condition_strategy(),
            n in -30i64..30,
        ) {
            prop_assert_eq!(condition.predicate().matches(&n).unwrap(), condition.holds(n));
        }

        #[test]
        fn tier_predicates_translate(condition in int_condition_strategy()) {
            prop_assert!(condition.tier_predicate().to_filter().is_ok());
        }

        #[test]
        fn customers_have_valid_tiers(customer in customer_strategy()) {
            prop_assert!((0..8).contains(&customer.tier));
            prop_assert!(customer.email.ends_with("@example.com"));
        }
    }
}
