//! Property tests for predicate combination and translation.

use entistore_core::predicate::{and_also, or_else, Predicate};
use entistore_testkit::{customers_strategy, int_condition_strategy, int_domain_strategy, TestStore};
use entistore_testkit::Customer;
use proptest::prelude::*;

proptest! {
    #[test]
    fn or_else_is_union(
        left in int_condition_strategy(),
        right in int_condition_strategy(),
        domain in int_domain_strategy(),
    ) {
        let combined = or_else(&left.predicate(), &right.predicate()).unwrap();
        for n in domain {
            prop_assert_eq!(combined.matches(&n).unwrap(), left.holds(n) || right.holds(n));
        }
    }

    #[test]
    fn and_also_is_intersection(
        left in int_condition_strategy(),
        right in int_condition_strategy(),
        domain in int_domain_strategy(),
    ) {
        let combined = and_also(&left.predicate(), &right.predicate()).unwrap();
        for n in domain {
            prop_assert_eq!(combined.matches(&n).unwrap(), left.holds(n) && right.holds(n));
        }
    }

    #[test]
    fn combined_predicate_uses_left_parameter(
        left in int_condition_strategy(),
        right in int_condition_strategy(),
    ) {
        let l = left.predicate();
        let combined = l.or_else(&right.predicate()).unwrap();
        prop_assert_eq!(combined.param(), l.param());
        prop_assert!(combined.body().foreign_param(l.param()).is_none());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn store_filters_agree_with_in_process_evaluation(
        customers in customers_strategy(12),
        left in int_condition_strategy(),
        right in int_condition_strategy(),
    ) {
        let store = TestStore::memory();
        for customer in &customers {
            store.put(customer).unwrap();
        }

        let either = left.tier_predicate().or_else(&right.tier_predicate()).unwrap();
        let both = left.tier_predicate().and_also(&right.tier_predicate()).unwrap();

        let expected_either = customers
            .iter()
            .filter(|c| left.holds(c.tier) || right.holds(c.tier))
            .count() as u64;
        let expected_both = customers
            .iter()
            .filter(|c| left.holds(c.tier) && right.holds(c.tier))
            .count() as u64;

        prop_assert_eq!(store.count_where(&either, None).unwrap(), expected_either);
        prop_assert_eq!(store.count_where(&both, None).unwrap(), expected_both);

        let in_process = customers
            .iter()
            .filter(|c| either.matches(c).unwrap())
            .count() as u64;
        prop_assert_eq!(in_process, expected_either);
    }
}

#[test]
fn foreign_parameter_blocks_combination() {
    let outer = Predicate::<i64>::new(|x| x.value().gt(1));
    let inner = Predicate::<i64>::new(|y| y.value().lt(10));
    // A body that refers to another predicate's parameter.
    let stray = Predicate::<i64>::from_parts(inner.param(), outer.body().clone());

    assert!(or_else(&inner, &stray).is_none());
    assert!(and_also(&stray, &inner).is_none());
}

#[test]
fn combined_predicates_translate_to_flat_filters() {
    let vip = Predicate::<Customer>::new(|c| c.field("vip"));
    let gold = Predicate::<Customer>::new(|c| c.field("tier").gte(3));
    let silver = Predicate::<Customer>::new(|c| c.field("tier").eq_to(2));

    let combined = vip
        .and_also(&gold.or_else(&silver).unwrap())
        .unwrap();
    let filter = combined.to_filter().unwrap();
    let text = filter.to_string();
    assert!(text.contains("vip"));
    assert!(text.contains("tier"));
}
