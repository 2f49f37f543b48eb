//! Integration tests for entity store operations.

use entistore_client::{ClientError, Collation, Update};
use entistore_core::predicate::Predicate;
use entistore_core::{Entity, EntityStore, StoreConfig, StoreError, StoreResult};
use entistore_testkit::{race, Customer, Reading, TestStore, Ticket};
use std::sync::Arc;
use std::time::Duration;

fn by_email(email: &'static str) -> Predicate<Customer> {
    Predicate::new(move |c| c.field("email").eq_to(email))
}

#[test]
fn put_then_get_round_trips() {
    let store = TestStore::memory();
    let customer = Customer::new("Amani", "amani@example.com")
        .tier(2)
        .tagged("early");
    store.put(&customer).unwrap();

    let loaded = store.get::<Customer>(customer.id()).unwrap();
    assert_eq!(loaded, Some(customer));
}

#[test]
fn every_identity_strategy_round_trips() {
    let store = TestStore::memory();
    let ticket = Ticket::new("printer on fire", 5).assigned_to("neema");
    let reading = Reading::new("boiler", 71);
    store.put(&ticket).unwrap();
    store.put(&reading).unwrap();

    assert_eq!(store.get::<Ticket>(ticket.id()).unwrap(), Some(ticket));
    assert_eq!(store.get::<Reading>(reading.id()).unwrap(), Some(reading));
}

#[test]
fn put_twice_keeps_one_document() {
    let store = TestStore::audited();
    let mut customer = Customer::new("Amani", "amani@example.com");
    store.put(&customer).unwrap();
    customer.tier = 3;
    store.put(&customer).unwrap();
    store.settle();

    assert_eq!(store.count::<Customer>().unwrap(), 1);
    assert_eq!(
        store.get::<Customer>(customer.id()).unwrap().unwrap().tier,
        3
    );
    // The replace is not audited.
    assert_eq!(store.sink.records().len(), 1);
}

#[test]
fn concurrent_first_puts_leave_one_document() {
    let store = TestStore::audited();
    let customer = Customer::new("Amani", "amani@example.com");

    let shared = store.shared();
    let entity = customer.clone();
    let result = race(8, move |_| shared.put(&entity));
    store.settle();

    assert_eq!(result.successes(), 8);
    assert_eq!(store.count::<Customer>().unwrap(), 1);
    assert_eq!(store.sink.records().len(), 1);
}

#[test]
fn put_inserts_again_when_the_racing_document_is_gone() {
    let store = TestStore::audited();
    let customer = Customer::new("Amani", "amani@example.com");
    store.client.collide_inserts(1);

    store.put(&customer).unwrap();
    store.settle();

    assert_eq!(store.get::<Customer>(customer.id()).unwrap(), Some(customer));
    assert_eq!(store.sink.records().len(), 1);
}

#[test]
fn count_follows_puts_and_removes() {
    let store = TestStore::memory();
    let a = Customer::new("Amani", "amani@example.com");
    let b = Customer::new("Baraka", "baraka@example.com");
    store.put(&a).unwrap();
    store.put(&b).unwrap();
    assert_eq!(store.count::<Customer>().unwrap(), 2);

    assert!(store.remove::<Customer>(a.id()).unwrap());
    assert_eq!(store.count::<Customer>().unwrap(), 1);
    assert_eq!(store.get::<Customer>(a.id()).unwrap(), None);

    assert!(store.remove_entity(&b).unwrap());
    assert!(!store.remove_entity(&b).unwrap());
    assert_eq!(store.count::<Customer>().unwrap(), 0);
}

#[test]
fn remove_where_reports_deleted_count() {
    let store = TestStore::memory();
    for tier in [0, 1, 2, 3, 3] {
        store
            .put(&Customer::new("c", format!("c{tier}@example.com")).tier(tier))
            .unwrap();
    }
    let gold = Predicate::<Customer>::new(|c| c.field("tier").gte(3));
    assert_eq!(store.remove_where(&gold, None).unwrap(), 2);
    assert_eq!(store.remove_where(&gold, None).unwrap(), 0);
    assert_eq!(store.count::<Customer>().unwrap(), 3);
}

#[test]
fn put_replacing_swaps_matching_entities() {
    let store = TestStore::audited();
    let old = Customer::new("Amani", "amani@example.com");
    store.put(&old).unwrap();

    let new = Customer::new("Amani K.", "amani@example.com").tier(1);
    store
        .put_replacing(&new, &by_email("amani@example.com"), None)
        .unwrap();

    assert_eq!(store.count::<Customer>().unwrap(), 1);
    assert_eq!(store.get::<Customer>(old.id()).unwrap(), None);
    assert_eq!(store.get::<Customer>(new.id()).unwrap(), Some(new));

    let fresh = Customer::new("Baraka", "baraka@example.com");
    store
        .put_replacing(&fresh, &by_email("baraka@example.com"), None)
        .unwrap();
    store.settle();

    let operations: Vec<String> = store
        .sink
        .envelopes()
        .iter()
        .map(|e| e.operation_type.to_string())
        .collect();
    assert_eq!(operations, vec!["Insert", "Update", "Insert"]);
}

#[test]
fn put_replacing_rejects_surviving_identity() {
    let store = TestStore::memory();
    let customer = Customer::new("Amani", "amani@example.com");
    store.put(&customer).unwrap();

    let err = store
        .put_replacing(&customer, &by_email("nobody@example.com"), None)
        .unwrap_err();
    assert!(matches!(err, StoreError::Client(ref e) if e.is_duplicate_key()));
    assert_eq!(store.count::<Customer>().unwrap(), 1);
}

#[test]
fn update_applies_to_matches() {
    let store = TestStore::memory();
    let a = Customer::new("Amani", "amani@example.com").tier(1);
    let b = Customer::new("Baraka", "baraka@example.com").tier(1);
    let c = Customer::new("Chausiku", "chausiku@example.com").tier(2);
    for customer in [&a, &b, &c] {
        store.put(customer).unwrap();
    }

    let tier_one = Predicate::<Customer>::new(|x| x.field("tier").eq_to(1));
    let modified = store
        .update(&tier_one, &Update::new().set("vip", true), None)
        .unwrap();
    assert_eq!(modified, 2);

    // Already VIP: matched but unchanged.
    let again = store
        .update(&tier_one, &Update::new().set("vip", true), None)
        .unwrap();
    assert_eq!(again, 0);

    assert!(store.get::<Customer>(a.id()).unwrap().unwrap().vip);
    assert!(!store.get::<Customer>(c.id()).unwrap().unwrap().vip);
}

#[test]
fn update_rejects_id_changes() {
    let store = TestStore::memory();
    store.put(&Customer::new("Amani", "amani@example.com")).unwrap();
    let result = store.update(
        &Predicate::<Customer>::always(),
        &Update::new().set("_id", "replaced"),
        None,
    );
    assert!(matches!(result, Err(StoreError::Client(_))));
}

#[test]
fn collation_controls_case_sensitivity() {
    let store = TestStore::memory();
    store.put(&Customer::new("Amani", "amani@example.com")).unwrap();
    store.put(&Customer::new("AMANI", "amani2@example.com")).unwrap();
    store.put(&Customer::new("Baraka", "baraka@example.com")).unwrap();

    let amani = Predicate::<Customer>::new(|c| c.field("name").eq_to("amani"));
    let folded = Collation::case_insensitive("en");

    assert_eq!(store.count_where(&amani, None).unwrap(), 0);
    assert_eq!(store.count_where(&amani, Some(&folded)).unwrap(), 2);
    assert_eq!(store.find_list(&amani, Some(&folded)).unwrap().len(), 2);

    let modified = store
        .update(&amani, &Update::new().inc("tier", 1), Some(&folded))
        .unwrap();
    assert_eq!(modified, 2);
    assert_eq!(store.remove_where(&amani, Some(&folded)).unwrap(), 2);
}

#[test]
fn distinct_unwinds_and_folds() {
    let store = TestStore::memory();
    store
        .put(&Customer::new("a", "a@example.com").tagged("gold").tagged("new"))
        .unwrap();
    store
        .put(&Customer::new("b", "b@example.com").tagged("gold"))
        .unwrap();
    store
        .put(&Customer::new("c", "c@example.com").tagged("GOLD"))
        .unwrap();

    let all = Predicate::<Customer>::always();
    let tags: Vec<String> = store
        .distinct::<Customer, String>("tags", &all, None)
        .unwrap()
        .collect::<StoreResult<_>>()
        .unwrap();
    assert_eq!(tags, vec!["gold", "new", "GOLD"]);

    let folded = Collation::case_insensitive("en");
    let tags: Vec<String> = store
        .distinct::<Customer, String>("tags", &all, Some(&folded))
        .unwrap()
        .collect::<StoreResult<_>>()
        .unwrap();
    assert_eq!(tags.len(), 2);
}

#[test]
fn find_streams_and_releases_cursor() {
    let store = TestStore::memory();
    store.client.set_batch_size(2);
    for value in 0..5 {
        store.put(&Reading::new("boiler", value)).unwrap();
    }

    let mut cursor = store
        .find(&Predicate::<Reading>::always(), None)
        .unwrap();
    assert_eq!(cursor.next().unwrap().unwrap().value, 0);
    assert_eq!(store.client.stats().open_cursors(), 1);
    drop(cursor);
    assert_eq!(store.client.stats().open_cursors(), 0);

    let values: Vec<i64> = store
        .find(&Predicate::<Reading>::always(), None)
        .unwrap()
        .map(|r| r.unwrap().value)
        .collect();
    assert_eq!(values, vec![0, 1, 2, 3, 4]);
    assert_eq!(store.client.stats().open_cursors(), 0);
}

#[test]
fn untranslatable_predicates_fail_before_the_store() {
    let store = TestStore::memory();
    let computed = Predicate::<Customer>::new(|c| c.field("tier").times(2).gt(4));
    assert!(matches!(
        store.find_list(&computed, None),
        Err(StoreError::Predicate(_))
    ));
    assert!(matches!(
        store.remove_where(&computed, None),
        Err(StoreError::Predicate(_))
    ));
}

#[test]
fn expired_entities_disappear() {
    let store = TestStore::memory();
    let stale = Ticket::expired("old");
    let live = Ticket::new("current", 1);
    store.put(&stale).unwrap();
    store.put(&live).unwrap();

    assert_eq!(store.get::<Ticket>(stale.id()).unwrap(), None);
    assert_eq!(store.count::<Ticket>().unwrap(), 1);
}

#[test]
fn drop_collection_empties_and_resets() {
    let store = TestStore::memory();
    store.put(&Customer::new("Amani", "amani@example.com")).unwrap();
    let created = store.client.stats().index_creations();

    store.drop_collection::<Customer>().unwrap();
    assert_eq!(store.count::<Customer>().unwrap(), 0);
    // expires_at, by_email and by_tier are recreated.
    assert_eq!(store.client.stats().index_creations(), created + 3);
}

#[test]
fn ping_reflects_reachability() {
    let store = TestStore::memory();
    assert!(store.ping());

    store.client.set_reachable(false);
    assert!(!store.ping());

    store.client.set_reachable(true);
    assert!(store.ping());
}

#[test]
fn ping_gives_up_after_timeout() {
    let store = TestStore::with_config(
        entistore_testkit::test_config().ping_timeout(Duration::from_millis(25)),
    );
    store.client.set_ping_delay(Duration::from_millis(400));
    assert!(!store.ping());
}

#[test]
fn timed_out_ping_blocks_new_pings_until_it_returns() {
    let store = TestStore::with_config(
        entistore_testkit::test_config().ping_timeout(Duration::from_millis(100)),
    );
    store.client.set_ping_delay(Duration::from_millis(300));
    assert!(!store.ping());
    for _ in 0..5 {
        assert!(!store.ping());
    }
    assert_eq!(store.client.stats().pings(), 1);

    store.client.set_ping_delay(Duration::ZERO);
    std::thread::sleep(Duration::from_millis(600));
    assert!(store.ping());
    assert!(store.ping());
    assert_eq!(store.client.stats().pings(), 3);
}

#[test]
fn unreachable_store_surfaces_client_errors() {
    let store = TestStore::memory();
    store.client.set_reachable(false);
    let err = store.count::<Customer>().unwrap_err();
    assert!(err.is_unreachable());
    assert!(matches!(
        err,
        StoreError::Client(ClientError::Unreachable { .. })
    ));
}

#[test]
fn builder_reports_configuration_errors() {
    let empty = StoreConfig::from_lookup(|_| None).unwrap();
    let result = EntityStore::builder(empty)
        .client(Arc::new(entistore_client::MemoryClient::new()))
        .build();
    assert!(matches!(result, Err(StoreError::Config { .. })));

    let bad_timeout = StoreConfig::from_lookup(|key| {
        (key == "ENTISTORE_PING_TIMEOUT_MS").then(|| "soon".to_string())
    });
    assert!(matches!(bad_timeout, Err(StoreError::Config { .. })));
}
