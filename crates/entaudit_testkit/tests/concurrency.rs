//! Isolation between audit contexts and sharing one listener across threads.

use entaudit_testkit::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

fn billing_listener() -> AuditListener {
    AuditListener::new(AuditConfig::default(), Arc::new(billing_registry()))
        .with_clock(Arc::new(FixedClock::new(epoch())))
}

#[test]
fn interleaved_contexts_keep_separate_revisions_and_change_sets() {
    let listener = billing_listener();
    let mut conn = MemoryConnection::new();
    let mut uow = MemoryUnitOfWork::new();
    let customer = uow.manage_with_identifier(
        CUSTOMER,
        Identifier::single("id", 7i64),
        customer_data("Acme"),
    );
    let key = Identifier::single("id", 7i64);

    let mut first = listener.begin_transaction();
    let mut second = listener.begin_transaction();
    assert_ne!(first.id(), second.id());

    listener
        .pre_update(
            &mut first,
            &uow,
            &customer,
            ChangeRecord::new().with_change("name", "Acme", "Acme Ltd"),
        )
        .unwrap();
    assert!(first.change_sets().lookup(CUSTOMER, &key).is_some());
    assert!(second.change_sets().lookup(CUSTOMER, &key).is_none());

    let second_rev = listener
        .post_update(&mut second, &mut conn, &uow, &customer)
        .unwrap()
        .unwrap();
    let first_rev = listener
        .post_update(&mut first, &mut conn, &uow, &customer)
        .unwrap()
        .unwrap();
    let first_again = listener
        .post_update(&mut first, &mut conn, &uow, &customer)
        .unwrap()
        .unwrap();

    assert_ne!(first_rev, second_rev);
    assert_eq!(first_rev, first_again);
    assert_eq!(conn.row_count("revisions"), 2);

    let rows = conn.rows("customer_audit");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].get("rev"), Some(Value::Integer(second_rev.as_i64())));
    assert_eq!(rows[0].get("diff"), Some(Value::Null));
    assert_eq!(rows[1].get("rev"), Some(Value::Integer(first_rev.as_i64())));
    let diff = decode_diff(rows[1].get("diff").unwrap().as_text().unwrap()).unwrap();
    assert_eq!(diff.get("name"), Some(&(DiffValue::from("Acme"), DiffValue::from("Acme Ltd"))));

    assert_eq!(first.commit().unwrap().updates, 2);
    assert_eq!(second.commit().unwrap().updates, 1);
}

#[test]
fn shared_listener_builds_one_statement_per_type() {
    const THREADS: usize = 8;

    let listener = Arc::new(billing_listener());
    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let listener = Arc::clone(&listener);
            thread::spawn(move || {
                let mut conn = MemoryConnection::new();
                let mut uow = MemoryUnitOfWork::new();
                let customer = uow.manage_with_identifier(
                    CUSTOMER,
                    Identifier::single("id", i as i64 + 1),
                    customer_data("Acme"),
                );

                let mut tx = listener.begin_transaction();
                let revision = listener
                    .post_persist(&mut tx, &mut conn, &uow, &customer)
                    .unwrap();
                assert!(revision.is_some());
                tx.commit().unwrap();

                let shadow_sql = conn
                    .statements()
                    .iter()
                    .map(|s| s.sql.clone())
                    .find(|sql| sql.starts_with("INSERT INTO customer_audit "))
                    .unwrap();
                (tx.id(), shadow_sql)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let txids: HashSet<u64> = results.iter().map(|(id, _)| id.sequence()).collect();
    assert_eq!(txids.len(), THREADS);

    let cached = listener.statements().get(Platform::Sqlite, CUSTOMER).unwrap();
    for (_, sql) in &results {
        assert_eq!(sql, cached.sql());
    }
    assert_eq!(listener.statements().len(), 1);
}
