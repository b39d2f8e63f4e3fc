//! End-to-end live query scenarios against the in-memory database.

use rill_core::{Record, Value};
use rill_live::{
    create_query_array, create_query_array_with, create_query_object_with, create_query_signal,
    create_query_signal_with, QueryOptions, QueryStatus, ReconcileOptions, Source,
};
use rill_memdb::Database;
use rill_reactive::Runtime;
use std::cell::Cell;
use std::rc::Rc;

fn friends_db() -> Database {
    let db = Database::new();
    db.create_table("friends").unwrap();
    db
}

fn friend(name: &str, age: i64) -> Record {
    Record::new().with("name", name).with("age", age)
}

fn strip_id(mut record: Record) -> Record {
    record.remove("id");
    record
}

#[test]
fn test_empty_collection_then_insert() {
    let db = friends_db();
    let rt = Runtime::new();
    let cx = rt.root();
    let query_db = db.clone();
    let friends = create_query_array(&cx, &db, move || {
        query_db.query(|tx| tx.to_vec("friends"))
    });

    assert!(friends.is_empty());
    assert_eq!(friends.status(), QueryStatus::Pending);

    db.settle();
    assert!(friends.is_empty());
    assert_eq!(friends.status(), QueryStatus::Ready);

    db.add("friends", friend("Foo", 10)).unwrap();
    db.settle();
    let rows: Vec<Record> = friends.snapshot().into_iter().map(strip_id).collect();
    assert_eq!(rows, [friend("Foo", 10)]);
}

#[test]
fn test_update_keeps_element_identity() {
    let db = friends_db();
    let rt = Runtime::new();
    let cx = rt.root();
    let query_db = db.clone();
    let friends = create_query_array(&cx, &db, move || {
        query_db.query(|tx| tx.to_vec("friends"))
    });
    let key = db.add("friends", friend("Foo", 10)).unwrap();
    db.settle();
    let before = friends.array().items_untracked()[0].clone();

    db.update("friends", key, Record::new().with("name", "CHANGED"))
        .unwrap();
    db.settle();

    let after = friends.array().items_untracked()[0].clone();
    assert!(before.ptr_eq(&after));
    assert_eq!(strip_id(after.snapshot()), friend("CHANGED", 10));
}

#[test]
fn test_update_leaves_siblings_untouched() {
    let db = friends_db();
    let rt = Runtime::new();
    let cx = rt.root();
    let query_db = db.clone();
    let friends = create_query_array(&cx, &db, move || {
        query_db.query(|tx| tx.to_vec("friends"))
    });
    let foo = db.add("friends", friend("Foo", 10)).unwrap();
    db.add("friends", friend("Bar", 11)).unwrap();
    db.settle();

    let items = friends.array().items_untracked();
    let bar = items[1].clone();
    let bar_reads = Rc::new(Cell::new(0));
    {
        let bar = bar.clone();
        let bar_reads = bar_reads.clone();
        cx.create_effect(move |_| {
            bar.get("name");
            bar.get("age");
            bar_reads.set(bar_reads.get() + 1);
        });
    }
    assert_eq!(bar_reads.get(), 1);

    db.update("friends", foo, Record::new().with("name", "CHANGED"))
        .unwrap();
    db.settle();

    assert_eq!(bar_reads.get(), 1);
    let items = friends.array().items_untracked();
    assert!(items[1].ptr_eq(&bar));
    let rows: Vec<Record> = friends.snapshot().into_iter().map(strip_id).collect();
    assert_eq!(rows, [friend("CHANGED", 10), friend("Bar", 11)]);
}

#[test]
fn test_parameterized_query_resubscribes() {
    let db = friends_db();
    db.bulk_add(
        "friends",
        vec![friend("Foo", 10), friend("Bar", 11), friend("Baz", 11)],
    )
    .unwrap();
    let rt = Runtime::new();
    let cx = rt.root();
    let age = cx.create_signal(10i64);

    let query_db = db.clone();
    let friends = create_query_array_with(
        &cx,
        &db,
        QueryOptions::new(age.clone()),
        move |age: &i64| {
            let age = *age;
            query_db.query(move |tx| tx.where_eq("friends", "age", age))
        },
    );
    db.settle();
    assert_eq!(friends.len(), 1);
    let array = friends.array().clone();

    age.set(11);
    // The old subscription is gone before the new one delivers
    assert_eq!(db.live_query_count(), 1);
    assert_eq!(friends.generation(), 2);

    db.settle();
    let names: Vec<Value> = friends
        .snapshot()
        .iter()
        .filter_map(|r| r.get("name").cloned())
        .collect();
    assert_eq!(names, [Value::from("Bar"), Value::from("Baz")]);
    assert!(friends.array().ptr_eq(&array));
}

#[test]
fn test_querier_signal_reads_resubscribe() {
    let db = friends_db();
    let rt = Runtime::new();
    let cx = rt.root();
    let table = cx.create_signal(String::from("friends"));
    db.create_table("enemies").unwrap();
    db.add("enemies", friend("Boo", 99)).unwrap();

    let query_db = db.clone();
    let read_table = table.clone();
    let rows = create_query_array(&cx, &db, move || {
        let name = read_table.get();
        query_db.query(move |tx| tx.to_vec(&name))
    });
    db.settle();
    assert!(rows.is_empty());

    table.set(String::from("enemies"));
    db.settle();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows.generation(), 2);
}

#[test]
fn test_count_signal() {
    let db = friends_db();
    let rt = Runtime::new();
    let cx = rt.root();
    let query_db = db.clone();
    let count = create_query_signal(&cx, &db, move || {
        query_db.query(|tx| tx.count("friends"))
    });

    assert_eq!(count.get_untracked(), None);
    db.settle();
    assert_eq!(count.get_untracked(), Some(0));

    db.add("friends", friend("Foo", 10)).unwrap();
    db.settle();
    assert_eq!(count.get_untracked(), Some(1));
}

#[test]
fn test_count_signal_parameterized() {
    let db = friends_db();
    db.bulk_add("friends", vec![friend("Foo", 10), friend("Bar", 20)])
        .unwrap();
    let rt = Runtime::new();
    let cx = rt.root();
    let min_age = cx.create_signal(5i64);

    let query_db = db.clone();
    let count = create_query_signal_with(&cx, &db, min_age.clone(), move |min: &i64| {
        let min = *min;
        query_db.query(move |tx| Ok(tx.where_above("friends", "age", min)?.len()))
    });
    db.settle();
    assert_eq!(count.get_untracked(), Some(2));

    min_age.set(15);
    assert_eq!(count.get_untracked(), None);
    assert_eq!(count.generation(), 2);
    db.settle();
    assert_eq!(count.get_untracked(), Some(1));
    assert_eq!(db.live_query_count(), 1);
}

#[test]
fn test_count_signal_drives_effects() {
    let db = friends_db();
    let rt = Runtime::new();
    let cx = rt.root();
    let query_db = db.clone();
    let count = Rc::new(create_query_signal(&cx, &db, move || {
        query_db.query(|tx| tx.count("friends"))
    }));

    let seen = Rc::new(Cell::new(None));
    {
        let count = count.clone();
        let seen = seen.clone();
        cx.create_effect(move |_| seen.set(count.get()));
    }
    db.settle();
    assert_eq!(seen.get(), Some(0));

    db.add("friends", friend("Foo", 10)).unwrap();
    db.settle();
    assert_eq!(seen.get(), Some(1));
}

#[test]
fn test_object_query_follows_key() {
    let db = friends_db();
    let foo = db.add("friends", friend("Foo", 10)).unwrap();
    let bar = db.add("friends", friend("Bar", 11)).unwrap();
    let rt = Runtime::new();
    let cx = rt.root();
    let selected = cx.create_signal(foo);

    let query_db = db.clone();
    let current = create_query_object_with(&cx, &db, selected.clone(), move |key: &i64| {
        let key = *key;
        query_db.query(move |tx| tx.get("friends", key))
    });
    db.settle();
    let object = current.object().clone();
    assert_eq!(current.snapshot().get_str("name"), Some("Foo"));

    selected.set(bar);
    db.settle();
    assert!(current.object().ptr_eq(&object));
    assert_eq!(current.snapshot().get_str("name"), Some("Bar"));

    db.delete("friends", bar).unwrap();
    db.settle();
    assert!(current.snapshot().is_empty());
}

#[test]
fn test_read_failure_reported_then_recovered() {
    let db = Database::new();
    let rt = Runtime::new();
    let cx = rt.root();
    let query_db = db.clone();
    let friends = create_query_array(&cx, &db, move || {
        query_db.query(|tx| tx.to_vec("friends"))
    });

    db.settle();
    assert!(friends.status().error().is_some());
    assert!(friends.is_empty());

    db.create_table("friends").unwrap();
    db.add("friends", friend("Foo", 10)).unwrap();
    db.settle();
    assert_eq!(friends.status(), QueryStatus::Ready);
    assert_eq!(friends.len(), 1);
}

#[test]
fn test_scope_disposal_unsubscribes() {
    let db = friends_db();
    let rt = Runtime::new();
    let cx = rt.root();
    let query_db = db.clone();
    let friends = create_query_array(&cx, &db, move || {
        query_db.query(|tx| tx.to_vec("friends"))
    });
    db.add("friends", friend("Foo", 10)).unwrap();
    db.settle();
    assert_eq!(db.live_query_count(), 1);

    cx.dispose();
    assert_eq!(db.live_query_count(), 0);

    db.add("friends", friend("Bar", 11)).unwrap();
    db.settle();
    assert_eq!(friends.snapshot().len(), 1);
}

#[test]
fn test_custom_key_reconciliation() {
    let db = friends_db();
    let rt = Runtime::new();
    let cx = rt.root();
    let query_db = db.clone();
    let friends = create_query_array_with(
        &cx,
        &db,
        QueryOptions::default().with_reconcile(ReconcileOptions::keyed("name")),
        move |_: &()| query_db.query(|tx| tx.to_vec("friends")),
    );
    let key = db.add("friends", friend("Foo", 10)).unwrap();
    db.settle();
    let foo = friends.array().items_untracked()[0].clone();

    // Same name under a new primary key is still the same element
    db.delete("friends", key).unwrap();
    db.add("friends", friend("Foo", 12)).unwrap();
    db.settle();
    assert!(friends.array().items_untracked()[0].ptr_eq(&foo));
    assert_eq!(foo.get_untracked("age"), Some(Value::Int64(12)));
}

#[test]
fn test_batched_source_changes_open_one_subscription() {
    let db = friends_db();
    let rt = Runtime::new();
    let cx = rt.root();
    let min = cx.create_signal(0i64);
    let max = cx.create_signal(100i64);
    let (min2, max2) = (min.clone(), max.clone());

    let query_db = db.clone();
    let friends = create_query_array_with(
        &cx,
        &db,
        QueryOptions::new(Source::accessor(move || (min2.get(), max2.get()))),
        move |range: &(i64, i64)| {
            let (lo, hi) = *range;
            query_db.query(move |tx| {
                tx.filter("friends", |r| {
                    r.get_i64("age").map_or(false, |age| age >= lo && age <= hi)
                })
            })
        },
    );

    rt.batch(|| {
        min.set(10);
        max.set(20);
    });
    assert_eq!(friends.generation(), 2);
    assert_eq!(db.live_query_count(), 1);
}
