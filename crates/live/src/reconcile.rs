//! Structural merge of snapshots into reactive containers.
//!
//! Containers are never replaced. A collection snapshot is matched against the
//! existing elements by key; matched elements are mutated in place writing only
//! the fields that differ, so observers of untouched fields are not notified
//! and external references to elements stay valid. The resulting element order
//! is exactly the snapshot order.
//!
//! Elements with no usable key value (missing or null key field, or no key
//! configured) are matched by position. With `merge` they are updated in
//! place; without it they survive only if deep-equal to the incoming element.

use crate::options::ReconcileOptions;
use crate::report::ReconcileReport;
use alloc::vec;
use alloc::vec::Vec;
use hashbrown::HashMap;
use rill_core::{Record, Value};
use rill_reactive::{StoreArray, StoreObject};

/// A container that snapshots can be merged into.
///
/// The snapshot type fixes the container's shape: collection containers only
/// accept collections, object containers only objects.
pub trait Reconcile {
    /// The whole-value snapshot this container accepts.
    type Snapshot: 'static;

    /// Merges `snapshot` into the container in one reactive batch.
    fn reconcile(&self, snapshot: Self::Snapshot, options: &ReconcileOptions) -> ReconcileReport;
}

impl Reconcile for StoreArray {
    type Snapshot = Vec<Record>;

    fn reconcile(&self, snapshot: Vec<Record>, options: &ReconcileOptions) -> ReconcileReport {
        self.runtime()
            .batch(|| reconcile_array(self, snapshot, options))
    }
}

impl Reconcile for StoreObject {
    /// `None` clears the object.
    type Snapshot = Option<Record>;

    fn reconcile(&self, snapshot: Option<Record>, _options: &ReconcileOptions) -> ReconcileReport {
        self.runtime().batch(|| {
            let written = merge_fields(self, snapshot.unwrap_or_default());
            ReconcileReport {
                updated: usize::from(written > 0),
                fields_written: written,
                ..ReconcileReport::default()
            }
        })
    }
}

/// Makes `object` hold exactly the fields of `record`, writing only what
/// differs. Returns the number of fields written or removed.
pub(crate) fn merge_fields(object: &StoreObject, record: Record) -> usize {
    let mut written = 0;
    for name in object.field_names_untracked() {
        if !record.contains(&name) && object.remove(&name) {
            written += 1;
        }
    }
    for (field, value) in record {
        if object.set(&field, value) {
            written += 1;
        }
    }
    written
}

fn key_value<'a>(record: &'a Record, key: Option<&str>) -> Option<&'a Value> {
    key.and_then(|key| record.get(key)).filter(|v| !v.is_null())
}

fn has_key(object: &StoreObject, key: Option<&str>) -> bool {
    match key {
        Some(key) => object.get_untracked(key).map_or(false, |v| !v.is_null()),
        None => false,
    }
}

/// Reconciles a collection snapshot into `array`. See the module docs.
pub(crate) fn reconcile_array(
    array: &StoreArray,
    next: Vec<Record>,
    options: &ReconcileOptions,
) -> ReconcileReport {
    let rt = array.runtime().clone();
    let previous = array.items_untracked();
    let key = options.key();
    let mut claimed = vec![false; previous.len()];

    // First occurrence of a key wins
    let mut by_key: HashMap<Value, usize> = HashMap::new();
    if let Some(key) = key {
        for (index, object) in previous.iter().enumerate() {
            if let Some(value) = object.get_untracked(key).filter(|v| !v.is_null()) {
                by_key.entry(value).or_insert(index);
            }
        }
    }

    let mut report = ReconcileReport::new();
    let mut items = Vec::with_capacity(next.len());

    for (position, record) in next.into_iter().enumerate() {
        let keyed = key_value(&record, key).is_some();
        let matched = if keyed {
            key_value(&record, key)
                .and_then(|value| by_key.get(value).copied())
                .filter(|index| !claimed[*index])
        } else if position < previous.len()
            && !claimed[position]
            && !has_key(&previous[position], key)
        {
            Some(position)
        } else {
            None
        };

        let object = match matched {
            Some(index) if keyed || options.merge => {
                claimed[index] = true;
                let object = previous[index].clone();
                let written = merge_fields(&object, record);
                if written > 0 {
                    report.updated += 1;
                    report.fields_written += written;
                }
                object
            }
            Some(index) if previous[index].snapshot() == record => {
                claimed[index] = true;
                previous[index].clone()
            }
            _ => {
                report.inserted += 1;
                StoreObject::from_record(&rt, record)
            }
        };
        items.push(object);
    }

    report.removed = claimed.iter().filter(|c| !**c).count();
    report.resequenced = array.replace_items(items);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use core::cell::{Cell, RefCell};
    use rill_reactive::Runtime;

    fn friend(id: i64, name: &str, age: i64) -> Record {
        Record::new().with("id", id).with("name", name).with("age", age)
    }

    fn keyed() -> ReconcileOptions {
        ReconcileOptions::default()
    }

    #[test]
    fn test_reconcile_into_empty() {
        let rt = Runtime::new();
        let arr = StoreArray::new(&rt);

        let report = arr.reconcile(vec![friend(1, "Foo", 10)], &keyed());

        assert_eq!(report.inserted, 1);
        assert_eq!(report.removed, 0);
        assert!(report.resequenced);
        assert_eq!(arr.snapshot(), [friend(1, "Foo", 10)]);
    }

    #[test]
    fn test_reconcile_keeps_identity_on_update() {
        let rt = Runtime::new();
        let arr = StoreArray::new(&rt);
        arr.reconcile(vec![friend(1, "Foo", 10)], &keyed());
        let before = arr.items_untracked()[0].clone();

        let report = arr.reconcile(vec![friend(1, "CHANGED", 10)], &keyed());

        let after = arr.items_untracked()[0].clone();
        assert!(before.ptr_eq(&after));
        assert_eq!(report.updated, 1);
        assert_eq!(report.fields_written, 1);
        assert!(!report.resequenced);
        assert_eq!(before.get_untracked("name"), Some(Value::from("CHANGED")));
    }

    #[test]
    fn test_reconcile_identical_snapshot_is_empty() {
        let rt = Runtime::new();
        let arr = StoreArray::new(&rt);
        let snapshot = vec![friend(1, "Foo", 10), friend(2, "Bar", 11)];
        arr.reconcile(snapshot.clone(), &keyed());

        let report = arr.reconcile(snapshot, &keyed());
        assert!(report.is_empty());
    }

    #[test]
    fn test_reconcile_follows_snapshot_order() {
        let rt = Runtime::new();
        let arr = StoreArray::new(&rt);
        arr.reconcile(
            vec![friend(1, "A", 1), friend(2, "B", 2), friend(3, "C", 3)],
            &keyed(),
        );
        let old = arr.items_untracked();

        let report = arr.reconcile(
            vec![friend(3, "C", 3), friend(4, "D", 4), friend(1, "A", 1)],
            &keyed(),
        );
        let new = arr.items_untracked();

        assert_eq!(report.inserted, 1);
        assert_eq!(report.removed, 1);
        assert_eq!(report.updated, 0);
        assert!(new[0].ptr_eq(&old[2]));
        assert!(new[2].ptr_eq(&old[0]));
        assert_eq!(
            arr.snapshot(),
            [friend(3, "C", 3), friend(4, "D", 4), friend(1, "A", 1)]
        );
    }

    #[test]
    fn test_reconcile_removes_absent_fields() {
        let rt = Runtime::new();
        let arr = StoreArray::new(&rt);
        arr.reconcile(vec![friend(1, "Foo", 10).with("nick", "f")], &keyed());

        arr.reconcile(vec![friend(1, "Foo", 10)], &keyed());

        let obj = arr.items_untracked()[0].clone();
        assert_eq!(obj.get_untracked("nick"), None);
        assert_eq!(obj.snapshot(), friend(1, "Foo", 10));
    }

    #[test]
    fn test_reconcile_duplicate_keys() {
        let rt = Runtime::new();
        let arr = StoreArray::new(&rt);
        arr.reconcile(vec![friend(1, "Foo", 10)], &keyed());
        let original = arr.items_untracked()[0].clone();

        let report = arr.reconcile(vec![friend(1, "Foo", 10), friend(1, "Twin", 10)], &keyed());

        let items = arr.items_untracked();
        assert!(items[0].ptr_eq(&original));
        assert!(!items[1].ptr_eq(&original));
        assert_eq!(report.inserted, 1);
    }

    #[test]
    fn test_reconcile_unkeyed_merge_is_positional() {
        let rt = Runtime::new();
        let arr = StoreArray::new(&rt);
        let options = ReconcileOptions::unkeyed().with_merge(true);
        let a = Record::new().with("v", 1i64);
        let b = Record::new().with("v", 2i64);
        arr.reconcile(vec![a.clone(), b], &options);
        let old = arr.items_untracked();

        let report = arr.reconcile(vec![a, Record::new().with("v", 3i64)], &options);

        let new = arr.items_untracked();
        assert!(new[0].ptr_eq(&old[0]));
        assert!(new[1].ptr_eq(&old[1]));
        assert_eq!(report.updated, 1);
        assert_eq!(new[1].get_untracked("v"), Some(Value::Int64(3)));
    }

    #[test]
    fn test_reconcile_unkeyed_without_merge_replaces_changed() {
        let rt = Runtime::new();
        let arr = StoreArray::new(&rt);
        let options = ReconcileOptions::unkeyed();
        let a = Record::new().with("v", 1i64);
        arr.reconcile(vec![a.clone(), Record::new().with("v", 2i64)], &options);
        let old = arr.items_untracked();

        let report = arr.reconcile(vec![a, Record::new().with("v", 3i64)], &options);

        let new = arr.items_untracked();
        assert!(new[0].ptr_eq(&old[0]));
        assert!(!new[1].ptr_eq(&old[1]));
        assert_eq!(report.inserted, 1);
        assert_eq!(report.removed, 1);
    }

    #[test]
    fn test_reconcile_missing_key_falls_back_to_position() {
        let rt = Runtime::new();
        let arr = StoreArray::new(&rt);
        let options = keyed().with_merge(true);
        arr.reconcile(vec![Record::new().with("name", "draft")], &options);
        let old = arr.items_untracked();

        arr.reconcile(vec![Record::new().with("name", "edited")], &options);

        let new = arr.items_untracked();
        assert!(new[0].ptr_eq(&old[0]));
        assert_eq!(new[0].get_untracked("name"), Some(Value::from("edited")));
    }

    #[test]
    fn test_reconcile_notifies_only_changed_element() {
        let rt = Runtime::new();
        let root = rt.root();
        let arr = StoreArray::new(&rt);
        arr.reconcile(vec![friend(1, "Foo", 10), friend(2, "Bar", 11)], &keyed());

        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        let arr2 = arr.clone();
        root.create_effect(move |_| {
            if let Some(first) = arr2.get(0) {
                first.get("name");
            }
            runs_clone.set(runs_clone.get() + 1);
        });

        arr.reconcile(vec![friend(1, "Foo", 10), friend(2, "Baz", 11)], &keyed());
        assert_eq!(runs.get(), 1);

        arr.reconcile(vec![friend(1, "Qux", 10), friend(2, "Baz", 11)], &keyed());
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_reconcile_batches_notifications() {
        let rt = Runtime::new();
        let root = rt.root();
        let obj = StoreObject::new(&rt);

        let runs = Rc::new(Cell::new(0));
        let runs_clone = runs.clone();
        let obj2 = obj.clone();
        root.create_effect(move |_| {
            obj2.get("name");
            obj2.get("age");
            runs_clone.set(runs_clone.get() + 1);
        });

        obj.reconcile(Some(friend(1, "Foo", 10)), &ReconcileOptions::object());
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_reconcile_array_is_one_batch() {
        let rt = Runtime::new();
        let root = rt.root();
        let arr = StoreArray::new(&rt);
        arr.reconcile(vec![friend(1, "Foo", 10), friend(2, "Bar", 11)], &keyed());

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let arr2 = arr.clone();
        root.create_effect(move |_| {
            let names: Vec<Option<Value>> = arr2.to_vec().iter().map(|f| f.get("name")).collect();
            seen_clone.borrow_mut().push(names);
        });

        arr.reconcile(vec![friend(2, "Baz", 11), friend(1, "Qux", 10)], &keyed());

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1], [Some(Value::from("Baz")), Some(Value::from("Qux"))]);
    }

    #[test]
    fn test_reconcile_nested_values_replace_whole() {
        let rt = Runtime::new();
        let arr = StoreArray::new(&rt);
        let address = |city: &str| Value::from(Record::new().with("city", city).with("zip", "1000"));
        arr.reconcile(vec![friend(1, "Foo", 10).with("address", address("Oslo"))], &keyed());
        let obj = arr.items_untracked()[0].clone();

        let report = arr.reconcile(
            vec![friend(1, "Foo", 10).with("address", address("Bergen"))],
            &keyed(),
        );

        assert_eq!(report.fields_written, 1);
        assert!(arr.items_untracked()[0].ptr_eq(&obj));
        assert_eq!(obj.get_untracked("address"), Some(address("Bergen")));
    }

    #[test]
    fn test_reconcile_object_merge_and_clear() {
        let rt = Runtime::new();
        let obj = StoreObject::new(&rt);
        let options = ReconcileOptions::object();

        let report = obj.reconcile(Some(friend(1, "Foo", 10)), &options);
        assert_eq!(report.fields_written, 3);

        let report = obj.reconcile(Some(friend(1, "Foo", 11)), &options);
        assert_eq!(report.updated, 1);
        assert_eq!(report.fields_written, 1);

        let report = obj.reconcile(None, &options);
        assert_eq!(report.fields_written, 3);
        assert!(obj.snapshot().is_empty());
    }
}
