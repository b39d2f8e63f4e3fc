//! Fine-grained mutable containers.
//!
//! Stores hold records whose fields are individually reactive:
//!
//! - `StoreObject`: one trigger per field plus one for the field set. Writing a
//!   field that already holds an equal value notifies nobody.
//! - `StoreArray`: an ordered list of `StoreObject`s with separate triggers for
//!   the length and for the element sequence. Replacing the sequence with the
//!   same element identities notifies nobody.
//!
//! Both are reference types: clones share the same underlying node, and
//! identity is compared with `ptr_eq`.

use crate::runtime::Runtime;
use crate::signal::Trigger;
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;
use rill_core::{Record, Value};

struct FieldSlot {
    /// None while the field is absent but already observed
    value: Option<Value>,
    trigger: Trigger,
}

struct ObjectNode {
    rt: Runtime,
    fields: RefCell<BTreeMap<String, FieldSlot>>,
    keys: Trigger,
}

/// A record with per-field reactivity.
#[derive(Clone)]
pub struct StoreObject {
    node: Rc<ObjectNode>,
}

impl StoreObject {
    /// Creates an empty object.
    pub fn new(rt: &Runtime) -> Self {
        Self {
            node: Rc::new(ObjectNode {
                rt: rt.clone(),
                fields: RefCell::new(BTreeMap::new()),
                keys: Trigger::new(rt),
            }),
        }
    }

    /// Creates an object holding the fields of `record`.
    pub fn from_record(rt: &Runtime, record: Record) -> Self {
        let object = Self::new(rt);
        {
            let mut fields = object.node.fields.borrow_mut();
            for (field, value) in record {
                fields.insert(
                    field,
                    FieldSlot {
                        value: Some(value),
                        trigger: Trigger::new(rt),
                    },
                );
            }
        }
        object
    }

    /// Returns the runtime this object belongs to.
    #[inline]
    pub fn runtime(&self) -> &Runtime {
        &self.node.rt
    }

    /// Returns true if both handles refer to the same object.
    #[inline]
    pub fn ptr_eq(&self, other: &StoreObject) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }

    fn field_trigger(&self, field: &str) -> Trigger {
        let mut fields = self.node.fields.borrow_mut();
        if let Some(slot) = fields.get(field) {
            return slot.trigger.clone();
        }
        prune_absent(&mut fields);
        let trigger = Trigger::new(&self.node.rt);
        fields.insert(
            field.to_string(),
            FieldSlot {
                value: None,
                trigger: trigger.clone(),
            },
        );
        trigger
    }

    /// Absent fields only get a slot when an effect is there to observe them.
    fn track_field(&self, field: &str) {
        if self.node.rt.is_tracking() {
            self.field_trigger(field).track();
        }
    }

    /// Reads a field, tracking only that field.
    pub fn get(&self, field: &str) -> Option<Value> {
        self.track_field(field);
        self.get_untracked(field)
    }

    /// Reads a field without tracking.
    pub fn get_untracked(&self, field: &str) -> Option<Value> {
        self.node
            .fields
            .borrow()
            .get(field)
            .and_then(|slot| slot.value.clone())
    }

    /// Returns true if the field is present, tracking that field.
    pub fn contains(&self, field: &str) -> bool {
        self.track_field(field);
        self.get_untracked(field).is_some()
    }

    /// Returns the present field names, tracking the field set.
    pub fn field_names(&self) -> Vec<String> {
        self.node.keys.track();
        self.field_names_untracked()
    }

    /// Returns the present field names without tracking.
    pub fn field_names_untracked(&self) -> Vec<String> {
        self.node
            .fields
            .borrow()
            .iter()
            .filter(|(_, slot)| slot.value.is_some())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Returns the number of present fields, tracking the field set.
    pub fn len(&self) -> usize {
        self.node.keys.track();
        self.node
            .fields
            .borrow()
            .values()
            .filter(|slot| slot.value.is_some())
            .count()
    }

    /// Returns true if no field is present, tracking the field set.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies the object into a record, tracking every field read.
    pub fn to_record(&self) -> Record {
        self.field_names()
            .into_iter()
            .filter_map(|name| self.get(&name).map(|value| (name, value)))
            .collect()
    }

    /// Copies the object into a record without tracking.
    pub fn snapshot(&self) -> Record {
        self.node
            .fields
            .borrow()
            .iter()
            .filter_map(|(name, slot)| slot.value.clone().map(|value| (name.clone(), value)))
            .collect()
    }

    /// Writes a field if its value differs. Returns true if it was written.
    ///
    /// Only observers of that field (and of the field set, when the field is
    /// new) are notified.
    pub fn set(&self, field: &str, value: Value) -> bool {
        let (trigger, added) = {
            let mut fields = self.node.fields.borrow_mut();
            match fields.get_mut(field) {
                Some(slot) if slot.value.as_ref() == Some(&value) => return false,
                Some(slot) => {
                    let added = slot.value.is_none();
                    slot.value = Some(value);
                    (slot.trigger.clone(), added)
                }
                None => {
                    let trigger = Trigger::new(&self.node.rt);
                    fields.insert(
                        field.to_string(),
                        FieldSlot {
                            value: Some(value),
                            trigger: trigger.clone(),
                        },
                    );
                    (trigger, true)
                }
            }
        };
        trigger.notify();
        if added {
            self.node.keys.notify();
        }
        true
    }

    /// Removes a field. Returns true if it was present.
    pub fn remove(&self, field: &str) -> bool {
        let trigger = {
            let mut fields = self.node.fields.borrow_mut();
            match fields.get_mut(field) {
                Some(slot) if slot.value.is_some() => {
                    slot.value = None;
                    slot.trigger.clone()
                }
                _ => return false,
            }
        };
        trigger.notify();
        self.node.keys.notify();
        prune_absent(&mut self.node.fields.borrow_mut());
        true
    }
}

/// Drops slots that hold no value and that no effect observes.
fn prune_absent(fields: &mut BTreeMap<String, FieldSlot>) {
    fields.retain(|_, slot| slot.value.is_some() || slot.trigger.subscriber_count() > 0);
}

impl core::fmt::Debug for StoreObject {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let fields = self.node.fields.borrow();
        f.debug_map()
            .entries(
                fields
                    .iter()
                    .filter_map(|(name, slot)| slot.value.as_ref().map(|v| (name, v))),
            )
            .finish()
    }
}

struct ArrayNode {
    rt: Runtime,
    items: RefCell<Vec<StoreObject>>,
    len: Trigger,
    sequence: Trigger,
}

/// An ordered list of [`StoreObject`]s with stable identity.
#[derive(Clone)]
pub struct StoreArray {
    node: Rc<ArrayNode>,
}

impl StoreArray {
    /// Creates an empty array.
    pub fn new(rt: &Runtime) -> Self {
        Self {
            node: Rc::new(ArrayNode {
                rt: rt.clone(),
                items: RefCell::new(Vec::new()),
                len: Trigger::new(rt),
                sequence: Trigger::new(rt),
            }),
        }
    }

    /// Returns the runtime this array belongs to.
    #[inline]
    pub fn runtime(&self) -> &Runtime {
        &self.node.rt
    }

    /// Returns true if both handles refer to the same array.
    #[inline]
    pub fn ptr_eq(&self, other: &StoreArray) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }

    /// Returns the number of elements, tracking the length.
    pub fn len(&self) -> usize {
        self.node.len.track();
        self.node.items.borrow().len()
    }

    /// Returns true if there are no elements, tracking the length.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the element at `index`, tracking the element sequence.
    pub fn get(&self, index: usize) -> Option<StoreObject> {
        self.node.sequence.track();
        self.node.items.borrow().get(index).cloned()
    }

    /// Returns all elements, tracking the element sequence.
    pub fn to_vec(&self) -> Vec<StoreObject> {
        self.node.sequence.track();
        self.items_untracked()
    }

    /// Returns all elements without tracking.
    pub fn items_untracked(&self) -> Vec<StoreObject> {
        self.node.items.borrow().clone()
    }

    /// Copies every element into a record, tracking the sequence and all fields.
    pub fn to_records(&self) -> Vec<Record> {
        self.to_vec().iter().map(StoreObject::to_record).collect()
    }

    /// Copies every element into a record without tracking.
    pub fn snapshot(&self) -> Vec<Record> {
        self.node
            .items
            .borrow()
            .iter()
            .map(StoreObject::snapshot)
            .collect()
    }

    /// Replaces the element sequence.
    ///
    /// Observers of the sequence are notified only if some position now holds
    /// a different object; observers of the length only if it changed.
    /// Returns true if the sequence changed.
    pub fn replace_items(&self, items: Vec<StoreObject>) -> bool {
        let (changed, resized) = {
            let mut current = self.node.items.borrow_mut();
            let resized = current.len() != items.len();
            let changed = resized || current.iter().zip(items.iter()).any(|(a, b)| !a.ptr_eq(b));
            if changed {
                *current = items;
            }
            (changed, resized)
        };
        if changed {
            self.node.sequence.notify();
        }
        if resized {
            self.node.len.notify();
        }
        changed
    }
}

impl core::fmt::Debug for StoreArray {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.node.items.borrow().iter()).finish()
    }
}
