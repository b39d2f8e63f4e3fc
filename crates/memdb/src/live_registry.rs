//! Live-query registry.
//!
//! Every subscription to a live query is an entry holding its re-run task and
//! the tables its last run read. Writes mark tables dirty; a single scheduled
//! flush then re-runs each affected entry once, however many writes landed in
//! between.

use crate::transaction::ReadSet;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;
use hashbrown::HashMap;
use rill_core::{Emission, Observer, Query, Result};

/// A subscription's re-run step.
pub(crate) trait LiveTask {
    /// Runs the query through `execute` (which records the tables read) and
    /// delivers the result. Returns the tables read.
    fn refresh(&mut self, execute: &dyn Fn(&mut dyn FnMut()) -> ReadSet) -> ReadSet;
}

pub(crate) type TaskRef = Rc<RefCell<dyn LiveTask>>;

/// Re-runs one `Query<T>` for one observer.
pub(crate) struct QueryTask<T> {
    query: Query<T>,
    observer: Observer<T>,
    last: Option<T>,
    dedupe: bool,
}

impl<T> QueryTask<T> {
    pub(crate) fn new(query: Query<T>, observer: Observer<T>, dedupe: bool) -> Self {
        Self {
            query,
            observer,
            last: None,
            dedupe,
        }
    }
}

impl<T: Clone + PartialEq + 'static> LiveTask for QueryTask<T> {
    fn refresh(&mut self, execute: &dyn Fn(&mut dyn FnMut()) -> ReadSet) -> ReadSet {
        let mut result: Option<Result<T>> = None;
        let query = &self.query;
        let reads = execute(&mut || result = Some(query.execute()));

        let emission = match result {
            Some(Ok(value)) => {
                if self.dedupe && self.last.as_ref() == Some(&value) {
                    None
                } else {
                    self.last = Some(value.clone());
                    Some(Emission::Next(value))
                }
            }
            Some(Err(err)) => {
                self.last = None;
                Some(Emission::Error(err))
            }
            None => None,
        };
        if let Some(emission) = emission {
            (self.observer)(emission);
        }
        reads
    }
}

struct Entry {
    task: TaskRef,
    reads: ReadSet,
}

/// Routes table writes to the live queries that read those tables.
#[derive(Default)]
pub(crate) struct LiveRegistry {
    entries: HashMap<u64, Entry>,
    next_id: u64,
    /// Tables written since the last flush
    dirty: ReadSet,
    flush_scheduled: bool,
}

impl LiveRegistry {
    pub(crate) fn register(&mut self, task: TaskRef) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.entries.insert(
            id,
            Entry {
                task,
                reads: ReadSet::new(),
            },
        );
        id
    }

    pub(crate) fn unregister(&mut self, id: u64) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub(crate) fn task(&self, id: u64) -> Option<TaskRef> {
        self.entries.get(&id).map(|entry| entry.task.clone())
    }

    pub(crate) fn set_reads(&mut self, id: u64, reads: ReadSet) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.reads = reads;
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Marks `table` written. Returns true if the caller must schedule a
    /// flush.
    pub(crate) fn mark_dirty(&mut self, table: &str) -> bool {
        if !self.dirty.contains(table) {
            self.dirty.insert(table.to_string());
        }
        if self.flush_scheduled {
            false
        } else {
            self.flush_scheduled = true;
            true
        }
    }

    /// Takes the dirty tables and returns the entries that read any of them,
    /// in registration order.
    pub(crate) fn take_affected(&mut self) -> Vec<u64> {
        self.flush_scheduled = false;
        let dirty: ReadSet = core::mem::take(&mut self.dirty);
        let mut ids: Vec<u64> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.reads.iter().any(|t| dirty.contains(t)))
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub(crate) fn tables_read(&self, id: u64) -> Vec<String> {
        let mut tables: Vec<String> = self
            .entries
            .get(&id)
            .map(|entry| entry.reads.iter().cloned().collect())
            .unwrap_or_default();
        tables.sort();
        tables
    }
}
