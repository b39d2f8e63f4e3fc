//! Read transactions.
//!
//! A `ReadTx` is the view a query closure gets of the database. Every table it
//! opens is recorded, so a live query knows which writes can affect it.

use crate::table::Table;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;
use hashbrown::{HashMap, HashSet};
use rill_core::{Error, Record, Result, Value};

/// Tables read during one query run.
pub(crate) type ReadSet = HashSet<String>;

/// Read-only access to the tables of a database.
pub struct ReadTx<'a> {
    tables: &'a HashMap<String, Table>,
    reads: &'a RefCell<Option<ReadSet>>,
}

impl<'a> ReadTx<'a> {
    pub(crate) fn new(
        tables: &'a HashMap<String, Table>,
        reads: &'a RefCell<Option<ReadSet>>,
    ) -> Self {
        Self { tables, reads }
    }

    /// Opens a table for reading.
    ///
    /// The table counts as read even when it does not exist yet, so creating
    /// it later re-runs the query.
    pub fn table(&self, name: &str) -> Result<&'a Table> {
        if let Some(reads) = self.reads.borrow_mut().as_mut() {
            if !reads.contains(name) {
                reads.insert(name.to_string());
            }
        }
        self.tables
            .get(name)
            .ok_or_else(|| Error::table_not_found(name))
    }

    /// All records of a table, in key order.
    pub fn to_vec(&self, table: &str) -> Result<Vec<Record>> {
        Ok(self.table(table)?.iter().cloned().collect())
    }

    pub fn count(&self, table: &str) -> Result<usize> {
        Ok(self.table(table)?.len())
    }

    pub fn get(&self, table: &str, key: i64) -> Result<Option<Record>> {
        Ok(self.table(table)?.get(key).cloned())
    }

    /// Records whose `field` equals `value`.
    pub fn where_eq(&self, table: &str, field: &str, value: impl Into<Value>) -> Result<Vec<Record>> {
        let value = value.into();
        self.filter(table, |record| record.get(field) == Some(&value))
    }

    /// Records whose `field` is strictly greater than `value`. Records where
    /// the field is missing or null never match.
    pub fn where_above(
        &self,
        table: &str,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<Vec<Record>> {
        let value = value.into();
        self.filter(table, |record| match record.get(field) {
            Some(v) if !v.is_null() => *v > value,
            _ => false,
        })
    }

    /// Records matching `predicate`, in key order.
    pub fn filter(&self, table: &str, predicate: impl Fn(&Record) -> bool) -> Result<Vec<Record>> {
        Ok(self
            .table(table)?
            .iter()
            .filter(|record| predicate(record))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> HashMap<String, Table> {
        let mut friends = Table::new("friends", "id");
        friends.add(Record::new().with("name", "Foo").with("age", 10i64)).unwrap();
        friends.add(Record::new().with("name", "Bar").with("age", 11i64)).unwrap();
        friends.add(Record::new().with("name", "Baz")).unwrap();
        let mut tables = HashMap::new();
        tables.insert("friends".to_string(), friends);
        tables
    }

    #[test]
    fn test_read_helpers() {
        let tables = fixture();
        let reads = RefCell::new(None);
        let tx = ReadTx::new(&tables, &reads);

        assert_eq!(tx.count("friends").unwrap(), 3);
        assert_eq!(tx.to_vec("friends").unwrap().len(), 3);
        assert_eq!(tx.where_eq("friends", "age", 10i64).unwrap().len(), 1);

        let above = tx.where_above("friends", "age", 10i64).unwrap();
        assert_eq!(above.len(), 1);
        assert_eq!(above[0].get_str("name"), Some("Bar"));

        let named = tx.filter("friends", |r| r.get_str("name") == Some("Baz")).unwrap();
        assert_eq!(named[0].get_i64("id"), Some(3));
        assert_eq!(tx.get("friends", 2).unwrap().and_then(|r| r.get_i64("age")), Some(11));
        assert_eq!(tx.get("friends", 9).unwrap(), None);
    }

    #[test]
    fn test_read_missing_table() {
        let tables = fixture();
        let reads = RefCell::new(None);
        let tx = ReadTx::new(&tables, &reads);

        assert_eq!(tx.count("enemies"), Err(Error::table_not_found("enemies")));
    }

    #[test]
    fn test_read_records_tables() {
        let tables = fixture();
        let reads = RefCell::new(Some(ReadSet::new()));
        let tx = ReadTx::new(&tables, &reads);

        tx.count("friends").unwrap();
        let _ = tx.count("enemies");

        let seen = reads.borrow_mut().take().unwrap();
        assert!(seen.contains("friends"));
        assert!(seen.contains("enemies"));
        assert_eq!(seen.len(), 2);
    }
}
