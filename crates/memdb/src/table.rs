//! Tables of keyed records.

use alloc::collections::BTreeMap;
use alloc::string::String;
use rill_core::{Error, Record, Result, Value};

/// An ordered collection of records keyed by an Int64 primary key.
///
/// Records without a key are assigned the next free one on insert.
#[derive(Clone, Debug)]
pub struct Table {
    name: String,
    primary_key: String,
    rows: BTreeMap<i64, Record>,
    /// Next auto-assigned key, None once `i64::MAX` is taken
    next_id: Option<i64>,
}

impl Table {
    /// Creates an empty table.
    pub fn new(name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: primary_key.into(),
            rows: BTreeMap::new(),
            next_id: Some(1),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, key: i64) -> Option<&Record> {
        self.rows.get(&key)
    }

    /// Iterates records in key order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.rows.values()
    }

    /// Inserts a new record, failing if its key is taken.
    pub fn add(&mut self, record: Record) -> Result<i64> {
        let key = self.key_or_next(&record)?;
        if self.rows.contains_key(&key) {
            return Err(Error::duplicate_key(self.name.clone(), Value::Int64(key)));
        }
        Ok(self.store(key, record))
    }

    /// Inserts or replaces a record.
    pub fn put(&mut self, record: Record) -> Result<i64> {
        let key = self.key_or_next(&record)?;
        Ok(self.store(key, record))
    }

    /// Applies a partial patch to an existing record. The key cannot change.
    pub fn update(&mut self, key: i64, mut patch: Record) -> Result<()> {
        patch.remove(&self.primary_key);
        match self.rows.get_mut(&key) {
            Some(row) => {
                row.apply_patch(patch);
                Ok(())
            }
            None => Err(Error::not_found(self.name.clone(), Value::Int64(key))),
        }
    }

    /// Removes a record. Returns false if it did not exist.
    pub fn delete(&mut self, key: i64) -> bool {
        self.rows.remove(&key).is_some()
    }

    /// Removes every record. Key assignment continues where it left off.
    pub fn clear(&mut self) -> usize {
        let removed = self.rows.len();
        self.rows.clear();
        removed
    }

    fn key_of(&self, record: &Record) -> Result<Option<i64>> {
        match record.get(&self.primary_key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Int64(key)) => Ok(Some(*key)),
            Some(other) => Err(Error::invalid_key(self.primary_key.clone(), other.kind())),
        }
    }

    fn key_or_next(&self, record: &Record) -> Result<i64> {
        match self.key_of(record)? {
            Some(key) => Ok(key),
            None => self
                .next_id
                .ok_or_else(|| Error::keys_exhausted(self.name.clone())),
        }
    }

    fn store(&mut self, key: i64, mut record: Record) -> i64 {
        record.set(self.primary_key.clone(), key);
        if self.next_id.map_or(false, |next| key >= next) {
            self.next_id = key.checked_add(1);
        }
        self.rows.insert(key, record);
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rill_core::ValueKind;

    fn friends() -> Table {
        Table::new("friends", "id")
    }

    #[test]
    fn test_table_add_assigns_keys() {
        let mut table = friends();
        let a = table.add(Record::new().with("name", "Foo")).unwrap();
        let b = table.add(Record::new().with("name", "Bar")).unwrap();

        assert_eq!((a, b), (1, 2));
        assert_eq!(table.get(1).and_then(|r| r.get_i64("id")), Some(1));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_table_add_explicit_key() {
        let mut table = friends();
        table.add(Record::new().with("id", 10i64)).unwrap();
        let next = table.add(Record::new()).unwrap();
        assert_eq!(next, 11);

        let err = table.add(Record::new().with("id", 10i64)).unwrap_err();
        assert_eq!(err, Error::duplicate_key("friends", Value::Int64(10)));
    }

    #[test]
    fn test_table_invalid_key() {
        let mut table = friends();
        let err = table.add(Record::new().with("id", "x")).unwrap_err();
        assert_eq!(err, Error::invalid_key("id", Some(ValueKind::String)));
        assert!(table.is_empty());
    }

    #[test]
    fn test_table_put_replaces() {
        let mut table = friends();
        let key = table.add(Record::new().with("name", "Foo").with("age", 10i64)).unwrap();
        table.put(Record::new().with("id", key).with("name", "Bar")).unwrap();

        let row = table.get(key).unwrap();
        assert_eq!(row.get_str("name"), Some("Bar"));
        assert!(!row.contains("age"));
    }

    #[test]
    fn test_table_update_patches() {
        let mut table = friends();
        let key = table.add(Record::new().with("name", "Foo").with("age", 10i64)).unwrap();

        table
            .update(key, Record::new().with("name", "CHANGED").with("id", 99i64))
            .unwrap();
        let row = table.get(key).unwrap();
        assert_eq!(row.get_str("name"), Some("CHANGED"));
        assert_eq!(row.get_i64("age"), Some(10));
        assert_eq!(row.get_i64("id"), Some(key));

        let err = table.update(42, Record::new()).unwrap_err();
        assert_eq!(err, Error::not_found("friends", Value::Int64(42)));
    }

    #[test]
    fn test_table_delete_and_clear() {
        let mut table = friends();
        table.add(Record::new()).unwrap();
        table.add(Record::new()).unwrap();

        assert!(table.delete(1));
        assert!(!table.delete(1));
        assert_eq!(table.clear(), 1);
        assert!(table.is_empty());
        assert_eq!(table.add(Record::new()).unwrap(), 3);
    }

    #[test]
    fn test_table_keys_exhausted() {
        let mut table = friends();
        table
            .add(Record::new().with("id", i64::MAX).with("name", "Max"))
            .unwrap();

        let err = table.add(Record::new().with("name", "Auto")).unwrap_err();
        assert_eq!(err, Error::keys_exhausted("friends"));
        let err = table.put(Record::new().with("name", "Auto")).unwrap_err();
        assert_eq!(err, Error::keys_exhausted("friends"));

        assert_eq!(table.len(), 1);
        assert_eq!(table.get(i64::MAX).and_then(|r| r.get_str("name")), Some("Max"));

        // Explicit keys below the maximum are still accepted
        assert_eq!(table.add(Record::new().with("id", 5i64)).unwrap(), 5);
    }
}
