//! The database handle.
//!
//! `Database` is a cheap-to-clone handle over shared tables. Writes apply
//! immediately; live queries observe them on the next [`Database::settle`].

use crate::config::DatabaseConfig;
use crate::live_registry::{LiveRegistry, QueryTask, TaskRef};
use crate::scheduler::Scheduler;
use crate::table::Table;
use crate::transaction::{ReadSet, ReadTx};
use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell, RefMut};
use hashbrown::HashMap;
use rill_core::{
    Disposer, Error, Observer, Query, QueryExecutor, Record, Result, Subscribable, Unsubscribe,
};
use tracing::{debug, trace};

struct DbInner {
    config: DatabaseConfig,
    tables: RefCell<HashMap<String, Table>>,
    /// Tables read by the query currently being tracked
    reads: RefCell<Option<ReadSet>>,
    registry: RefCell<LiveRegistry>,
    scheduler: Scheduler,
    closed: Cell<bool>,
}

/// An in-memory database with live queries.
#[derive(Clone)]
pub struct Database {
    inner: Rc<DbInner>,
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    /// Opens an empty database with the default configuration.
    pub fn new() -> Self {
        Self::with_config(DatabaseConfig::default())
    }

    pub fn with_config(config: DatabaseConfig) -> Self {
        Self::with_scheduler(config, Scheduler::new())
    }

    /// Opens a database that queues live-query work on `scheduler`.
    pub fn with_scheduler(config: DatabaseConfig, scheduler: Scheduler) -> Self {
        Self {
            inner: Rc::new(DbInner {
                config,
                tables: RefCell::new(HashMap::new()),
                reads: RefCell::new(None),
                registry: RefCell::new(LiveRegistry::default()),
                scheduler,
                closed: Cell::new(false),
            }),
        }
    }

    #[inline]
    pub fn config(&self) -> &DatabaseConfig {
        &self.inner.config
    }

    #[inline]
    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    /// Runs queued live-query work until nothing is left. Returns the number
    /// of tasks run.
    pub fn settle(&self) -> usize {
        self.inner.scheduler.run_until_idle()
    }

    /// Number of open live subscriptions.
    pub fn live_query_count(&self) -> usize {
        self.inner.registry.borrow().len()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }

    /// Closes the database. Further reads and writes fail with
    /// `Error::Disposed`; open live queries receive that error once.
    pub fn close(&self) {
        if self.inner.closed.replace(true) {
            return;
        }
        debug!("closing database");
        let ids = self.inner.registry.borrow().ids();
        for id in ids {
            let db = self.clone();
            self.inner.scheduler.schedule(move || db.refresh(id));
        }
    }

    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.tables.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// Creates an empty table keyed by the configured primary key.
    pub fn create_table(&self, name: &str) -> Result<()> {
        self.ensure_open()?;
        {
            let mut tables = self.tables_mut()?;
            if tables.contains_key(name) {
                return Err(Error::table_exists(name));
            }
            tables.insert(
                name.to_string(),
                Table::new(name, self.inner.config.primary_key.clone()),
            );
        }
        debug!(table = name, "created table");
        self.mark_dirty(name);
        Ok(())
    }

    /// Inserts a record, assigning a key if it has none.
    pub fn add(&self, table: &str, record: Record) -> Result<i64> {
        self.write(table, |t| t.add(record))
    }

    /// Inserts several records. Either all are inserted or none.
    pub fn bulk_add(&self, table: &str, records: Vec<Record>) -> Result<Vec<i64>> {
        self.write(table, |t| {
            let mut staged = t.clone();
            let keys = records
                .into_iter()
                .map(|record| staged.add(record))
                .collect::<Result<Vec<i64>>>()?;
            *t = staged;
            Ok(keys)
        })
    }

    /// Inserts or replaces a record.
    pub fn put(&self, table: &str, record: Record) -> Result<i64> {
        self.write(table, |t| t.put(record))
    }

    /// Overwrites the fields in `patch` on the record with `key`.
    pub fn update(&self, table: &str, key: i64, patch: Record) -> Result<()> {
        self.write(table, |t| t.update(key, patch))
    }

    /// Deletes a record. Returns false if it did not exist.
    pub fn delete(&self, table: &str, key: i64) -> Result<bool> {
        self.write(table, |t| Ok(t.delete(key)))
    }

    /// Deletes every record of a table.
    pub fn clear(&self, table: &str) -> Result<usize> {
        self.write(table, |t| Ok(t.clear()))
    }

    pub fn get(&self, table: &str, key: i64) -> Result<Option<Record>> {
        self.read(|tx| tx.get(table, key))
    }

    /// Wraps a read into a [`Query`] that can be executed or made live.
    pub fn query<T, F>(&self, read: F) -> Query<T>
    where
        T: 'static,
        F: Fn(&ReadTx<'_>) -> Result<T> + 'static,
    {
        let db = self.clone();
        Query::new(move || db.read(|tx| read(tx)))
    }

    /// Runs `f` against the current tables.
    pub fn read<T>(&self, f: impl FnOnce(&ReadTx<'_>) -> Result<T>) -> Result<T> {
        self.ensure_open()?;
        let tables = self
            .inner
            .tables
            .try_borrow()
            .map_err(|_| Error::query_failed("database is being written"))?;
        let tx = ReadTx::new(&tables, &self.inner.reads);
        f(&tx)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.inner.closed.get() {
            Err(Error::Disposed)
        } else {
            Ok(())
        }
    }

    fn tables_mut(&self) -> Result<RefMut<'_, HashMap<String, Table>>> {
        self.inner
            .tables
            .try_borrow_mut()
            .map_err(|_| Error::query_failed("cannot write during a read"))
    }

    fn write<R>(&self, table: &str, f: impl FnOnce(&mut Table) -> Result<R>) -> Result<R> {
        self.ensure_open()?;
        let result = {
            let mut tables = self.tables_mut()?;
            let target = tables
                .get_mut(table)
                .ok_or_else(|| Error::table_not_found(table))?;
            f(target)?
        };
        trace!(table, "write applied");
        self.mark_dirty(table);
        Ok(result)
    }

    fn mark_dirty(&self, table: &str) {
        let schedule = self.inner.registry.borrow_mut().mark_dirty(table);
        if schedule {
            let db = self.clone();
            self.inner.scheduler.schedule(move || db.flush());
        }
    }

    /// Re-runs every live query that read a table written since the last
    /// flush.
    fn flush(&self) {
        let affected = self.inner.registry.borrow_mut().take_affected();
        trace!(queries = affected.len(), "flushing live queries");
        for id in affected {
            self.refresh(id);
        }
    }

    fn refresh(&self, id: u64) {
        let task = match self.inner.registry.borrow().task(id) {
            Some(task) => task,
            None => return,
        };
        let reads = task.borrow_mut().refresh(&|run| self.track_reads(run));
        self.inner.registry.borrow_mut().set_reads(id, reads);
    }

    fn track_reads(&self, run: &mut dyn FnMut()) -> ReadSet {
        let previous = self.inner.reads.replace(Some(ReadSet::new()));
        run();
        let reads = self.inner.reads.replace(previous);
        reads.unwrap_or_default()
    }

    fn subscribe_task(&self, task: TaskRef) -> Disposer {
        let id = self.inner.registry.borrow_mut().register(task);
        debug!(id, "live query subscribed");
        let db = self.clone();
        self.inner.scheduler.schedule(move || db.refresh(id));
        Disposer::from_handle(LiveHandle {
            db: Rc::downgrade(&self.inner),
            id,
        })
    }
}

impl core::fmt::Debug for Database {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Database")
            .field("tables", &self.table_names())
            .field("live_queries", &self.live_query_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Ends one live subscription. Idempotent.
struct LiveHandle {
    db: Weak<DbInner>,
    id: u64,
}

impl Unsubscribe for LiveHandle {
    fn unsubscribe(&mut self) {
        if let Some(inner) = self.db.upgrade() {
            if inner.registry.borrow_mut().unregister(self.id) {
                debug!(id = self.id, "live query unsubscribed");
            }
        }
    }
}

/// A query made live against a [`Database`].
pub struct LiveQuery<T> {
    db: Database,
    query: Query<T>,
}

impl<T: Clone + PartialEq + 'static> Subscribable<T> for LiveQuery<T> {
    fn subscribe(&self, observer: Observer<T>) -> Disposer {
        let task: TaskRef = Rc::new(RefCell::new(QueryTask::new(
            self.query.clone(),
            observer,
            self.db.inner.config.dedupe_results,
        )));
        self.db.subscribe_task(task)
    }
}

impl Database {
    /// Makes `query` live. Each subscriber gets its own run of the query,
    /// first on the next settle and again after every relevant write.
    pub fn live<T>(&self, query: Query<T>) -> LiveQuery<T> {
        LiveQuery {
            db: self.clone(),
            query,
        }
    }
}

impl QueryExecutor for Database {
    fn live_query<T>(&self, query: Query<T>) -> Box<dyn Subscribable<T>>
    where
        T: Clone + PartialEq + 'static,
    {
        Box::new(self.live(query))
    }
}
