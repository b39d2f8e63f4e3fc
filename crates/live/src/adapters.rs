//! Public query adapters.
//!
//! Each adapter allocates its container once, wires it to a query executor
//! through the controller, and returns a handle that reads reactively:
//!
//! - [`create_query_signal`]: any query result, replaced wholesale per emission
//! - [`create_query_array`]: a collection of records reconciled by key
//! - [`create_query_object`]: an optional single record merged field by field

use crate::controller::{create_live_container, LiveContainer, Source};
use crate::options::ReconcileOptions;
use crate::sink::subscribe_guarded;
use crate::status::QueryStatus;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::Cell;
use core::fmt;
use rill_core::{Query, QueryExecutor, Record};
use rill_reactive::{Effect, Scope, Signal, StoreArray, StoreObject};
use tracing::debug;

/// Dependency source and reconciliation settings for a collection or object
/// adapter.
#[derive(Clone, Debug)]
pub struct QueryOptions<D> {
    pub source: Source<D>,
    pub reconcile: ReconcileOptions,
}

impl Default for QueryOptions<()> {
    fn default() -> Self {
        Self {
            source: Source::default(),
            reconcile: ReconcileOptions::default(),
        }
    }
}

impl<D> QueryOptions<D> {
    /// Options driven by `source` with default reconciliation.
    pub fn new(source: impl Into<Source<D>>) -> Self {
        Self {
            source: source.into(),
            reconcile: ReconcileOptions::default(),
        }
    }

    pub fn with_reconcile(mut self, reconcile: ReconcileOptions) -> Self {
        self.reconcile = reconcile;
        self
    }
}

/// A live, keyed collection of records.
#[derive(Debug)]
pub struct LiveArray {
    inner: LiveContainer<StoreArray>,
}

impl LiveArray {
    /// The backing array. Same identity for the adapter's whole life.
    #[inline]
    pub fn array(&self) -> &StoreArray {
        self.inner.container()
    }

    /// Tracked element count.
    pub fn len(&self) -> usize {
        self.array().len()
    }

    pub fn is_empty(&self) -> bool {
        self.array().is_empty()
    }

    /// Tracked element access.
    pub fn get(&self, index: usize) -> Option<StoreObject> {
        self.array().get(index)
    }

    /// Untracked copy of the current contents.
    pub fn snapshot(&self) -> Vec<Record> {
        self.array().snapshot()
    }

    pub fn status(&self) -> QueryStatus {
        self.inner.status()
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation()
    }

    pub fn dispose(&self) {
        self.inner.dispose();
    }
}

/// A live single record.
#[derive(Debug)]
pub struct LiveObject {
    inner: LiveContainer<StoreObject>,
}

impl LiveObject {
    /// The backing object. Empty while nothing matches.
    #[inline]
    pub fn object(&self) -> &StoreObject {
        self.inner.container()
    }

    /// Tracked field read.
    pub fn get(&self, field: &str) -> Option<rill_core::Value> {
        self.object().get(field)
    }

    pub fn snapshot(&self) -> Record {
        self.object().snapshot()
    }

    pub fn status(&self) -> QueryStatus {
        self.inner.status()
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation()
    }

    pub fn dispose(&self) {
        self.inner.dispose();
    }
}

/// Opens a live collection query reconciled by `"id"`.
pub fn create_query_array<E, Q>(cx: &Scope, executor: &E, querier: Q) -> LiveArray
where
    E: QueryExecutor + Clone + 'static,
    Q: Fn() -> Query<Vec<Record>> + 'static,
{
    create_query_array_with(cx, executor, QueryOptions::default(), move |_: &()| {
        querier()
    })
}

/// Opens a live collection query with an explicit dependency source and
/// reconciliation options.
pub fn create_query_array_with<E, D, Q>(
    cx: &Scope,
    executor: &E,
    options: QueryOptions<D>,
    querier: Q,
) -> LiveArray
where
    E: QueryExecutor + Clone + 'static,
    D: Clone + 'static,
    Q: Fn(&D) -> Query<Vec<Record>> + 'static,
{
    let executor = executor.clone();
    let array = StoreArray::new(cx.runtime());
    let inner = create_live_container(
        cx,
        array,
        options.source,
        options.reconcile,
        move |dependency| executor.live_query(querier(dependency)),
    );
    LiveArray { inner }
}

/// Opens a live single-record query.
pub fn create_query_object<E, Q>(cx: &Scope, executor: &E, querier: Q) -> LiveObject
where
    E: QueryExecutor + Clone + 'static,
    Q: Fn() -> Query<Option<Record>> + 'static,
{
    create_query_object_with(cx, executor, Source::default(), move |_: &()| querier())
}

/// Opens a live single-record query parameterized by `source`.
pub fn create_query_object_with<E, D, Q>(
    cx: &Scope,
    executor: &E,
    source: impl Into<Source<D>>,
    querier: Q,
) -> LiveObject
where
    E: QueryExecutor + Clone + 'static,
    D: Clone + 'static,
    Q: Fn(&D) -> Query<Option<Record>> + 'static,
{
    let executor = executor.clone();
    let object = StoreObject::new(cx.runtime());
    let inner = create_live_container(
        cx,
        object,
        source.into(),
        ReconcileOptions::object(),
        move |dependency| executor.live_query(querier(dependency)),
    );
    LiveObject { inner }
}

/// The latest result of a live query, `None` until the current subscription
/// first delivers.
pub struct QuerySignal<T> {
    value: Signal<Option<T>>,
    status: Signal<QueryStatus>,
    generation: Rc<Cell<u64>>,
    effect: Effect,
}

impl<T: Clone + 'static> QuerySignal<T> {
    /// Tracked read of the latest result.
    pub fn get(&self) -> Option<T> {
        self.value.get()
    }

    pub fn get_untracked(&self) -> Option<T> {
        self.value.get_untracked()
    }

    /// Tracked borrow of the latest result.
    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        self.value.with(|value| f(value.as_ref()))
    }

    pub fn status(&self) -> QueryStatus {
        self.status.get()
    }

    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    pub fn dispose(&self) {
        self.effect.dispose();
    }
}

impl<T: fmt::Debug> fmt::Debug for QuerySignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySignal")
            .field("value", &self.value)
            .field("generation", &self.generation.get())
            .finish()
    }
}

/// Opens a live query whose result is exposed as a signal.
///
/// Cells read by `querier` are dependencies: changing one re-subscribes.
pub fn create_query_signal<E, T, Q>(cx: &Scope, executor: &E, querier: Q) -> QuerySignal<T>
where
    E: QueryExecutor + Clone + 'static,
    T: Clone + PartialEq + 'static,
    Q: Fn() -> Query<T> + 'static,
{
    create_query_signal_with(cx, executor, Source::default(), move |_: &()| querier())
}

/// Opens a live query parameterized by `source`, exposed as a signal.
pub fn create_query_signal_with<E, D, T, Q>(
    cx: &Scope,
    executor: &E,
    source: impl Into<Source<D>>,
    querier: Q,
) -> QuerySignal<T>
where
    E: QueryExecutor + Clone + 'static,
    D: Clone + 'static,
    T: Clone + PartialEq + 'static,
    Q: Fn(&D) -> Query<T> + 'static,
{
    let source = source.into();
    let executor = executor.clone();
    let value = cx.create_signal(None::<T>);
    let status = cx.create_signal(QueryStatus::Pending);
    let generation = Rc::new(Cell::new(0u64));

    let effect = {
        let value = value.clone();
        let status = status.clone();
        let generation = generation.clone();
        cx.create_effect(move |run| {
            let query = querier(&source.get());

            let current = generation.get() + 1;
            generation.set(current);
            run.untrack(|| {
                debug!(generation = current, "subscribing query signal");
                value.set(None);
                status.set(QueryStatus::Pending);
                let stream = executor.live_query(query);
                let latest = value.clone();
                subscribe_guarded(run, stream.as_ref(), Some(status.clone()), move |v| {
                    latest.set(Some(v));
                });
            });
        })
    };

    QuerySignal {
        value,
        status,
        generation,
        effect,
    }
}
