//! The live subscription contract.
//!
//! A query-execution capability hands out [`Subscribable`] streams. Each
//! subscriber receives full snapshots (never deltas) as [`Emission`]s and gets
//! back a [`Disposer`] that ends the subscription.
//!
//! Disposers come in two shapes, a plain callable or a handle with an
//! `unsubscribe` method. Consumers should normalize with [`Disposer::into_fn`]
//! as soon as they receive one.

use crate::error::{Error, Result};
use alloc::boxed::Box;
use alloc::rc::Rc;
use core::fmt;

/// A single delivery on a live subscription.
#[derive(Clone, Debug, PartialEq)]
pub enum Emission<T> {
    /// A complete snapshot of the query's current answer.
    Next(T),
    /// The read behind the subscription failed.
    Error(Error),
}

impl<T> Emission<T> {
    /// Converts the emission into a `Result`.
    pub fn into_result(self) -> Result<T> {
        match self {
            Emission::Next(v) => Ok(v),
            Emission::Error(e) => Err(e),
        }
    }
}

/// Observer callback registered with a [`Subscribable`].
pub type Observer<T> = Box<dyn FnMut(Emission<T>)>;

/// Something that can be subscribed to for snapshots of type `T`.
pub trait Subscribable<T> {
    /// Registers an observer and returns the disposer ending the subscription.
    ///
    /// The first emission may arrive before or after this returns.
    fn subscribe(&self, observer: Observer<T>) -> Disposer;
}

impl<T, F> Subscribable<T> for F
where
    F: Fn(Observer<T>) -> Disposer,
{
    fn subscribe(&self, observer: Observer<T>) -> Disposer {
        self(observer)
    }
}

/// Handle-shaped disposer.
pub trait Unsubscribe {
    /// Ends the subscription. Must tolerate being called more than once.
    fn unsubscribe(&mut self);
}

/// Ends a live subscription.
pub enum Disposer {
    /// A plain function.
    Callable(Box<dyn FnOnce()>),
    /// An object exposing `unsubscribe`.
    Handle(Box<dyn Unsubscribe>),
}

impl Disposer {
    /// Creates a callable disposer.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Disposer::Callable(Box::new(f))
    }

    /// Creates a handle disposer.
    pub fn from_handle<H>(handle: H) -> Self
    where
        H: Unsubscribe + 'static,
    {
        Disposer::Handle(Box::new(handle))
    }

    /// A disposer that does nothing.
    pub fn noop() -> Self {
        Disposer::Callable(Box::new(|| {}))
    }

    /// Normalizes either shape into one callable.
    pub fn into_fn(self) -> Box<dyn FnOnce()> {
        match self {
            Disposer::Callable(f) => f,
            Disposer::Handle(mut handle) => Box::new(move || handle.unsubscribe()),
        }
    }

    /// Runs the disposer.
    pub fn dispose(self) {
        (self.into_fn())()
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposer::Callable(_) => f.write_str("Disposer::Callable"),
            Disposer::Handle(_) => f.write_str("Disposer::Handle"),
        }
    }
}

/// A pending computation producing a `T`: the read a live query re-runs.
pub struct Query<T> {
    read: Rc<dyn Fn() -> Result<T>>,
}

impl<T> Query<T> {
    /// Wraps a read function.
    pub fn new<F>(read: F) -> Self
    where
        F: Fn() -> Result<T> + 'static,
    {
        Self {
            read: Rc::new(read),
        }
    }

    /// Runs the read once.
    #[inline]
    pub fn execute(&self) -> Result<T> {
        (self.read)()
    }
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            read: self.read.clone(),
        }
    }
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Query")
    }
}

/// The query-execution capability: turns a read into a live stream.
///
/// Implementations call observers with the full result of re-running the read
/// whenever relevant data changes.
pub trait QueryExecutor {
    /// Opens a live stream over `query`.
    fn live_query<T>(&self, query: Query<T>) -> Box<dyn Subscribable<T>>
    where
        T: Clone + PartialEq + 'static;
}
