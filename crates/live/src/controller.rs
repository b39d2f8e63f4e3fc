//! Query re-subscription controller.
//!
//! A live container couples one stable container with a reactive effect. The
//! effect reads the dependency source and whatever cells the querier reads,
//! builds a fresh subscription from them and attaches it. When any of those
//! reads change, the effect's previous run scope is disposed first (closing
//! the old subscription), then the new subscription is attached. At most one
//! subscription is ever live per container.

use crate::options::ReconcileOptions;
use crate::reconcile::Reconcile;
use crate::sink::attach_with_status;
use crate::status::QueryStatus;
use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::Cell;
use core::fmt;
use rill_core::Subscribable;
use rill_reactive::{Effect, Scope, Signal};
use tracing::debug;

/// The dependency value a live query is parameterized by.
///
/// Reading a `Signal` or `Accessor` source inside the controller makes it a
/// dependency: a change re-subscribes.
pub enum Source<D> {
    /// A fixed value. Never causes a re-subscription.
    Constant(D),
    /// A signal read on every run.
    Signal(Signal<D>),
    /// Any reactive computation.
    Accessor(Rc<dyn Fn() -> D>),
}

impl<D: Clone + 'static> Source<D> {
    /// Reads the current value, tracking it in the running effect.
    pub fn get(&self) -> D {
        match self {
            Source::Constant(value) => value.clone(),
            Source::Signal(signal) => signal.get(),
            Source::Accessor(read) => read(),
        }
    }

    pub fn constant(value: D) -> Self {
        Source::Constant(value)
    }

    pub fn accessor<F>(read: F) -> Self
    where
        F: Fn() -> D + 'static,
    {
        Source::Accessor(Rc::new(read))
    }
}

impl<D: Clone> Clone for Source<D> {
    fn clone(&self) -> Self {
        match self {
            Source::Constant(value) => Source::Constant(value.clone()),
            Source::Signal(signal) => Source::Signal(signal.clone()),
            Source::Accessor(read) => Source::Accessor(read.clone()),
        }
    }
}

impl<D> From<Signal<D>> for Source<D> {
    fn from(signal: Signal<D>) -> Self {
        Source::Signal(signal)
    }
}

impl Default for Source<()> {
    fn default() -> Self {
        Source::Constant(())
    }
}

impl<D> fmt::Debug for Source<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Constant(_) => f.write_str("Source::Constant"),
            Source::Signal(_) => f.write_str("Source::Signal"),
            Source::Accessor(_) => f.write_str("Source::Accessor"),
        }
    }
}

/// A stable container kept in sync with a re-subscribing live query.
pub struct LiveContainer<C> {
    container: C,
    status: Signal<QueryStatus>,
    generation: Rc<Cell<u64>>,
    effect: Effect,
}

impl<C> LiveContainer<C> {
    /// Returns the container. Its identity never changes.
    #[inline]
    pub fn container(&self) -> &C {
        &self.container
    }

    /// Returns the load status (tracked).
    pub fn status(&self) -> QueryStatus {
        self.status.get()
    }

    /// Returns the status signal.
    #[inline]
    pub fn status_signal(&self) -> &Signal<QueryStatus> {
        &self.status
    }

    /// Returns how many subscriptions have been opened so far.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    /// Returns true until the container is torn down.
    #[inline]
    pub fn is_live(&self) -> bool {
        self.effect.is_active()
    }

    /// Closes the live subscription. The container keeps its last contents.
    pub fn dispose(&self) {
        self.effect.dispose();
    }
}

impl<C: fmt::Debug> fmt::Debug for LiveContainer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveContainer")
            .field("container", &self.container)
            .field("generation", &self.generation.get())
            .field("live", &self.effect.is_active())
            .finish()
    }
}

/// Keeps `container` in sync with the subscription `querier` builds from
/// `source`, re-subscribing whenever the source or anything the querier
/// reads changes.
///
/// The subscription is owned by `cx`; disposing `cx` tears it down.
pub fn create_live_container<C, D, Q>(
    cx: &Scope,
    container: C,
    source: Source<D>,
    options: ReconcileOptions,
    querier: Q,
) -> LiveContainer<C>
where
    C: Reconcile + Clone + 'static,
    D: Clone + 'static,
    Q: Fn(&D) -> Box<dyn Subscribable<C::Snapshot>> + 'static,
{
    let status = cx.create_signal(QueryStatus::Pending);
    let generation = Rc::new(Cell::new(0u64));

    let effect = {
        let container = container.clone();
        let status = status.clone();
        let generation = generation.clone();
        cx.create_effect(move |run| {
            let dependency = source.get();
            let subscribable = querier(&dependency);

            let current = generation.get() + 1;
            generation.set(current);
            run.untrack(|| {
                debug!(generation = current, "subscribing live container");
                status.set(QueryStatus::Pending);
                attach_with_status(
                    run,
                    subscribable.as_ref(),
                    container.clone(),
                    options.clone(),
                    Some(status.clone()),
                );
            });
        })
    };

    LiveContainer {
        container,
        status,
        generation,
        effect,
    }
}
