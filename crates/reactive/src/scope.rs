//! Ownership scopes.
//!
//! A `Scope` owns effects, child scopes and cleanup callbacks. Disposing a
//! scope tears all of them down. Every effect run gets its own scope, which is
//! disposed right before the next run, so cleanups registered during a run
//! fire before the effect body executes again.

use crate::effect::Effect;
use crate::runtime::{NodeId, Runtime};
use crate::signal::Signal;
use alloc::boxed::Box;

/// Handle to a scope in a [`Runtime`].
#[derive(Clone)]
pub struct Scope {
    rt: Runtime,
    id: NodeId,
}

impl Scope {
    pub(crate) fn new(rt: Runtime, id: NodeId) -> Self {
        Self { rt, id }
    }

    /// Returns the scope's runtime.
    #[inline]
    pub fn runtime(&self) -> &Runtime {
        &self.rt
    }

    /// Returns the scope's node ID.
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Creates a child scope, disposed together with this one.
    pub fn child(&self) -> Scope {
        let id = self.rt.create_scope(Some(self.id));
        Scope::new(self.rt.clone(), id)
    }

    /// Registers a callback to run when this scope is disposed.
    ///
    /// If the scope is already disposed the callback runs immediately.
    pub fn on_cleanup(&self, f: impl FnOnce() + 'static) {
        self.rt.on_cleanup(self.id, Box::new(f));
    }

    /// Creates an effect owned by this scope. The effect runs immediately.
    pub fn create_effect(&self, f: impl FnMut(&Scope) + 'static) -> Effect {
        self.rt.create_effect(self.id, f)
    }

    /// Creates a signal in this scope's runtime.
    pub fn create_signal<T: 'static>(&self, value: T) -> Signal<T> {
        Signal::new(&self.rt, value)
    }

    /// See [`Runtime::batch`].
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        self.rt.batch(f)
    }

    /// See [`Runtime::untrack`].
    pub fn untrack<R>(&self, f: impl FnOnce() -> R) -> R {
        self.rt.untrack(f)
    }

    /// Disposes this scope and everything it owns.
    pub fn dispose(&self) {
        self.rt.dispose_scope(self.id);
    }

    /// Returns true once the scope has been disposed.
    pub fn is_disposed(&self) -> bool {
        !self.rt.is_scope_alive(self.id)
    }
}

impl core::fmt::Debug for Scope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
