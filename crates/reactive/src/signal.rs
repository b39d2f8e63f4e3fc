//! Reactive cells.
//!
//! - `Trigger`: a value-less cell; `track` records a read, `notify` a write.
//! - `Signal<T>`: a value guarded by a trigger.

use crate::runtime::{NodeId, Runtime};
use alloc::rc::Rc;
use core::cell::RefCell;

/// A value-less reactive cell.
#[derive(Clone)]
pub struct Trigger {
    rt: Runtime,
    id: NodeId,
}

impl Trigger {
    /// Creates a new trigger.
    pub fn new(rt: &Runtime) -> Self {
        Self {
            rt: rt.clone(),
            id: rt.next_id(),
        }
    }

    /// Records a read by the current effect.
    #[inline]
    pub fn track(&self) {
        self.rt.track(self.id);
    }

    /// Re-runs every effect that read this trigger.
    #[inline]
    pub fn notify(&self) {
        self.rt.notify(self.id);
    }

    /// Returns the number of effects currently depending on this trigger.
    pub fn subscriber_count(&self) -> usize {
        self.rt.subscriber_count(self.id)
    }

    /// Returns the runtime this trigger belongs to.
    #[inline]
    pub fn runtime(&self) -> &Runtime {
        &self.rt
    }
}

/// A reactive value.
pub struct Signal<T> {
    trigger: Trigger,
    value: Rc<RefCell<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            trigger: self.trigger.clone(),
            value: self.value.clone(),
        }
    }
}

impl<T: 'static> Signal<T> {
    /// Creates a new signal.
    pub fn new(rt: &Runtime, value: T) -> Self {
        Self {
            trigger: Trigger::new(rt),
            value: Rc::new(RefCell::new(value)),
        }
    }

    /// Reads the value by reference, tracking the read.
    ///
    /// The signal must not be written from inside `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.trigger.track();
        f(&*self.value.borrow())
    }

    /// Reads the value by reference without tracking.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&*self.value.borrow())
    }

    /// Mutates the value in place and notifies unconditionally.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut *self.value.borrow_mut());
        self.trigger.notify();
    }

    /// Returns the number of effects currently depending on this signal.
    pub fn subscriber_count(&self) -> usize {
        self.trigger.subscriber_count()
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// Returns a copy of the value, tracking the read.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Returns a copy of the value without tracking.
    pub fn get_untracked(&self) -> T {
        self.value.borrow().clone()
    }
}

impl<T: PartialEq + 'static> Signal<T> {
    /// Writes the value, notifying only if it changed. Returns true on change.
    pub fn set(&self, value: T) -> bool {
        let changed = {
            let mut current = self.value.borrow_mut();
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        };
        if changed {
            self.trigger.notify();
        }
        changed
    }
}

impl<T: core::fmt::Debug> core::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Signal").field(&*self.value.borrow()).finish()
    }
}
