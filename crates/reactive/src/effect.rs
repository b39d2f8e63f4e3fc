//! Effect handles.

use crate::runtime::{NodeId, Runtime};

/// Handle to an effect created with [`Scope::create_effect`](crate::Scope::create_effect).
///
/// Dropping the handle does not stop the effect; it lives until disposed
/// explicitly or together with its owning scope.
#[derive(Clone)]
pub struct Effect {
    rt: Runtime,
    id: NodeId,
}

impl Effect {
    pub(crate) fn new(rt: Runtime, id: NodeId) -> Self {
        Self { rt, id }
    }

    /// Returns the effect's node ID.
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns true until the effect is disposed.
    pub fn is_active(&self) -> bool {
        self.rt.is_effect_alive(self.id)
    }

    /// Stops the effect and runs the cleanups of its last run.
    pub fn dispose(&self) {
        self.rt.dispose_effect(self.id);
    }
}

impl core::fmt::Debug for Effect {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{Runtime, Signal};
    use alloc::rc::Rc;
    use core::cell::Cell;

    #[test]
    fn test_effect_dispose_runs_cleanup() {
        let rt = Runtime::new();
        let root = rt.root();
        let source = Signal::new(&rt, 0);
        let cleaned = Rc::new(Cell::new(0));

        let cleaned_clone = cleaned.clone();
        let source_clone = source.clone();
        let effect = root.create_effect(move |cx| {
            source_clone.get();
            let c = cleaned_clone.clone();
            cx.on_cleanup(move || c.set(c.get() + 1));
        });

        effect.dispose();
        assert_eq!(cleaned.get(), 1);
        assert_eq!(source.subscriber_count(), 0);

        // Disposing twice is a no-op
        effect.dispose();
        assert_eq!(cleaned.get(), 1);
    }
}
