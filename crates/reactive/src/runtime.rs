//! The reactive runtime.
//!
//! A `Runtime` owns the dependency graph between reactive cells and the
//! effects that read them, plus the scope tree that cleanups hang off. It is an
//! explicit handle: nothing here relies on a global tracking context, so any
//! number of independent runtimes can coexist on one thread.
//!
//! Effects run synchronously when a cell they read is notified, unless a
//! `batch` is open, in which case each dirty effect runs once when the
//! outermost batch closes.

use crate::effect::Effect;
use crate::scope::Scope;
use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use hashbrown::HashMap;
use tracing::trace;

/// Identifier of a node (cell, effect or scope) in a runtime.
pub type NodeId = u64;

type EffectFn = Rc<RefCell<dyn FnMut(&Scope)>>;

struct EffectNode {
    f: EffectFn,
    /// Scope that owns the effect
    owner: NodeId,
    /// Scope holding cleanups registered by the current run
    run_scope: Option<NodeId>,
    /// Cells read by the current run
    sources: Vec<NodeId>,
    running: bool,
    dirty: bool,
}

#[derive(Default)]
struct ScopeNode {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    effects: Vec<NodeId>,
    cleanups: Vec<Box<dyn FnOnce()>>,
}

#[derive(Default)]
struct RuntimeState {
    next_id: NodeId,
    /// Cell -> effects that read it
    subscribers: HashMap<NodeId, Vec<NodeId>>,
    effects: HashMap<NodeId, EffectNode>,
    scopes: HashMap<NodeId, ScopeNode>,
    /// Effect currently tracking reads
    observer: Option<NodeId>,
    batch_depth: usize,
    /// Effects waiting for the outermost batch to close
    pending: Vec<NodeId>,
}

impl RuntimeState {
    fn unlink_sources(&mut self, effect: NodeId, sources: &[NodeId]) {
        for source in sources {
            if let Some(subs) = self.subscribers.get_mut(source) {
                subs.retain(|e| *e != effect);
                if subs.is_empty() {
                    self.subscribers.remove(source);
                }
            }
        }
    }
}

/// Outcome of one pass of an effect body.
enum RunOutcome {
    Done,
    Again(Option<NodeId>),
    Gone,
}

/// Handle to a single-threaded reactive runtime.
#[derive(Clone, Default)]
pub struct Runtime {
    state: Rc<RefCell<RuntimeState>>,
}

impl Runtime {
    /// Creates a new runtime.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new root scope.
    pub fn root(&self) -> Scope {
        let id = self.create_scope(None);
        Scope::new(self.clone(), id)
    }

    /// Runs `f` with effect execution deferred until the outermost batch ends.
    ///
    /// Each effect made dirty inside the batch runs once afterwards.
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        self.state.borrow_mut().batch_depth += 1;
        let result = f();
        let flush = {
            let mut st = self.state.borrow_mut();
            st.batch_depth -= 1;
            st.batch_depth == 0
        };
        if flush {
            self.flush_pending();
        }
        result
    }

    /// Runs `f` without tracking reads into the current effect.
    pub fn untrack<R>(&self, f: impl FnOnce() -> R) -> R {
        let previous = self.state.borrow_mut().observer.take();
        let result = f();
        self.state.borrow_mut().observer = previous;
        result
    }

    /// Returns true while a batch is open.
    #[inline]
    pub fn is_batching(&self) -> bool {
        self.state.borrow().batch_depth > 0
    }

    /// Returns true while an effect is tracking reads.
    #[inline]
    pub fn is_tracking(&self) -> bool {
        self.state.borrow().observer.is_some()
    }

    /// Returns the number of live effects.
    pub fn effect_count(&self) -> usize {
        self.state.borrow().effects.len()
    }

    /// Returns the number of live scopes.
    pub fn scope_count(&self) -> usize {
        self.state.borrow().scopes.len()
    }

    /// Returns true if both handles point at the same runtime.
    #[inline]
    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    pub(crate) fn next_id(&self) -> NodeId {
        let mut st = self.state.borrow_mut();
        st.next_id += 1;
        st.next_id
    }

    /// Records a read of `node` by the current observer, if any.
    pub(crate) fn track(&self, node: NodeId) {
        let mut st = self.state.borrow_mut();
        let Some(observer) = st.observer else {
            return;
        };
        let subs = st.subscribers.entry(node).or_default();
        if !subs.contains(&observer) {
            subs.push(observer);
        }
        if let Some(effect) = st.effects.get_mut(&observer) {
            if !effect.sources.contains(&node) {
                effect.sources.push(node);
            }
        }
    }

    /// Re-runs (or queues, inside a batch) every effect that read `node`.
    pub(crate) fn notify(&self, node: NodeId) {
        let subscribers = {
            let mut st = self.state.borrow_mut();
            let subs = match st.subscribers.get(&node) {
                Some(subs) => subs.clone(),
                None => return,
            };
            if st.batch_depth > 0 {
                for effect in subs {
                    if !st.pending.contains(&effect) {
                        st.pending.push(effect);
                    }
                }
                return;
            }
            subs
        };
        for effect in subscribers {
            self.run_effect(effect);
        }
    }

    pub(crate) fn subscriber_count(&self, node: NodeId) -> usize {
        self.state
            .borrow()
            .subscribers
            .get(&node)
            .map(|subs| subs.len())
            .unwrap_or(0)
    }

    pub(crate) fn create_scope(&self, parent: Option<NodeId>) -> NodeId {
        let id = self.next_id();
        let mut st = self.state.borrow_mut();
        let parent = parent.filter(|p| st.scopes.contains_key(p));
        if let Some(parent) = parent {
            if let Some(node) = st.scopes.get_mut(&parent) {
                node.children.push(id);
            }
        }
        st.scopes.insert(
            id,
            ScopeNode {
                parent,
                ..ScopeNode::default()
            },
        );
        id
    }

    pub(crate) fn is_scope_alive(&self, scope: NodeId) -> bool {
        self.state.borrow().scopes.contains_key(&scope)
    }

    /// Registers a cleanup on `scope`. Runs it at once if the scope is gone.
    pub(crate) fn on_cleanup(&self, scope: NodeId, f: Box<dyn FnOnce()>) {
        let rejected = {
            let mut st = self.state.borrow_mut();
            match st.scopes.get_mut(&scope) {
                Some(node) => {
                    node.cleanups.push(f);
                    None
                }
                None => Some(f),
            }
        };
        if let Some(f) = rejected {
            trace!(scope, "scope already disposed, running cleanup immediately");
            f();
        }
    }

    /// Disposes a scope: child scopes first, then owned effects, then the
    /// scope's own cleanups in reverse registration order.
    pub(crate) fn dispose_scope(&self, scope: NodeId) {
        let node = {
            let mut st = self.state.borrow_mut();
            let node = match st.scopes.remove(&scope) {
                Some(node) => node,
                None => return,
            };
            if let Some(parent) = node.parent {
                if let Some(parent) = st.scopes.get_mut(&parent) {
                    parent.children.retain(|c| *c != scope);
                }
            }
            node
        };
        for child in node.children.into_iter().rev() {
            self.dispose_scope(child);
        }
        for effect in node.effects.into_iter().rev() {
            self.dispose_effect(effect);
        }
        for cleanup in node.cleanups.into_iter().rev() {
            cleanup();
        }
    }

    pub(crate) fn create_effect(&self, owner: NodeId, f: impl FnMut(&Scope) + 'static) -> Effect {
        let id = self.next_id();
        let inserted = {
            let mut st = self.state.borrow_mut();
            match st.scopes.get_mut(&owner) {
                Some(scope) => {
                    scope.effects.push(id);
                    let f: EffectFn = Rc::new(RefCell::new(f));
                    st.effects.insert(
                        id,
                        EffectNode {
                            f,
                            owner,
                            run_scope: None,
                            sources: Vec::new(),
                            running: false,
                            dirty: false,
                        },
                    );
                    true
                }
                None => false,
            }
        };
        if inserted {
            self.run_effect(id);
        } else {
            trace!(owner, "owner scope disposed, effect not created");
        }
        Effect::new(self.clone(), id)
    }

    pub(crate) fn is_effect_alive(&self, effect: NodeId) -> bool {
        self.state.borrow().effects.contains_key(&effect)
    }

    pub(crate) fn dispose_effect(&self, effect: NodeId) {
        let run_scope = {
            let mut st = self.state.borrow_mut();
            let node = match st.effects.remove(&effect) {
                Some(node) => node,
                None => return,
            };
            st.unlink_sources(effect, &node.sources);
            if let Some(owner) = st.scopes.get_mut(&node.owner) {
                owner.effects.retain(|e| *e != effect);
            }
            st.pending.retain(|e| *e != effect);
            node.run_scope
        };
        trace!(effect, "effect disposed");
        if let Some(scope) = run_scope {
            self.dispose_scope(scope);
        }
    }

    /// Runs an effect body: tears down the previous run's scope, then tracks
    /// the reads of a fresh run. Re-entrant notifications mark the effect
    /// dirty and cause another pass once the current one returns.
    pub(crate) fn run_effect(&self, effect: NodeId) {
        let (f, previous) = {
            let mut st = self.state.borrow_mut();
            let node = match st.effects.get_mut(&effect) {
                Some(node) => node,
                None => return,
            };
            if node.running {
                node.dirty = true;
                return;
            }
            node.running = true;
            (node.f.clone(), node.run_scope.take())
        };

        if let Some(scope) = previous {
            self.dispose_scope(scope);
        }

        loop {
            {
                let mut st = self.state.borrow_mut();
                let sources = match st.effects.get_mut(&effect) {
                    Some(node) => {
                        node.dirty = false;
                        core::mem::take(&mut node.sources)
                    }
                    None => return,
                };
                st.unlink_sources(effect, &sources);
            }

            let run_scope = self.create_scope(None);
            let previous_observer = {
                let mut st = self.state.borrow_mut();
                if let Some(node) = st.effects.get_mut(&effect) {
                    node.run_scope = Some(run_scope);
                }
                st.observer.replace(effect)
            };

            trace!(effect, "running effect");
            {
                let scope = Scope::new(self.clone(), run_scope);
                let mut body = f.borrow_mut();
                (&mut *body)(&scope);
            }

            let outcome = {
                let mut st = self.state.borrow_mut();
                st.observer = previous_observer;
                match st.effects.get_mut(&effect) {
                    Some(node) if node.dirty => RunOutcome::Again(node.run_scope.take()),
                    Some(node) => {
                        node.running = false;
                        RunOutcome::Done
                    }
                    None => RunOutcome::Gone,
                }
            };

            match outcome {
                RunOutcome::Again(scope) => {
                    if let Some(scope) = scope {
                        self.dispose_scope(scope);
                    }
                }
                RunOutcome::Done | RunOutcome::Gone => return,
            }
        }
    }

    fn flush_pending(&self) {
        loop {
            let next = {
                let mut st = self.state.borrow_mut();
                if st.pending.is_empty() {
                    None
                } else {
                    Some(st.pending.remove(0))
                }
            };
            match next {
                Some(effect) => self.run_effect(effect),
                None => break,
            }
        }
    }
}

impl core::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let st = self.state.borrow();
        f.debug_struct("Runtime")
            .field("effects", &st.effects.len())
            .field("scopes", &st.scopes.len())
            .field("batch_depth", &st.batch_depth)
            .finish()
    }
}
