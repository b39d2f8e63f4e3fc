//! Rill Reactive - Fine-grained reactive runtime for Rill.
//!
//! This crate implements the single-threaded reactive runtime that live query
//! containers are observed through. Reads inside an effect are tracked; writes
//! re-run exactly the effects that read the written cell.
//!
//! # Core Concepts
//!
//! - `Runtime`: Explicit handle owning the dependency graph and scope tree
//! - `Scope`: Owns effects, child scopes and cleanup callbacks
//! - `Signal` / `Trigger`: Reactive cells with and without a value
//! - `Effect`: A computation that re-runs when the cells it read change
//! - `StoreObject` / `StoreArray`: Mutable containers with per-field reactivity
//!
//! # Example
//!
//! ```rust
//! use rill_reactive::Runtime;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let rt = Runtime::new();
//! let root = rt.root();
//! let count = root.create_signal(0);
//! let seen = Rc::new(Cell::new(0));
//!
//! let (count2, seen2) = (count.clone(), seen.clone());
//! root.create_effect(move |_| seen2.set(count2.get()));
//!
//! count.set(3);
//! assert_eq!(seen.get(), 3);
//!
//! root.dispose();
//! ```

#![no_std]

extern crate alloc;

pub mod effect;
pub mod runtime;
pub mod scope;
pub mod signal;
pub mod store;

pub use effect::Effect;
pub use runtime::{NodeId, Runtime};
pub use scope::Scope;
pub use signal::{Signal, Trigger};
pub use store::{StoreArray, StoreObject};
