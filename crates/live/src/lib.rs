//! Rill Live - Live-query reconciliation for Rill.
//!
//! This crate keeps long-lived reactive containers in sync with push-based
//! live queries. A query executor emits full snapshots; the engine merges each
//! snapshot into a container that is allocated once and never replaced, so
//! only the fields that actually changed notify their observers.
//!
//! # Layers
//!
//! - `reconcile`: structural, key-based merge of snapshots into stores
//! - `sink`: binds one subscription to one container for a scope's lifetime
//! - `controller`: re-subscribes when the query's reactive inputs change
//! - `adapters`: `create_query_signal`, `create_query_array`,
//!   `create_query_object`
//!
//! # Example
//!
//! ```rust
//! use rill_core::{Record, Value};
//! use rill_live::create_query_array;
//! use rill_memdb::Database;
//! use rill_reactive::Runtime;
//!
//! let db = Database::new();
//! db.create_table("friends").unwrap();
//!
//! let rt = Runtime::new();
//! let cx = rt.root();
//! let friends = create_query_array(&cx, &db, {
//!     let db = db.clone();
//!     move || db.query(|tx| tx.to_vec("friends"))
//! });
//! db.settle();
//! assert!(friends.is_empty());
//!
//! db.add("friends", Record::new().with("name", "Foo")).unwrap();
//! db.settle();
//! let foo = friends.array().items_untracked()[0].clone();
//! assert_eq!(foo.get_untracked("name"), Some(Value::from("Foo")));
//!
//! cx.dispose();
//! ```

#![no_std]

extern crate alloc;

pub mod adapters;
pub mod controller;
pub mod options;
pub mod reconcile;
pub mod report;
pub mod sink;
pub mod status;

pub use adapters::{
    create_query_array, create_query_array_with, create_query_object, create_query_object_with,
    create_query_signal, create_query_signal_with, LiveArray, LiveObject, QueryOptions,
    QuerySignal,
};
pub use controller::{create_live_container, LiveContainer, Source};
pub use options::{ReconcileOptions, DEFAULT_KEY};
pub use reconcile::Reconcile;
pub use report::ReconcileReport;
pub use sink::{attach, attach_with_status};
pub use status::QueryStatus;
