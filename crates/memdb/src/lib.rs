//! Rill MemDB - In-memory table store with live queries.
//!
//! A small keyed-record database that implements the `QueryExecutor`
//! capability: any read can be made live, and every subscriber is re-sent the
//! full result after writes to the tables the read touched.
//!
//! Live-query work is deferred onto a [`Scheduler`] and runs when the
//! database is settled, so the first result and every update arrive after the
//! call that caused them.
//!
//! # Example
//!
//! ```rust
//! use rill_core::{Emission, Record, Subscribable};
//! use rill_memdb::Database;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let db = Database::new();
//! db.create_table("friends").unwrap();
//!
//! let counts = Rc::new(RefCell::new(Vec::new()));
//! let sink = counts.clone();
//! let live = db.live(db.query(|tx| tx.count("friends")));
//! let disposer = live.subscribe(Box::new(move |e: Emission<usize>| {
//!     sink.borrow_mut().push(e.into_result().unwrap());
//! }));
//!
//! db.settle();
//! db.add("friends", Record::new().with("name", "Foo")).unwrap();
//! db.settle();
//! assert_eq!(*counts.borrow(), [0, 1]);
//!
//! disposer.dispose();
//! ```

#![no_std]

extern crate alloc;

pub mod config;
pub mod database;
mod live_registry;
pub mod scheduler;
pub mod table;
pub mod transaction;

pub use config::DatabaseConfig;
pub use database::{Database, LiveQuery};
pub use scheduler::Scheduler;
pub use table::Table;
pub use transaction::ReadTx;
