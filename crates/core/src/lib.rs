//! Rill Core - Core types for Rill live queries.
//!
//! This crate provides the foundational types shared by the reactive runtime,
//! the reconciliation engine and query-execution backends:
//!
//! - `Value`: Runtime values held by record fields (including nested arrays and records)
//! - `Record`: A set of named fields, the unit live queries emit
//! - `Subscribable` / `Emission` / `Disposer`: The live subscription contract
//! - `Query` / `QueryExecutor`: Pending reads and the capability that makes them live
//! - `Error`: Error types for Rill operations
//!
//! # Example
//!
//! ```rust
//! use rill_core::{Record, Value};
//!
//! let friend = Record::new().with("name", "Foo").with("age", 10i64);
//!
//! assert_eq!(friend.get_str("name"), Some("Foo"));
//! assert_eq!(friend.get("age"), Some(&Value::Int64(10)));
//! ```

#![no_std]

extern crate alloc;

mod error;
mod record;
mod subscription;
mod types;
mod value;

pub use error::{Error, Result};
pub use record::Record;
pub use subscription::{
    Disposer, Emission, Observer, Query, QueryExecutor, Subscribable, Unsubscribe,
};
pub use types::ValueKind;
pub use value::Value;
